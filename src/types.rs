//! Common types and data structures

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Which media the user asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    #[default]
    Video,
    Audio,
}

impl DownloadKind {
    /// Prefix used for generated file names
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "m4a",
        }
    }

    /// Short label shown on the toggle and the download button
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "MP4",
            Self::Audio => "M4A",
        }
    }
}

/// Renderable state of the download controller.
///
/// Only the controller writes to it; the UI reads snapshots every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadState {
    pub is_downloading: bool,
    /// Simulated percentage in `0.0..=100.0`
    pub progress: f32,
    pub video_info: Option<VideoInfo>,
    pub error: Option<String>,
    pub download_kind: DownloadKind,
    pub is_fetching_info: bool,
    /// Where the last successful download was written
    pub last_saved: Option<PathBuf>,
}

impl DownloadState {
    pub fn set_progress(&mut self, value: f32) {
        self.progress = value.clamp(0.0, 100.0);
    }

    pub fn is_busy(&self) -> bool {
        self.is_downloading || self.is_fetching_info
    }

    /// Info lookups wait for both actions to settle
    pub fn can_fetch_info(&self) -> bool {
        !self.is_busy()
    }

    pub fn can_download(&self) -> bool {
        !self.is_downloading
    }
}

/// Metadata returned by `GET /info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub title: String,
    /// Seconds
    #[serde(default, deserialize_with = "de_non_negative")]
    pub duration: u64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub uploader: String,
    #[serde(default, deserialize_with = "de_non_negative")]
    pub view_count: u64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub formats: Vec<VideoFormat>,
}

/// One entry of `VideoInfo::formats`, passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub format_id: String,
    #[serde(rename = "ext", default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
}

/// Error payload sent by the API on non-2xx responses. Only `message` is
/// shown; `statusCode`, `timestamp`, `path` and `method` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: ErrorMessage,
}

/// The API usually sends a list of messages, but validation layers sometimes
/// send a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Many(Vec<String>),
    One(String),
}

impl ErrorMessage {
    pub fn joined(&self) -> String {
        match self {
            Self::Many(parts) => parts.join(", "),
            Self::One(text) => text.clone(),
        }
    }
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

/// Body of `POST /download`
#[derive(Debug, Serialize)]
pub struct VideoDownloadRequest<'a> {
    pub url: &'a str,
    pub format: &'a str,
    pub quality: &'a str,
    pub output: &'a str,
}

/// Body of `POST /download-audio`
#[derive(Debug, Serialize)]
pub struct AudioDownloadRequest<'a> {
    pub url: &'a str,
}

/// `null` reads as the type's default, same as a missing field
fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_non_negative<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.floor() as u64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_info_tolerates_yt_dlp_quirks() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "duration": 212.6,
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg",
            "uploader": "Rick Astley",
            "view_count": null,
            "formats": [
                {"format_id": "18", "ext": "mp4", "resolution": "640x360", "filesize": null, "vcodec": "avc1", "acodec": "mp4a"},
                {"format_id": "140"}
            ]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.duration, 212);
        assert_eq!(info.view_count, 0);
        assert_eq!(info.formats.len(), 2);
        assert_eq!(info.formats[0].extension.as_deref(), Some("mp4"));
        assert_eq!(info.formats[1].filesize, None);
    }

    #[test]
    fn video_info_null_text_fields_become_empty() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": null,
            "duration": 212,
            "thumbnail": null,
            "uploader": null,
            "view_count": 10,
            "formats": null
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.title, "");
        assert_eq!(info.thumbnail, "");
        assert_eq!(info.uploader, "");
        assert!(info.formats.is_empty());

        let minimal: VideoInfo = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(minimal.uploader, "");
        assert_eq!(minimal.duration, 0);
    }

    #[test]
    fn action_availability_follows_busy_flags() {
        let mut state = DownloadState::default();
        assert!(state.can_fetch_info());
        assert!(state.can_download());

        state.is_downloading = true;
        assert!(!state.can_fetch_info());
        assert!(!state.can_download());

        state.is_downloading = false;
        state.is_fetching_info = true;
        assert!(!state.can_fetch_info());
        assert!(state.can_download());
    }

    #[test]
    fn error_body_accepts_list_or_string() {
        let list: ApiErrorBody = serde_json::from_str(
            r#"{"statusCode":400,"timestamp":"t","path":"/download","method":"POST","message":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(list.message.joined(), "a, b");

        let single: ApiErrorBody = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(single.message.joined(), "boom");
    }

    #[test]
    fn progress_is_clamped() {
        let mut state = DownloadState::default();
        state.set_progress(140.0);
        assert_eq!(state.progress, 100.0);
        state.set_progress(-3.0);
        assert_eq!(state.progress, 0.0);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DownloadKind::Audio).unwrap(), "\"audio\"");
        assert_eq!(DownloadKind::Video.extension(), "mp4");
        assert_eq!(DownloadKind::Audio.label(), "M4A");
    }
}
