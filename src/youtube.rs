//! YouTube URL matching and download file naming

use crate::types::DownloadKind;
use regex::Regex;
use std::sync::LazyLock;

static VALID_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com/(watch\?v=|embed/)|youtu\.be/)[A-Za-z0-9_-]+")
        .expect("valid regex")
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)")
        .expect("valid regex")
});

/// Syntactic check only; does not tell whether the video exists.
///
/// Accepts `youtube.com/watch?v=`, `youtube.com/embed/` and `youtu.be/` with an
/// optional scheme and `www.`. Shorts links are not accepted.
pub fn is_valid_youtube_url(url: &str) -> bool {
    VALID_URL.is_match(url)
}

/// Returns the id segment of a watch, short-link or embed URL
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// File name used when delivering a finished download,
/// e.g. `video_dQw4w9WgXcQ.mp4` or `audio_download.m4a`.
pub fn media_filename(kind: DownloadKind, url: &str) -> String {
    let id = extract_video_id(url)
        .map(sanitize_filename_part)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "download".to_string());
    format!("{}_{}.{}", kind.file_prefix(), id, kind.extension())
}

fn sanitize_filename_part(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '"' | '<' | '>' | '|' | '\r' | '\t' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn accepts_supported_forms() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtu.be/dQw4w9WgXcQ",
            "youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
        ] {
            assert!(is_valid_youtube_url(url), "{url} should be valid");
            assert_eq!(extract_video_id(url), Some(ID), "{url}");
        }
    }

    #[test]
    fn rejects_non_youtube_input() {
        assert!(!is_valid_youtube_url("not a url"));
        assert_eq!(extract_video_id("not a url"), None);
        assert!(!is_valid_youtube_url(""));
        assert!(!is_valid_youtube_url("https://vimeo.com/12345"));
        assert!(!is_valid_youtube_url("https://www.youtube.com/watch?v="));
    }

    #[test]
    fn shorts_links_are_not_accepted() {
        let url = "https://www.youtube.com/shorts/dQw4w9WgXcQ";
        assert!(!is_valid_youtube_url(url));
        assert_eq!(extract_video_id(url), None);
    }

    #[test]
    fn mobile_host_extracts_but_does_not_validate() {
        let url = "https://m.youtube.com/watch?v=dQw4w9WgXcQ";
        assert!(!is_valid_youtube_url(url));
        assert_eq!(extract_video_id(url), Some(ID));
    }

    #[test]
    fn id_stops_at_query_separators() {
        assert_eq!(extract_video_id("https://youtu.be/abc123?si=xyz"), Some("abc123"));
        assert_eq!(extract_video_id("https://www.youtube.com/embed/abc123#t=1"), Some("abc123"));
    }

    #[test]
    fn filenames_follow_kind() {
        let url = "https://youtu.be/dQw4w9WgXcQ";
        assert_eq!(media_filename(DownloadKind::Video, url), "video_dQw4w9WgXcQ.mp4");
        assert_eq!(media_filename(DownloadKind::Audio, url), "audio_dQw4w9WgXcQ.m4a");
        assert_eq!(media_filename(DownloadKind::Video, "nope"), "video_download.mp4");
    }

    #[test]
    fn filenames_never_contain_separators() {
        let name = media_filename(DownloadKind::Audio, "https://youtu.be/a/b");
        assert_eq!(name, "audio_a_b.m4a");
    }
}
