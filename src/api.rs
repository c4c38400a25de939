//! Client for the remote YouTube download API

use crate::constants::*;
use crate::types::*;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Failure of a single API call
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Non-2xx response; `message` is what the server said, joined
    #[error("{message}")]
    Server { status: StatusCode, message: String },
    #[error("Falha de conexão com a API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Resposta inválida da API: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Handle to the download API. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, RequestError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("{}/{}", APP_NAME, APP_VERSION))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override how long `/info` and `/health` may take before giving up
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_video_info(&self, url: &str) -> Result<VideoInfo, RequestError> {
        let path = format!("/info?url={}", urlencoding::encode(url));
        self.get_json(&path).await
    }

    pub async fn download_video(&self, url: &str, format: &str) -> Result<Vec<u8>, RequestError> {
        let body = VideoDownloadRequest {
            url,
            format,
            quality: VIDEO_QUALITY,
            output: OUTPUT_TEMPLATE,
        };
        self.post_for_bytes("/download", &body).await
    }

    pub async fn download_audio(&self, url: &str) -> Result<Vec<u8>, RequestError> {
        self.post_for_bytes("/download-audio", &AudioDownloadRequest { url })
            .await
    }

    /// Video downloads use [`DEFAULT_VIDEO_FORMAT`]
    pub async fn download(&self, kind: DownloadKind, url: &str) -> Result<Vec<u8>, RequestError> {
        match kind {
            DownloadKind::Video => self.download_video(url, DEFAULT_VIDEO_FORMAT).await,
            DownloadKind::Audio => self.download_audio(url).await,
        }
    }

    pub async fn health_check(&self) -> Result<HealthStatus, RequestError> {
        self.get_json("/health").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let url = self.endpoint(path);
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_for_bytes<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, RequestError> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST");
        let payload = serde_json::to_vec(body)?;
        let response = self.http.post(&url).body(payload).send().await?;
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Payload received");
        Ok(bytes.to_vec())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RequestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = server_message(status, &text);
        warn!(status = %status, message = %message, "API request failed");
        Err(RequestError::Server { status, message })
    }
}

/// Joined `message` of an API error body, or the status text when the body
/// isn't one.
fn server_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.message.joined(),
        Err(_) => format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_mock_api, spawn_silent_server, MockApi};

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new(" http://localhost:3000/api/v1/youtube/ ").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api/v1/youtube");
        assert_eq!(client.endpoint("/health"), "http://localhost:3000/api/v1/youtube/health");
    }

    #[test]
    fn server_message_falls_back_to_status() {
        assert_eq!(
            server_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":["bad format"]}"#),
            "bad format"
        );
        assert_eq!(
            server_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "HTTP 502 Bad Gateway"
        );
    }

    #[tokio::test]
    async fn fetches_video_info_with_encoded_url() {
        let mock = MockApi::default();
        let base = spawn_mock_api(mock.clone()).await;
        let client = ApiClient::new(&base).unwrap();

        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1";
        let info = client.get_video_info(url).await.unwrap();
        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.formats.len(), 1);
        assert_eq!(mock.last_info_query().as_deref(), Some(url));
    }

    #[tokio::test]
    async fn download_video_sends_full_body() {
        let mock = MockApi::default();
        let base = spawn_mock_api(mock.clone()).await;
        let client = ApiClient::new(&base).unwrap();

        let bytes = client
            .download_video("https://youtu.be/dQw4w9WgXcQ", DEFAULT_VIDEO_FORMAT)
            .await
            .unwrap();
        assert_eq!(bytes, b"video-bytes");

        let body = mock.last_body("/download").unwrap();
        assert_eq!(body["url"], "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(body["format"], "best[ext=mp4]/best");
        assert_eq!(body["quality"], "best");
        assert_eq!(body["output"], "%(title)s.%(ext)s");
    }

    #[tokio::test]
    async fn download_audio_sends_only_url() {
        let mock = MockApi::default();
        let base = spawn_mock_api(mock.clone()).await;
        let client = ApiClient::new(&base).unwrap();

        let bytes = client.download(DownloadKind::Audio, "https://youtu.be/x").await.unwrap();
        assert_eq!(bytes, b"audio-bytes");
        let body = mock.last_body("/download-audio").unwrap();
        assert_eq!(body, serde_json::json!({ "url": "https://youtu.be/x" }));
    }

    #[tokio::test]
    async fn non_success_becomes_server_error() {
        let mock = MockApi::failing(500, &["bad format"]);
        let base = spawn_mock_api(mock).await;
        let client = ApiClient::new(&base).unwrap();

        let err = client.download_audio("https://youtu.be/x").await.unwrap_err();
        match &err {
            RequestError::Server { status, message } => {
                assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "bad format");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "bad format");
    }

    #[tokio::test]
    async fn health_check_reports_status() {
        let base = spawn_mock_api(MockApi::default()).await;
        let client = ApiClient::new(&base).unwrap();
        let health = client.health_check().await.unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
    }

    #[tokio::test]
    async fn unanswered_json_calls_time_out() {
        let base = spawn_silent_server().await;
        let client = ApiClient::new(&base)
            .unwrap()
            .with_request_timeout(Duration::from_millis(200));

        let info = tokio::time::timeout(
            Duration::from_secs(5),
            client.get_video_info("https://youtu.be/dQw4w9WgXcQ"),
        )
        .await
        .expect("info request should give up on its own");
        match info.unwrap_err() {
            RequestError::Transport(e) => assert!(e.is_timeout(), "{e}"),
            other => panic!("unexpected error: {other:?}"),
        }

        let health = tokio::time::timeout(Duration::from_secs(5), client.health_check())
            .await
            .expect("health check should give up on its own");
        assert!(matches!(health, Err(RequestError::Transport(_))));
    }
}
