//! In-process stand-in for the download API, used by tests

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct MockApi {
    failure: Option<(u16, Vec<String>)>,
    delay: Duration,
    info_queries: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

impl MockApi {
    /// Every endpoint except `/health` answers with this status and messages
    pub fn failing(status: u16, messages: &[&str]) -> Self {
        Self {
            failure: Some((status, messages.iter().map(|m| m.to_string()).collect())),
            ..Self::default()
        }
    }

    /// Delay applied before answering download requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn last_info_query(&self) -> Option<String> {
        self.info_queries.lock().unwrap().last().cloned()
    }

    pub fn last_body(&self, path: &str) -> Option<serde_json::Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
    }

    pub fn download_calls(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    fn error_response(&self) -> Option<Response> {
        let (status, messages) = self.failure.as_ref()?;
        let status = StatusCode::from_u16(*status).unwrap();
        let body = serde_json::json!({
            "statusCode": status.as_u16(),
            "timestamp": "2026-10-19T00:00:00.000Z",
            "path": "/api/v1/youtube",
            "method": "POST",
            "message": messages,
        });
        Some((status, Json(body)).into_response())
    }
}

pub fn sample_info_json() -> serde_json::Value {
    serde_json::json!({
        "id": "dQw4w9WgXcQ",
        "title": "Never Gonna Give You Up",
        "duration": 212,
        "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
        "uploader": "Rick Astley",
        "view_count": 1_500_000_000u64,
        "formats": [
            {"format_id": "18", "ext": "mp4", "resolution": "640x360", "filesize": 1024, "vcodec": "avc1", "acodec": "mp4a"}
        ]
    })
}

async fn info(
    State(mock): State<MockApi>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    mock.info_queries
        .lock()
        .unwrap()
        .push(params.get("url").cloned().unwrap_or_default());
    if let Some(response) = mock.error_response() {
        return response;
    }
    Json(sample_info_json()).into_response()
}

async fn download(State(mock): State<MockApi>, Json(body): Json<serde_json::Value>) -> Response {
    mock.bodies.lock().unwrap().push(("/download".into(), body));
    tokio::time::sleep(mock.delay).await;
    if let Some(response) = mock.error_response() {
        return response;
    }
    b"video-bytes".to_vec().into_response()
}

async fn download_audio(
    State(mock): State<MockApi>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    mock.bodies.lock().unwrap().push(("/download-audio".into(), body));
    tokio::time::sleep(mock.delay).await;
    if let Some(response) = mock.error_response() {
        return response;
    }
    b"audio-bytes".to_vec().into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "timestamp": "2026-10-19T00:00:00.000Z"}))
}

/// Serves `mock` on an ephemeral port and returns its base URL
pub async fn spawn_mock_api(mock: MockApi) -> String {
    let app = Router::new()
        .route("/info", get(info))
        .route("/download", post(download))
        .route("/download-audio", post(download_audio))
        .route("/health", get(health))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Accepts connections and never answers them
pub async fn spawn_silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}
