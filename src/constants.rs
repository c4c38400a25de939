//! Application constants and configuration

use std::time::Duration;

pub const APP_NAME: &str = "Bulbeat";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// Remote download API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/v1/youtube";
pub const API_URL_ENV: &str = "BULBEAT_API_URL";
pub const DEFAULT_VIDEO_FORMAT: &str = "best[ext=mp4]/best";
pub const VIDEO_QUALITY: &str = "best";
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for the JSON calls (`/info`, `/health`); payload downloads have none
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Simulated progress
pub const PROGRESS_TICK: Duration = Duration::from_millis(500);
pub const PROGRESS_MAX_STEP: f32 = 15.0;
pub const PROGRESS_CEILING: f32 = 90.0;
pub const RESET_DELAY: Duration = Duration::from_millis(1000);

// User-facing messages
pub const MSG_INVALID_URL: &str = "URL do YouTube inválida";
pub const MSG_BUSY: &str = "Já existe uma operação em andamento";
pub const MSG_CANCELLED: &str = "Download cancelado";
pub const MSG_INFO_FAILED: &str = "Erro ao obter informações do vídeo";
pub const MSG_VIDEO_FAILED: &str = "Erro no download do vídeo";
pub const MSG_AUDIO_FAILED: &str = "Erro no download do áudio";
