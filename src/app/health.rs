//! API health indicator

use super::App;
use crate::api::ApiClient;
use chrono::{DateTime, Local};
use eframe::egui;
use std::sync::PoisonError;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub enum ApiHealth {
    #[default]
    Unknown,
    Checking,
    Online {
        status: String,
        server_time: String,
        checked_at: DateTime<Local>,
    },
    Offline {
        error: String,
        checked_at: DateTime<Local>,
    },
}

impl ApiHealth {
    pub fn label(&self) -> String {
        match self {
            Self::Unknown => "API: não verificada".to_string(),
            Self::Checking => "API: verificando...".to_string(),
            Self::Online { status, checked_at, .. } => {
                format!("API: {} ({})", status, checked_at.format("%H:%M:%S"))
            }
            Self::Offline { checked_at, .. } => {
                format!("API: indisponível ({})", checked_at.format("%H:%M:%S"))
            }
        }
    }
}

pub async fn probe_health(client: &ApiClient) -> ApiHealth {
    match client.health_check().await {
        Ok(health) => {
            info!(status = %health.status, base_url = client.base_url(), "API health check ok");
            ApiHealth::Online {
                status: health.status,
                server_time: health.timestamp,
                checked_at: Local::now(),
            }
        }
        Err(e) => {
            warn!(error = %e, base_url = client.base_url(), "API health check failed");
            ApiHealth::Offline {
                error: e.to_string(),
                checked_at: Local::now(),
            }
        }
    }
}

impl App {
    pub fn check_api_health(&mut self, ctx: &egui::Context) {
        *self.health.lock().unwrap_or_else(PoisonError::into_inner) = ApiHealth::Checking;
        let client = self.controller.client().clone();
        let slot = self.health.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = probe_health(&client).await;
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = result;
            ctx.request_repaint();
        });
    }

    pub fn api_health(&self) -> ApiHealth {
        self.health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
