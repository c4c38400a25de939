//! App module - contains the main application state and logic

pub mod downloads;
pub mod health;
mod thumbnails;

pub(crate) use thumbnails::ThumbnailView;

use crate::api::{ApiClient, RequestError};
use crate::delivery::FolderSink;
use crate::settings::Settings;
use crate::theme;
use downloads::DownloadController;
use eframe::egui;
use health::ApiHealth;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thumbnails::ThumbnailCache;
use tracing::{info, warn};

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) controller: DownloadController,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) http: reqwest::Client,
    // Input
    pub(crate) url_input: String,
    pub(crate) focus_input: bool,
    // Info card
    pub(crate) dismissed_info_id: Option<String>,
    pub(crate) thumbnails: ThumbnailCache,
    // API health
    pub(crate) health: Arc<Mutex<ApiHealth>>,
    pub(crate) health_check_started: bool,
    // Settings panel
    pub(crate) show_settings: bool,
    pub(crate) api_base_url_str: String,
    pub(crate) download_path: PathBuf,
    pub(crate) download_path_str: String,
    pub(crate) open_folder_after_download: bool,
    pub(crate) settings_error: Option<String>,
    // Window
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    pub(crate) data_dir: PathBuf,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        data_dir: PathBuf,
        runtime: tokio::runtime::Runtime,
    ) -> Result<Self, RequestError> {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        theme::apply_visuals(&cc.egui_ctx);

        let base_url = settings.api_base_url();
        let download_path = settings.download_path_or_default();
        info!(base_url = %base_url, download_path = %download_path.display(), "Configuring API client");

        let client = ApiClient::new(&base_url)?;
        let controller = DownloadController::new(
            client,
            Arc::new(FolderSink::new(download_path.clone())),
            cc.egui_ctx.clone(),
        );
        controller.set_download_kind(settings.download_kind);

        Ok(Self {
            controller,
            runtime,
            http: reqwest::Client::new(),
            url_input: String::new(),
            focus_input: true,
            dismissed_info_id: None,
            thumbnails: ThumbnailCache::default(),
            health: Arc::new(Mutex::new(ApiHealth::default())),
            health_check_started: false,
            show_settings: false,
            api_base_url_str: settings.api_base_url.clone().unwrap_or_default(),
            download_path: download_path.clone(),
            download_path_str: download_path.to_string_lossy().to_string(),
            open_folder_after_download: settings.open_folder_after_download,
            settings_error: None,
            window_pos: None,
            window_size: None,
            needs_center: false,
            data_dir,
        })
    }

    pub fn save_settings(&self) {
        let api_base_url = self.api_base_url_str.trim();
        let settings = Settings {
            window_x: self.window_pos.map(|p| p.x),
            window_y: self.window_pos.map(|p| p.y),
            window_w: self.window_size.map(|s| s.x),
            window_h: self.window_size.map(|s| s.y),
            download_path: Some(self.download_path_str.clone()),
            api_base_url: (!api_base_url.is_empty()).then(|| api_base_url.to_string()),
            download_kind: self.controller.snapshot().download_kind,
            open_folder_after_download: self.open_folder_after_download,
        };
        settings.save(&self.data_dir);
    }

    /// Rebuild the controller with the API URL and download folder from the
    /// settings panel. Refused while an action is running.
    pub fn apply_connection_settings(&mut self, ctx: &egui::Context) {
        let snapshot = self.controller.snapshot();
        if snapshot.is_busy() {
            self.settings_error = Some("Aguarde o término da operação atual".to_string());
            return;
        }

        let override_url = self.api_base_url_str.trim();
        let base_url = crate::settings::resolve_api_base_url(
            (!override_url.is_empty()).then_some(override_url),
            std::env::var(crate::constants::API_URL_ENV).ok().as_deref(),
        );
        let client = match ApiClient::new(&base_url) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to build API client");
                self.settings_error = Some(e.to_string());
                return;
            }
        };

        self.download_path = PathBuf::from(self.download_path_str.trim());
        let controller = DownloadController::new(
            client,
            Arc::new(FolderSink::new(self.download_path.clone())),
            ctx.clone(),
        );
        controller.set_download_kind(snapshot.download_kind);
        self.controller = controller;
        self.settings_error = None;
        info!(base_url = %base_url, download_path = %self.download_path.display(), "Connection settings applied");

        self.save_settings();
        self.check_api_health(ctx);
    }

    pub fn pick_download_folder(&mut self) {
        if let Some(folder) = rfd::FileDialog::new()
            .set_directory(&self.download_path)
            .pick_folder()
        {
            self.download_path_str = folder.to_string_lossy().to_string();
        }
    }
}
