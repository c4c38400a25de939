//! Download logic
//!
//! [`DownloadController`] runs the info and download actions against the API and
//! projects them into a [`DownloadState`] the UI renders every frame. The API
//! doesn't report transfer progress, so while a request is in flight a ticker
//! fabricates a percentage that creeps toward [`PROGRESS_CEILING`] and jumps to
//! 100 once the payload arrives.

use super::App;
use crate::api::{ApiClient, RequestError};
use crate::constants::*;
use crate::delivery::FileSink;
use crate::types::*;
use crate::youtube::{is_valid_youtube_url, media_filename};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why an action did not complete
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{}", MSG_INVALID_URL)]
    InvalidUrl,
    /// Another action of the same type is still running
    #[error("{}", MSG_BUSY)]
    Busy,
    #[error("{}", MSG_CANCELLED)]
    Cancelled,
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Não foi possível salvar o arquivo: {0}")]
    Save(#[from] std::io::Error),
}

/// Pacing of the simulated progress bar
#[derive(Debug, Clone, Copy)]
pub struct ProgressTiming {
    pub tick: Duration,
    pub max_step: f32,
    pub ceiling: f32,
    /// How long the finished state stays visible before going idle
    pub reset_delay: Duration,
}

impl Default for ProgressTiming {
    fn default() -> Self {
        Self {
            tick: PROGRESS_TICK,
            max_step: PROGRESS_MAX_STEP,
            ceiling: PROGRESS_CEILING,
            reset_delay: RESET_DELAY,
        }
    }
}

/// Result of a finished download
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub filename: String,
    pub path: PathBuf,
}

/// Next simulated value. `roll` is a random number in `0.0..1.0`.
/// Never decreases and never crosses the ceiling on its own.
pub fn advance_progress(current: f32, roll: f32, timing: &ProgressTiming) -> f32 {
    if current >= timing.ceiling {
        return current;
    }
    (current + roll.clamp(0.0, 1.0) * timing.max_step).min(timing.ceiling)
}

#[derive(Clone)]
pub struct DownloadController {
    client: ApiClient,
    sink: Arc<dyn FileSink>,
    ctx: egui::Context,
    timing: ProgressTiming,
    state: Arc<Mutex<DownloadState>>,
    active: Arc<Mutex<Option<CancellationToken>>>,
    // Bumped by reset(); writes tagged with an older epoch are dropped
    epoch: Arc<AtomicU64>,
}

impl DownloadController {
    pub fn new(client: ApiClient, sink: Arc<dyn FileSink>, ctx: egui::Context) -> Self {
        Self::with_timing(client, sink, ctx, ProgressTiming::default())
    }

    pub fn with_timing(
        client: ApiClient,
        sink: Arc<dyn FileSink>,
        ctx: egui::Context,
        timing: ProgressTiming,
    ) -> Self {
        Self {
            client,
            sink,
            ctx,
            timing,
            state: Arc::new(Mutex::new(DownloadState::default())),
            active: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn snapshot(&self) -> DownloadState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, DownloadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` unless a reset happened since `epoch` was taken
    fn update(&self, epoch: u64, f: impl FnOnce(&mut DownloadState)) -> bool {
        let mut state = self.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        f(&mut state);
        drop(state);
        self.ctx.request_repaint();
        true
    }

    pub fn set_download_kind(&self, kind: DownloadKind) {
        self.lock().download_kind = kind;
        self.ctx.request_repaint();
    }

    pub fn clear_error(&self) {
        let cleared = self.lock().error.take().is_some();
        if cleared {
            self.ctx.request_repaint();
        }
    }

    /// Abort whatever is running and go back to the initial state
    pub fn reset(&self) {
        let mut state = self.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.active_slot().take() {
            token.cancel();
        }
        *state = DownloadState::default();
        drop(state);
        debug!("Download state reset");
        self.ctx.request_repaint();
    }

    /// Cancel the in-flight download. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        match self.active_slot().as_ref() {
            Some(token) => {
                info!("Download cancel requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn get_video_info(&self, url: &str) -> Result<VideoInfo, ActionError> {
        let epoch = {
            let mut state = self.lock();
            if state.is_fetching_info {
                return Err(ActionError::Busy);
            }
            state.is_fetching_info = true;
            state.error = None;
            self.epoch.load(Ordering::SeqCst)
        };
        self.ctx.request_repaint();

        let result = self.fetch_info(url.trim()).await;

        self.update(epoch, |state| {
            state.is_fetching_info = false;
            match &result {
                Ok(info) => state.video_info = Some(info.clone()),
                Err(e) => state.error = Some(display_message(e, MSG_INFO_FAILED)),
            }
        });
        result
    }

    async fn fetch_info(&self, url: &str) -> Result<VideoInfo, ActionError> {
        if !is_valid_youtube_url(url) {
            return Err(ActionError::InvalidUrl);
        }
        info!(url = %url, "Fetching video info");
        let info = self.client.get_video_info(url).await?;
        debug!(id = %info.id, formats = info.formats.len(), "Video info received");
        Ok(info)
    }

    /// Download using the currently selected [`DownloadKind`]
    pub async fn download(&self, url: &str) -> Result<DownloadOutcome, ActionError> {
        let kind = self.lock().download_kind;
        self.run_download(kind, url).await
    }

    pub async fn download_video(&self, url: &str) -> Result<DownloadOutcome, ActionError> {
        self.run_download(DownloadKind::Video, url).await
    }

    pub async fn download_audio(&self, url: &str) -> Result<DownloadOutcome, ActionError> {
        self.run_download(DownloadKind::Audio, url).await
    }

    async fn run_download(
        &self,
        kind: DownloadKind,
        url: &str,
    ) -> Result<DownloadOutcome, ActionError> {
        let token = CancellationToken::new();
        let epoch = {
            let mut state = self.lock();
            if state.is_downloading {
                return Err(ActionError::Busy);
            }
            state.is_downloading = true;
            state.set_progress(0.0);
            state.error = None;
            state.last_saved = None;
            *self.active_slot() = Some(token.clone());
            self.epoch.load(Ordering::SeqCst)
        };
        self.ctx.request_repaint();

        let result = self.perform_download(kind, url.trim(), epoch, &token).await;

        if let Err(e) = &result {
            let fallback = match kind {
                DownloadKind::Video => MSG_VIDEO_FAILED,
                DownloadKind::Audio => MSG_AUDIO_FAILED,
            };
            let message = display_message(e, fallback);
            warn!(kind = ?kind, error = %message, "Download failed");
            self.update(epoch, |state| state.error = Some(message));
        }

        self.schedule_reset(epoch);
        result
    }

    async fn perform_download(
        &self,
        kind: DownloadKind,
        url: &str,
        epoch: u64,
        token: &CancellationToken,
    ) -> Result<DownloadOutcome, ActionError> {
        if !is_valid_youtube_url(url) {
            return Err(ActionError::InvalidUrl);
        }
        info!(url = %url, kind = ?kind, "Starting download");

        let ticker = token.child_token();
        self.spawn_ticker(epoch, ticker.clone());

        let response = tokio::select! {
            _ = token.cancelled() => Err(ActionError::Cancelled),
            bytes = self.client.download(kind, url) => bytes.map_err(ActionError::from),
        };
        ticker.cancel();
        let bytes = response?;

        self.update(epoch, |state| state.set_progress(100.0));

        let filename = media_filename(kind, url);
        let sink = self.sink.clone();
        let name = filename.clone();
        let path = tokio::task::spawn_blocking(move || sink.deliver(&bytes, &name))
            .await
            .map_err(std::io::Error::other)??;

        self.update(epoch, |state| state.last_saved = Some(path.clone()));
        info!(file = %filename, "Download complete");
        Ok(DownloadOutcome { filename, path })
    }

    fn spawn_ticker(&self, epoch: u64, token: CancellationToken) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.timing.tick);
            // The first tick fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let roll = rand::random::<f32>();
                        let timing = this.timing;
                        this.update(epoch, |state| {
                            if !token.is_cancelled() {
                                let next = advance_progress(state.progress, roll, &timing);
                                state.set_progress(next);
                            }
                        });
                    }
                }
            }
        });
    }

    fn schedule_reset(&self, epoch: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.timing.reset_delay).await;
            this.update(epoch, |state| {
                state.is_downloading = false;
                state.set_progress(0.0);
                *this.active_slot() = None;
            });
        });
    }
}

/// Error text for the UI; falls back to `fallback` when the error has none
fn display_message(error: &ActionError, fallback: &str) -> String {
    let text = error.to_string();
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

fn open_folder_of(path: &Path) {
    let Some(dir) = path.parent() else {
        return;
    };
    if let Err(e) = open::that(dir) {
        warn!(error = %e, path = %dir.display(), "Failed to open download folder");
    }
}

impl App {
    pub fn start_download(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            return;
        }
        let controller = self.controller.clone();
        let open_after = self.open_folder_after_download;
        self.runtime.spawn(async move {
            match controller.download(&url).await {
                Ok(outcome) if open_after => open_folder_of(&outcome.path),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Download action ended"),
            }
        });
    }

    pub fn start_info_fetch(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            return;
        }
        self.dismissed_info_id = None;
        self.thumbnails.forget_failure();
        let controller = self.controller.clone();
        self.runtime.spawn(async move {
            if let Err(e) = controller.get_video_info(&url).await {
                debug!(error = %e, "Info action ended");
            }
        });
    }

    pub fn open_last_saved_folder(&self) {
        if let Some(path) = self.controller.snapshot().last_saved {
            open_folder_of(&path);
        }
    }
}
