//! Thumbnail loading for the video info card

use super::App;
use eframe::egui;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Result of a background fetch, waiting to be picked up on the UI thread
pub(crate) enum ThumbnailLoad {
    Ready(String, egui::ColorImage),
    Failed(String),
}

/// What the info card should draw in the thumbnail slot
pub enum ThumbnailView {
    Ready(egui::TextureHandle),
    Loading,
    Unavailable,
}

/// Texture for the current info card plus the bookkeeping around its fetch
#[derive(Default)]
pub(crate) struct ThumbnailCache {
    texture: Option<(String, egui::TextureHandle)>,
    requested: Option<String>,
    failed: Option<String>,
    pending: Arc<Mutex<Option<ThumbnailLoad>>>,
}

impl ThumbnailCache {
    /// Current view for `url`, and whether a fetch for it has to be started
    fn poll(&mut self, ctx: &egui::Context, url: &str) -> (ThumbnailView, bool) {
        if url.is_empty() {
            return (ThumbnailView::Unavailable, false);
        }

        let load = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match load {
            Some(ThumbnailLoad::Ready(loaded_url, image)) => {
                let texture = ctx.load_texture("video_thumbnail", image, egui::TextureOptions::LINEAR);
                self.texture = Some((loaded_url, texture));
            }
            Some(ThumbnailLoad::Failed(failed_url)) => self.failed = Some(failed_url),
            None => {}
        }

        if let Some((loaded_url, texture)) = &self.texture {
            if loaded_url == url {
                return (ThumbnailView::Ready(texture.clone()), false);
            }
        }
        if self.failed.as_deref() == Some(url) {
            return (ThumbnailView::Unavailable, false);
        }
        if self.requested.as_deref() != Some(url) {
            self.requested = Some(url.to_string());
            return (ThumbnailView::Loading, true);
        }
        (ThumbnailView::Loading, false)
    }

    /// Allow a failed thumbnail to be fetched again
    pub(crate) fn forget_failure(&mut self) {
        if self.failed.take().is_some() {
            self.requested = None;
        }
    }
}

pub(crate) fn decode_thumbnail(bytes: &[u8]) -> Option<egui::ColorImage> {
    let img = image::load_from_memory(bytes).ok()?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Some(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

impl App {
    /// Thumbnail for `url`, starting a background fetch the first time it's asked for
    pub fn thumbnail(&mut self, ctx: &egui::Context, url: &str) -> ThumbnailView {
        let (view, fetch) = self.thumbnails.poll(ctx, url);
        if fetch {
            self.fetch_thumbnail(ctx, url.to_string());
        }
        view
    }

    fn fetch_thumbnail(&self, ctx: &egui::Context, url: String) {
        debug!(url = %url, "Fetching thumbnail");
        let client = self.http.clone();
        let slot = self.thumbnails.pending.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let bytes = match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => response.bytes().await.ok(),
                Ok(response) => {
                    warn!(status = %response.status(), url = %url, "Thumbnail request failed");
                    None
                }
                Err(e) => {
                    warn!(error = %e, url = %url, "Thumbnail request failed");
                    None
                }
            };
            let load = match bytes.as_deref().and_then(decode_thumbnail) {
                Some(image) => ThumbnailLoad::Ready(url, image),
                None => ThumbnailLoad::Failed(url),
            };
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(load);
            ctx.request_repaint();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const URL: &str = "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg";

    fn finish(cache: &ThumbnailCache, load: ThumbnailLoad) {
        *cache.pending.lock().unwrap() = Some(load);
    }

    #[test]
    fn decodes_png() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 200, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_thumbnail(&buf).unwrap();
        assert_eq!(decoded.size, [3, 2]);
    }

    #[test]
    fn garbage_is_ignored() {
        assert!(decode_thumbnail(b"definitely not an image").is_none());
    }

    #[test]
    fn fetch_starts_once_then_shows_texture() {
        let ctx = egui::Context::default();
        let mut cache = ThumbnailCache::default();

        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Loading, true)));
        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Loading, false)));

        finish(&cache, ThumbnailLoad::Ready(URL.to_string(), egui::ColorImage::new([2, 2], egui::Color32::WHITE)));
        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Ready(_), false)));
    }

    #[test]
    fn failed_fetch_shows_placeholder_until_forgotten() {
        let ctx = egui::Context::default();
        let mut cache = ThumbnailCache::default();

        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Loading, true)));
        finish(&cache, ThumbnailLoad::Failed(URL.to_string()));
        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Unavailable, false)));
        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Unavailable, false)));

        cache.forget_failure();
        assert!(matches!(cache.poll(&ctx, URL), (ThumbnailView::Loading, true)));
    }

    #[test]
    fn missing_url_is_unavailable() {
        let ctx = egui::Context::default();
        let mut cache = ThumbnailCache::default();
        assert!(matches!(cache.poll(&ctx, ""), (ThumbnailView::Unavailable, false)));
    }
}
