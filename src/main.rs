#![windows_subsystem = "windows"]
//! Bulbeat - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod api;
mod app;
mod constants;
mod delivery;
mod settings;
mod theme;
mod types;
mod ui;
mod utils;
mod youtube;

#[cfg(test)]
mod test_support;

use app::health::ApiHealth;
use app::{App, ThumbnailView};
use constants::*;
use eframe::egui;
use settings::Settings;
use tracing::{error, info};
use types::{DownloadState, VideoInfo};
use ui::components::{error_banner, kind_toggle, progress_bar, status_dot};
use utils::{format_bytes, format_count, format_duration, get_data_dir};

/// Initialize file logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "bulbeat.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bulbeat=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> eframe::Result<()> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, "Bulbeat starting");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let settings = Settings::load(&data_dir);
    let win_pos = match (settings.window_x, settings.window_y) {
        (Some(x), Some(y)) => Some(egui::pos2(x, y)),
        _ => None,
    };
    let win_size = match (settings.window_w, settings.window_h) {
        (Some(w), Some(h)) => Some(egui::vec2(w, h)),
        _ => None,
    };

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size(win_size.unwrap_or(egui::vec2(560.0, 760.0)))
        .with_min_inner_size([480.0, 560.0])
        .with_title(APP_NAME);
    let needs_center = win_pos.is_none();
    if let Some(pos) = win_pos {
        viewport = viewport.with_position(pos);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| {
            let mut app = App::new(cc, settings, data_dir, runtime).map_err(|e| {
                error!(error = %e, "Failed to initialize API client");
                e
            })?;
            app.needs_center = needs_center;
            Ok(Box::new(app))
        }),
    )
}

// ============================================================================
// MAIN UPDATE LOOP & UI RENDERING
// ============================================================================

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window position/size for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().outer_rect {
                self.window_pos = Some(rect.min);
            }
            if let Some(rect) = i.viewport().inner_rect {
                self.window_size = Some(rect.size());
            }
        });

        if !self.health_check_started {
            self.health_check_started = true;
            self.check_api_health(ctx);
        }

        // Center window on first launch
        if self.needs_center {
            self.needs_center = false;
            if let Some(cmd) = egui::ViewportCommand::center_on_screen(ctx) {
                ctx.send_viewport_cmd(cmd);
            }
        }

        let state = self.controller.snapshot();

        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::symmetric(16, 10)),
            )
            .show_separator_line(false)
            .show(ctx, |ui| self.render_top_bar(ui));

        if self.show_settings {
            egui::SidePanel::right("settings_panel")
                .exact_width(theme::SETTINGS_PANEL_WIDTH)
                .resizable(false)
                .frame(theme::settings_frame())
                .show(ctx, |ui| self.render_settings(ui, ctx));
        }

        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::symmetric(24, 8)),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.set_max_width(theme::CONTENT_WIDTH);
                        self.render_main(ui, ctx, &state);
                    });
                });
            });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application shutting down");
        self.controller.cancel();
        self.save_settings();
    }
}

impl App {
    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("{}  BULBEAT", egui_phosphor::regular::WAVEFORM))
                    .size(theme::FONT_LABEL)
                    .color(theme::ACCENT)
                    .strong(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let gear = egui::RichText::new(egui_phosphor::regular::GEAR).size(theme::FONT_TITLE);
                if ui
                    .add(egui::Button::new(gear).frame(false))
                    .on_hover_text("Configurações")
                    .clicked()
                {
                    self.show_settings = !self.show_settings;
                }

                let health = self.api_health();
                ui.label(
                    egui::RichText::new(health.label())
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_DIM),
                );
                let (color, tooltip) = match &health {
                    ApiHealth::Unknown => (theme::TEXT_DIM, "Aguardando verificação".to_string()),
                    ApiHealth::Checking => (theme::STATUS_WARNING, "Verificando...".to_string()),
                    ApiHealth::Online { server_time, .. } => {
                        (theme::STATUS_SUCCESS, format!("Horário do servidor: {server_time}"))
                    }
                    ApiHealth::Offline { error, .. } => (theme::STATUS_ERROR, error.clone()),
                };
                status_dot(ui, color).on_hover_text(tooltip);
            });
        });
    }

    fn render_main(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, state: &DownloadState) {
        ui.add_space(theme::SPACING_XL * 2.0);
        ui.label(
            egui::RichText::new("Bulbeat")
                .size(theme::FONT_HERO)
                .color(theme::ACCENT)
                .strong(),
        );
        ui.label(
            egui::RichText::new("Cole um link do YouTube e baixe em MP4 ou M4A")
                .size(theme::FONT_BODY)
                .color(theme::TEXT_MUTED),
        );
        ui.add_space(theme::SPACING_XL * 1.5);

        // URL input
        let has_value = !self.url_input.trim().is_empty();
        let input_id = ui.make_persistent_id("url_input");
        let focused = ctx.memory(|m| m.has_focus(input_id));
        let mut submitted = false;
        theme::input_frame(focused || has_value).show(ui, |ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.url_input)
                    .id(input_id)
                    .hint_text("Cole a URL do YouTube aqui...")
                    .font(egui::FontId::proportional(theme::FONT_BODY + 2.0))
                    .horizontal_align(egui::Align::Center)
                    .frame(false)
                    .min_size(egui::vec2(0.0, theme::INPUT_HEIGHT - 20.0))
                    .desired_width(f32::INFINITY),
            );
            if self.focus_input {
                self.focus_input = false;
                response.request_focus();
            }
            submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        });
        if focused {
            ui.label(
                egui::RichText::new("Pressione Enter para baixar")
                    .size(theme::FONT_SMALL)
                    .color(theme::TEXT_DIM),
            );
        }
        if submitted && has_value && state.can_download() {
            self.start_download();
        }

        ui.add_space(theme::SPACING_LG);

        // Format toggle
        ui.scope(|ui| {
            ui.set_max_width(180.0 + theme::SPACING_SM);
            if let Some(kind) = kind_toggle(ui, state.download_kind, !state.is_downloading) {
                self.controller.set_download_kind(kind);
            }
        });

        ui.add_space(theme::SPACING_MD);

        // Actions
        ui.horizontal(|ui| {
            let info_label = if state.is_fetching_info {
                "Buscando...".to_string()
            } else {
                format!("{}  Ver Info", egui_phosphor::regular::INFO)
            };
            let info_enabled = has_value && state.can_fetch_info();
            if ui
                .add_enabled(
                    info_enabled,
                    theme::button(info_label).min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT)),
                )
                .clicked()
            {
                self.start_info_fetch();
            }

            let download_label = if state.is_downloading {
                "Baixando...".to_string()
            } else {
                format!(
                    "{}  Baixar {}",
                    egui_phosphor::regular::DOWNLOAD_SIMPLE,
                    state.download_kind.label()
                )
            };
            let download_enabled = has_value && state.can_download();
            if ui
                .add_enabled(
                    download_enabled,
                    theme::button_accent(download_label)
                        .min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT)),
                )
                .clicked()
            {
                self.start_download();
            }

            if state.is_downloading && state.progress < 100.0 && state.error.is_none() {
                if ui
                    .add(
                        theme::button_danger(format!("{}  Cancelar", egui_phosphor::regular::STOP))
                            .min_size(egui::vec2(0.0, theme::BUTTON_HEIGHT)),
                    )
                    .clicked()
                {
                    self.controller.cancel();
                }
            }
        });

        if state.is_downloading {
            ui.add_space(theme::SPACING_MD);
            progress_bar(ui, state.progress);
        }

        if let Some(message) = &state.error {
            ui.add_space(theme::SPACING_MD);
            if error_banner(ui, message) {
                self.controller.clear_error();
            }
        }

        if let Some(path) = &state.last_saved {
            ui.add_space(theme::SPACING_MD);
            ui.horizontal_wrapped(|ui| {
                ui.colored_label(theme::STATUS_SUCCESS, egui_phosphor::regular::CHECK_CIRCLE);
                ui.label(
                    egui::RichText::new(format!("Salvo em {}", path.display()))
                        .size(theme::FONT_LABEL)
                        .color(theme::TEXT_SECONDARY),
                );
                if ui
                    .add(theme::button(format!("{}  Abrir pasta", egui_phosphor::regular::FOLDER_OPEN)))
                    .clicked()
                {
                    self.open_last_saved_folder();
                }
            });
        }

        if let Some(info) = &state.video_info {
            if self.dismissed_info_id.as_deref() != Some(info.id.as_str()) {
                ui.add_space(theme::SPACING_XL);
                self.render_info_card(ui, ctx, info);
            }
        }
    }

    fn render_info_card(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, info: &VideoInfo) {
        let mut close = false;
        theme::card_frame().show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                match self.thumbnail(ctx, &info.thumbnail) {
                    ThumbnailView::Ready(texture) => {
                        let [w, h] = texture.size();
                        let aspect = h as f32 / w.max(1) as f32;
                        ui.image(egui::load::SizedTexture::new(
                            texture.id(),
                            egui::vec2(theme::THUMBNAIL_WIDTH, theme::THUMBNAIL_WIDTH * aspect),
                        ));
                    }
                    ThumbnailView::Loading => {
                        ui.allocate_ui(egui::vec2(theme::THUMBNAIL_WIDTH, 72.0), |ui| {
                            ui.centered_and_justified(|ui| {
                                ui.spinner();
                            });
                        });
                    }
                    ThumbnailView::Unavailable => {
                        ui.allocate_ui(egui::vec2(theme::THUMBNAIL_WIDTH, 72.0), |ui| {
                            ui.centered_and_justified(|ui| {
                                ui.label(
                                    egui::RichText::new(egui_phosphor::regular::IMAGE_BROKEN)
                                        .size(theme::FONT_HERO * 0.6)
                                        .color(theme::TEXT_DIM),
                                );
                            });
                        });
                    }
                }

                ui.vertical(|ui| {
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(&info.title)
                                .size(theme::FONT_BODY)
                                .color(theme::TEXT_PRIMARY)
                                .strong(),
                        )
                        .wrap(),
                    );
                    ui.label(
                        egui::RichText::new(format!("Canal: {}", info.uploader))
                            .size(theme::FONT_LABEL)
                            .color(theme::ACCENT),
                    );
                    ui.label(
                        egui::RichText::new(format!(
                            "Duração: {}  ·  {} visualizações",
                            format_duration(info.duration),
                            format_count(info.view_count)
                        ))
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_MUTED),
                    );
                });
            });

            if !info.formats.is_empty() {
                ui.add_space(theme::SPACING_SM);
                ui.label(
                    egui::RichText::new(format!("{} formatos disponíveis", info.formats.len()))
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_DIM),
                );
                for format in info.formats.iter().take(4) {
                    let mut parts = vec![format.format_id.clone()];
                    parts.extend(format.extension.clone());
                    parts.extend(format.resolution.clone());
                    parts.extend(format.filesize.map(format_bytes));
                    ui.label(
                        egui::RichText::new(parts.join(" · "))
                            .size(theme::FONT_SMALL)
                            .monospace()
                            .color(theme::TEXT_MUTED),
                    );
                }
            }

            ui.add_space(theme::SPACING_SM);
            if ui.add(theme::button("Fechar")).clicked() {
                close = true;
            }
        });
        if close {
            self.dismissed_info_id = Some(info.id.clone());
        }
    }

    fn render_settings(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.label(
            egui::RichText::new("Configurações")
                .size(theme::FONT_TITLE)
                .color(theme::TEXT_PRIMARY)
                .strong(),
        );
        ui.add_space(theme::SPACING_LG);

        ui.label(egui::RichText::new("URL da API").size(theme::FONT_LABEL).color(theme::TEXT_MUTED));
        ui.add(
            egui::TextEdit::singleline(&mut self.api_base_url_str)
                .hint_text(DEFAULT_API_BASE_URL)
                .desired_width(f32::INFINITY),
        );
        ui.label(
            egui::RichText::new(format!("Vazio usa {API_URL_ENV} ou o padrão"))
                .size(theme::FONT_SMALL)
                .color(theme::TEXT_DIM),
        );
        ui.add_space(theme::SPACING_MD);

        ui.label(egui::RichText::new("Pasta de download").size(theme::FONT_LABEL).color(theme::TEXT_MUTED));
        ui.horizontal(|ui| {
            let picker_width = 36.0;
            ui.add(
                egui::TextEdit::singleline(&mut self.download_path_str)
                    .desired_width(ui.available_width() - picker_width),
            );
            if ui
                .add(theme::button(egui_phosphor::regular::FOLDER_OPEN))
                .on_hover_text("Escolher pasta")
                .clicked()
            {
                self.pick_download_folder();
            }
        });
        ui.add_space(theme::SPACING_MD);

        if ui
            .checkbox(&mut self.open_folder_after_download, "Abrir pasta após o download")
            .changed()
        {
            self.save_settings();
        }
        ui.add_space(theme::SPACING_LG);

        ui.horizontal(|ui| {
            if ui.add(theme::button_accent("Aplicar")).clicked() {
                self.apply_connection_settings(ctx);
            }
            if ui
                .add(theme::button(format!("{}  Verificar API", egui_phosphor::regular::ARROWS_CLOCKWISE)))
                .clicked()
            {
                self.check_api_health(ctx);
            }
        });

        if let Some(message) = &self.settings_error {
            ui.add_space(theme::SPACING_SM);
            ui.colored_label(theme::STATUS_ERROR, message);
        }

        ui.add_space(theme::SPACING_LG);
        ui.label(
            egui::RichText::new(format!("Usando {}", self.controller.client().base_url()))
                .size(theme::FONT_SMALL)
                .color(theme::TEXT_DIM),
        );
        ui.label(
            egui::RichText::new(format!("{} v{}", APP_NAME, APP_VERSION))
                .size(theme::FONT_SMALL)
                .color(theme::TEXT_DIM),
        );
    }
}
