//! Reusable UI components
//!
//! This module contains standalone UI components that can be used
//! throughout the application.

use crate::theme;
use crate::types::DownloadKind;
use eframe::egui;

/// Segmented MP4/M4A selector. Returns the newly picked kind, if any.
pub fn kind_toggle(ui: &mut egui::Ui, current: DownloadKind, enabled: bool) -> Option<DownloadKind> {
    let mut picked = None;
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        for (kind, icon) in [
            (DownloadKind::Video, egui_phosphor::regular::FILM_STRIP),
            (DownloadKind::Audio, egui_phosphor::regular::MUSIC_NOTES),
        ] {
            let selected = kind == current;
            let (fill, text_color) = if selected {
                (theme::TOGGLE_SELECTED, theme::ACCENT)
            } else {
                (theme::TOGGLE_UNSELECTED, theme::TEXT_MUTED)
            };
            let button = egui::Button::new(
                egui::RichText::new(format!("{}  {}", icon, kind.label()))
                    .size(theme::FONT_LABEL)
                    .color(text_color),
            )
            .fill(fill)
            .corner_radius(theme::RADIUS_DEFAULT)
            .min_size(egui::vec2(90.0, theme::BUTTON_HEIGHT));
            if ui.add_enabled(enabled, button).clicked() && !selected {
                picked = Some(kind);
            }
        }
    });
    picked
}

/// Progress bar with the percentage printed to its right
pub fn progress_bar(ui: &mut egui::Ui, progress: f32) {
    let fraction = (progress / 100.0).clamp(0.0, 1.0);
    ui.horizontal(|ui| {
        let pct_width = 40.0;
        let bar = egui::ProgressBar::new(fraction)
            .desired_width(ui.available_width() - pct_width - ui.spacing().item_spacing.x)
            .desired_height(theme::PROGRESS_HEIGHT)
            .corner_radius(theme::PROGRESS_HEIGHT / 2.0)
            .fill(theme::ACCENT);
        ui.add(bar);
        ui.add_sized(
            [pct_width, theme::PROGRESS_HEIGHT],
            egui::Label::new(
                egui::RichText::new(format!("{:.0}%", progress))
                    .size(theme::FONT_SMALL)
                    .color(theme::TEXT_MUTED),
            ),
        );
    });
}

/// Small filled circle used as a status light
pub fn status_dot(ui: &mut egui::Ui, color: egui::Color32) -> egui::Response {
    let size = 8.0;
    let (rect, response) = ui.allocate_exact_size(egui::vec2(size, size), egui::Sense::hover());
    if ui.is_rect_visible(rect) {
        ui.painter().circle_filled(rect.center(), size / 2.0, color);
    }
    response
}

/// Error line with a dismiss button. Returns true when dismissed.
pub fn error_banner(ui: &mut egui::Ui, message: &str) -> bool {
    let mut dismissed = false;
    theme::error_frame().show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.colored_label(theme::STATUS_ERROR, egui_phosphor::regular::WARNING_CIRCLE);
            ui.add(
                egui::Label::new(
                    egui::RichText::new(message)
                        .size(theme::FONT_LABEL)
                        .color(theme::STATUS_ERROR),
                )
                .wrap(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(egui::Button::new(egui_phosphor::regular::X).frame(false))
                    .on_hover_text("Fechar")
                    .clicked()
                {
                    dismissed = true;
                }
            });
        });
    });
    dismissed
}
