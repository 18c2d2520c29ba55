use client_core::ConnectionState;
use eframe::egui::{self, Color32, RichText};

use crate::ui::theme;

pub fn swatch(ui: &mut egui::Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}

/// Horizontal bar proportional to `fraction` with the percentage drawn on top.
pub fn confidence_bar(ui: &mut egui::Ui, fraction: f32, text: &str) {
    ui.add(
        egui::ProgressBar::new(fraction)
            .desired_width(140.0)
            .text(text),
    );
}

pub fn connection_indicator(ui: &mut egui::Ui, state: ConnectionState) -> egui::Response {
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
        ui.painter()
            .circle_filled(rect.center(), 5.0, theme::connection_color(state));
        ui.label(state.label());
    })
    .response
}

/// The model quality badge. `None` shows the icon alone.
pub fn map_badge(ui: &mut egui::Ui, value: Option<f64>) {
    let text = match value {
        Some(value) => format!("🎯 mAP: {value:.1}%"),
        None => "🎯".to_string(),
    };
    egui::Frame::new()
        .fill(theme::BADGE_FILL)
        .corner_radius(10.0)
        .inner_margin(egui::Margin::symmetric(10, 4))
        .show(ui, |ui| {
            ui.label(RichText::new(text).strong());
        });
}

/// Framed drop target. Returns true when its browse button was clicked.
pub fn dropzone(ui: &mut egui::Ui, hovering_files: bool, prompt: &str) -> bool {
    let stroke_color = if hovering_files {
        theme::DROPZONE_ACTIVE
    } else {
        theme::DROPZONE_IDLE
    };
    let fill = if hovering_files {
        theme::DROPZONE_ACTIVE.gamma_multiply(0.15)
    } else {
        Color32::TRANSPARENT
    };
    let mut clicked = false;
    egui::Frame::new()
        .stroke(egui::Stroke::new(2.0, stroke_color))
        .fill(fill)
        .corner_radius(8.0)
        .inner_margin(egui::Margin::same(20))
        .show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("📁").size(28.0));
                ui.label(prompt);
                clicked = ui.button("Browse").clicked();
            });
        });
    clicked
}

pub fn stat(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.vertical(|ui| {
        ui.label(RichText::new(value).size(20.0).strong());
        ui.label(RichText::new(label).weak());
    });
}
