//! Colours and visuals.

use client_core::ConnectionState;
use eframe::egui::{self, Color32};
use shared::domain::Rgb;

pub const DROPZONE_IDLE: Color32 = Color32::from_rgb(0x5A, 0x67, 0x7D);
pub const DROPZONE_ACTIVE: Color32 = Color32::from_rgb(0x4C, 0xAF, 0x50);
pub const BADGE_FILL: Color32 = Color32::from_rgb(0x2D, 0x3A, 0x4F);

pub fn color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

pub fn color32_alpha(rgb: Rgb, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(rgb.0, rgb.1, rgb.2, alpha)
}

pub fn connection_color(state: ConnectionState) -> Color32 {
    match state {
        ConnectionState::Connected => Color32::from_rgb(0x4C, 0xAF, 0x50),
        ConnectionState::Disconnected => Color32::from_rgb(0xE5, 0x39, 0x35),
        ConnectionState::Unknown => Color32::GRAY,
    }
}

pub fn apply_visuals(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.visuals = egui::Visuals::dark();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);
    ctx.set_style(style);
}
