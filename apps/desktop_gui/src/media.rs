//! Image decoding for previews. Runs on the backend bridge, never on the UI thread.

use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui;

pub const PREVIEW_MAX_DIMENSION: u32 = 1024;
pub const THUMBNAIL_MAX_DIMENSION: u32 = 256;

/// Decoded RGBA pixels ready to be uploaded as a texture.
#[derive(Clone)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl PreviewImage {
    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied([self.width, self.height], &self.rgba)
    }
}

impl std::fmt::Debug for PreviewImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

pub fn decode_preview(bytes: &[u8], max_dimension: u32) -> Result<PreviewImage> {
    let dynamic = image::load_from_memory(bytes).context("unsupported or corrupt image")?;
    let resized = if dynamic.width() > max_dimension || dynamic.height() > max_dimension {
        dynamic.thumbnail(max_dimension, max_dimension)
    } else {
        dynamic
    };
    let rgba = resized.to_rgba8();
    Ok(PreviewImage {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    })
}

pub async fn load_preview(path: &Path, max_dimension: u32) -> Result<PreviewImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    decode_preview(&bytes, max_dimension)
}

/// Scales `size` down to fit inside `bounds`, never up.
pub fn fit_within(size: egui::Vec2, bounds: egui::Vec2) -> egui::Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return size;
    }
    let scale = (bounds.x / size.x).min(bounds.y / size.y).min(1.0);
    size * scale
}
