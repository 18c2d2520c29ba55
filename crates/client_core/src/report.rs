//! View-models built from backend responses. Front-ends only draw these.

use std::{collections::HashMap, time::Duration};

use shared::{
    domain::{chart_fill, chart_stroke, swatch_color, Rgb},
    protocol::{BatchDetectionResponse, BatchImageResult, Detection, SingleDetectionResponse},
};

use crate::metrics::average_confidence_percent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AverageConfidence {
    /// Value supplied by the backend, shown as given.
    Reported(f64),
    /// Mean of the detection confidences, as a percentage.
    Computed(f64),
    NoDetections,
}

impl AverageConfidence {
    pub fn for_response(response: &SingleDetectionResponse) -> Self {
        match response.avg_confidence {
            Some(value) => AverageConfidence::Reported(value),
            None => average_confidence_percent(&response.detections)
                .map(AverageConfidence::Computed)
                .unwrap_or(AverageConfidence::NoDetections),
        }
    }

    pub fn display(self) -> String {
        match self {
            AverageConfidence::Reported(value) => format!("{}%", format_number(value)),
            AverageConfidence::Computed(value) => format!("{value:.1}%"),
            AverageConfidence::NoDetections => "0%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    pub label: String,
    pub swatch: Rgb,
    pub confidence_text: String,
    /// Width of the confidence bar, clamped to `0..=1`.
    pub confidence_fraction: f32,
    pub bbox_text: String,
}

impl DetectionRow {
    pub fn from_detection(detection: &Detection) -> Self {
        Self {
            label: detection.label.clone(),
            swatch: swatch_color(&detection.label),
            confidence_text: format!("{:.1}%", detection.confidence * 100.0),
            confidence_fraction: detection.confidence.clamp(0.0, 1.0) as f32,
            bbox_text: detection
                .bbox
                .map(|bbox| {
                    bbox.iter()
                        .map(|value| format_number(*value))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleReport {
    pub annotated_image: String,
    pub detections_count: u32,
    pub processing_time: Duration,
    pub average_confidence: AverageConfidence,
    pub rows: Vec<DetectionRow>,
}

impl SingleReport {
    pub fn from_response(response: &SingleDetectionResponse, processing_time: Duration) -> Self {
        Self {
            annotated_image: response.annotated_image.clone(),
            detections_count: response.detections_count,
            processing_time,
            average_confidence: AverageConfidence::for_response(response),
            rows: response
                .detections
                .iter()
                .map(DetectionRow::from_detection)
                .collect(),
        }
    }

    pub fn processing_time_text(&self) -> String {
        format_seconds(self.processing_time)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchCard {
    /// Position in the submitted selection, used to pair the card with its local file.
    pub index: usize,
    pub filename: String,
    pub detections_count: u32,
    pub breakdown: String,
}

impl BatchCard {
    fn from_result(index: usize, result: &BatchImageResult) -> Self {
        Self {
            index,
            filename: result.filename.clone(),
            detections_count: result.detections_count,
            breakdown: result
                .class_counts
                .iter()
                .map(|(label, count)| format!("{label}: {count}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassTotal {
    pub label: String,
    pub count: u64,
    pub fill: Rgb,
    pub stroke: (Rgb, u8),
}

/// Per-class detection totals across a batch, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDistribution {
    entries: Vec<ClassTotal>,
}

impl ClassDistribution {
    pub const SERIES_LABEL: &'static str = "Number of Detections";

    pub fn from_images(images: &[BatchImageResult]) -> Self {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<ClassTotal> = Vec::new();
        for image in images {
            for (label, count) in &image.class_counts {
                let position = *positions.entry(label.as_str()).or_insert_with(|| {
                    entries.push(ClassTotal {
                        label: label.clone(),
                        count: 0,
                        fill: chart_fill(label),
                        stroke: chart_stroke(label),
                    });
                    entries.len() - 1
                });
                entries[position].count += u64::from(*count);
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[ClassTotal] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.count)
    }

    pub fn max_count(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub total_images: u32,
    pub total_detections: u32,
    pub avg_detections_per_image: f64,
    pub processing_time: Duration,
    pub cards: Vec<BatchCard>,
    pub distribution: ClassDistribution,
}

impl BatchReport {
    pub fn from_response(response: &BatchDetectionResponse, processing_time: Duration) -> Self {
        Self {
            total_images: response.total_images,
            total_detections: response.total_detections,
            avg_detections_per_image: response.avg_detections_per_image,
            processing_time,
            cards: response
                .images
                .iter()
                .enumerate()
                .map(|(index, result)| BatchCard::from_result(index, result))
                .collect(),
            distribution: ClassDistribution::from_images(&response.images),
        }
    }

    pub fn avg_detections_text(&self) -> String {
        format_number(self.avg_detections_per_image)
    }

    pub fn processing_time_text(&self) -> String {
        format_seconds(self.processing_time)
    }
}

/// Whole numbers without a fractional part, everything else in shortest form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn format_seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

pub fn format_kib(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn detection(label: &str, confidence: f64, bbox: [f64; 4]) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: Some(bbox),
            class_id: None,
        }
    }

    fn single_response(avg_confidence: Option<f64>) -> SingleDetectionResponse {
        SingleDetectionResponse {
            annotated_image: "/download/uploads/annotated_a.jpg".to_string(),
            detections_count: 2,
            avg_confidence,
            detections: vec![
                detection("FireAlarm", 0.9, [1.0, 2.0, 3.0, 4.0]),
                detection("Unknown", 0.5, [5.0, 6.0, 7.0, 8.0]),
            ],
            filename: None,
            confidence_threshold: None,
            timestamp: None,
        }
    }

    fn image(filename: &str, counts: &[(&str, u32)]) -> BatchImageResult {
        BatchImageResult {
            filename: filename.to_string(),
            detections_count: counts.iter().map(|(_, count)| count).sum(),
            class_counts: counts
                .iter()
                .map(|(label, count)| (label.to_string(), *count))
                .collect::<BTreeMap<_, _>>(),
            detections: Vec::new(),
        }
    }

    #[test]
    fn computes_average_when_backend_omits_it() {
        let report = SingleReport::from_response(&single_response(None), Duration::from_millis(1234));
        assert_eq!(report.average_confidence, AverageConfidence::Computed(70.0));
        assert_eq!(report.average_confidence.display(), "70.0%");
        assert_eq!(report.processing_time_text(), "1.23s");
    }

    #[test]
    fn reported_average_is_shown_as_given() {
        let report = SingleReport::from_response(&single_response(Some(81.25)), Duration::ZERO);
        assert_eq!(report.average_confidence.display(), "81.25%");
    }

    #[test]
    fn empty_detections_show_zero_average() {
        let mut response = single_response(None);
        response.detections.clear();
        response.detections_count = 0;
        let report = SingleReport::from_response(&response, Duration::ZERO);
        assert_eq!(report.average_confidence, AverageConfidence::NoDetections);
        assert_eq!(report.average_confidence.display(), "0%");
        assert!(report.rows.is_empty());
    }

    #[test]
    fn rows_carry_swatch_confidence_and_bbox() {
        let report = SingleReport::from_response(&single_response(None), Duration::ZERO);
        assert_eq!(report.rows[0].swatch, Rgb(0xFF, 0xFF, 0x00));
        assert_eq!(report.rows[0].confidence_text, "90.0%");
        assert_eq!(report.rows[0].bbox_text, "1, 2, 3, 4");
        assert_eq!(report.rows[1].swatch, Rgb::WHITE);
        assert_eq!(report.rows[1].confidence_fraction, 0.5);
    }

    #[test]
    fn missing_bbox_renders_placeholder() {
        let row = DetectionRow::from_detection(&Detection {
            label: "FireAlarm".to_string(),
            confidence: 1.2,
            bbox: None,
            class_id: Some(3),
        });
        assert_eq!(row.bbox_text, "-");
        assert_eq!(row.confidence_fraction, 1.0);
    }

    #[test]
    fn distribution_sums_counts_in_first_seen_order() {
        let images = [
            image("a.jpg", &[("OxygenTank", 2), ("FireAlarm", 1)]),
            image("b.jpg", &[("Mystery", 4), ("FireAlarm", 3)]),
        ];
        let distribution = ClassDistribution::from_images(&images);
        let labels: Vec<&str> = distribution
            .entries()
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(labels, vec!["FireAlarm", "OxygenTank", "Mystery"]);
        assert_eq!(distribution.count_for("FireAlarm"), Some(4));
        assert_eq!(distribution.count_for("Mystery"), Some(4));
        assert_eq!(distribution.max_count(), 4);

        let mystery = &distribution.entries()[2];
        assert_eq!(mystery.fill.hex(), "#CCCCCC");
        assert_eq!(mystery.stroke, (Rgb::WHITE, 0xFF));
    }

    #[test]
    fn batch_report_builds_cards_by_index() {
        let response = BatchDetectionResponse {
            total_images: 2,
            total_detections: 3,
            avg_detections_per_image: 1.5,
            images: vec![image("a.jpg", &[("FireAlarm", 2)]), image("b.jpg", &[])],
            batch_id: None,
            timestamp: None,
        };
        let report = BatchReport::from_response(&response, Duration::from_secs(2));
        assert_eq!(report.cards[1].index, 1);
        assert_eq!(report.cards[0].breakdown, "FireAlarm: 2");
        assert_eq!(report.cards[1].breakdown, "");
        assert_eq!(report.avg_detections_text(), "1.5");
        assert_eq!(report.processing_time_text(), "2.00s");
    }

    #[test]
    fn formats_numbers_and_sizes() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.25), "2.25");
        assert_eq!(format_kib(1536), "1.50 KB");
    }
}
