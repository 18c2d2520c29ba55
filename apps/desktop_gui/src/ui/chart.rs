//! Class distribution bar chart.

use egui_plot::{Bar, BarChart, Legend, Plot};

use client_core::report::ClassDistribution;

use crate::{controller::reducer::ChartInstance, ui::theme};

pub fn bars(distribution: &ClassDistribution) -> Vec<Bar> {
    distribution
        .entries()
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let (stroke_rgb, stroke_alpha) = entry.stroke;
            Bar::new(idx as f64, entry.count as f64)
                .width(0.6)
                .name(&entry.label)
                .fill(theme::color32(entry.fill))
                .stroke(egui::Stroke::new(
                    2.0,
                    theme::color32_alpha(stroke_rgb, stroke_alpha),
                ))
        })
        .collect()
}

/// Draws `chart`. The plot id includes the generation, so a recreated chart
/// shares no bounds or interaction memory with the one it replaced.
pub fn show(ui: &mut egui::Ui, chart: &ChartInstance) {
    let labels: Vec<String> = chart
        .distribution
        .entries()
        .iter()
        .map(|entry| entry.label.clone())
        .collect();

    Plot::new(("class_distribution", chart.generation))
        .legend(Legend::default())
        .height(280.0)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .include_y(0.0)
        .y_axis_label(ClassDistribution::SERIES_LABEL)
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(
                ClassDistribution::SERIES_LABEL,
                bars(&chart.distribution),
            ));
        });
}
