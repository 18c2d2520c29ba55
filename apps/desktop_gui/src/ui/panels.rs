//! Panels drawn each frame from `AppState`.

use client_core::{report::ClassDistribution, SubmissionKind};
use eframe::egui::{self, RichText};

use crate::{
    controller::reducer::{BatchView, SingleView, Tab},
    media::fit_within,
    ui::{
        app::{DetectorApp, TextureSlot},
        chart, theme, widgets,
    },
};

const RESULT_IMAGE_BOUNDS: egui::Vec2 = egui::vec2(480.0, 360.0);
const THUMBNAIL_BOUNDS: egui::Vec2 = egui::vec2(200.0, 150.0);
const CARD_WIDTH: f32 = 220.0;

impl DetectorApp {
    pub(super) fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Safety Equipment Detection");
                ui.add_space(12.0);
                widgets::map_badge(ui, self.state.map_badge);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⟳").on_hover_text("Check connection now").clicked() {
                        self.check_health_now();
                    }
                    let response = widgets::connection_indicator(ui, self.state.connection);
                    if let Some(checked) = self.last_health_check {
                        response.on_hover_text(format!(
                            "Last checked {}",
                            checked.format("%H:%M:%S")
                        ));
                    }
                });
            });
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                for tab in [Tab::Single, Tab::Batch] {
                    ui.selectable_value(&mut self.state.tab, tab, tab.label());
                }
            });
            ui.add_space(4.0);
        });
    }

    pub(super) fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(&self.state.status).weak());
            });
        });
    }

    pub(super) fn show_workspace(&mut self, ctx: &egui::Context) {
        let hovering = Self::hovering_files(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    self.show_controls(ui);
                    ui.separator();
                    match self.state.tab {
                        Tab::Single => {
                            self.show_single_upload(ui, hovering);
                            ui.separator();
                            self.show_single_results(ui);
                        }
                        Tab::Batch => {
                            self.show_batch_upload(ui, hovering);
                            ui.separator();
                            self.show_batch_results(ui);
                        }
                    }
                });
        });
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Confidence threshold");
            ui.add(
                egui::Slider::new(&mut self.state.confidence, 0.0..=1.0)
                    .step_by(0.05)
                    .show_value(false),
            );
            ui.label(RichText::new(format!("{:.2}", self.state.confidence)).monospace());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Clear Results").clicked() {
                    self.clear_results();
                }
            });
        });
    }

    fn show_single_upload(&mut self, ui: &mut egui::Ui, hovering: bool) {
        if widgets::dropzone(ui, hovering, "Drop an image here or browse") {
            self.browse_single();
        }
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            match &self.state.single_selection {
                Some(file) => ui.label(format!("Selected: {} ({})", file.name, file.size_text())),
                None => ui.label(RichText::new("No image selected").weak()),
            };
            let loading = self.state.is_loading(SubmissionKind::Single);
            if ui
                .add_enabled(!loading, egui::Button::new("Detect Objects"))
                .clicked()
            {
                self.submit(SubmissionKind::Single);
            }
            if loading {
                ui.spinner();
                ui.label("Processing...");
            }
        });
    }

    fn show_batch_upload(&mut self, ui: &mut egui::Ui, hovering: bool) {
        if widgets::dropzone(ui, hovering, "Drop images here or browse") {
            self.browse_batch();
        }
        ui.add_space(6.0);
        if !self.state.batch_selection.is_empty() {
            egui::CollapsingHeader::new(format!(
                "{} files selected",
                self.state.batch_selection.len()
            ))
            .default_open(true)
            .show(ui, |ui| {
                for file in &self.state.batch_selection {
                    ui.horizontal(|ui| {
                        ui.label(&file.name);
                        ui.label(RichText::new(file.size_text()).weak());
                    });
                }
            });
        }
        ui.horizontal(|ui| {
            let loading = self.state.is_loading(SubmissionKind::Batch);
            if ui
                .add_enabled(!loading, egui::Button::new("Process Batch"))
                .clicked()
            {
                self.submit(SubmissionKind::Batch);
            }
            if loading {
                ui.spinner();
                ui.label("Processing batch...");
            }
        });
    }

    fn show_single_results(&mut self, ui: &mut egui::Ui) {
        let Some(view) = self.state.single_result() else {
            return;
        };
        let ctx = ui.ctx().clone();
        let original = image_texture(&mut self.textures, &ctx, view, TextureSlot::Original);
        let annotated = image_texture(&mut self.textures, &ctx, view, TextureSlot::Annotated);
        let report = &view.report;

        ui.heading("Detection Results");
        ui.horizontal(|ui| {
            widgets::stat(ui, "Detections", &report.detections_count.to_string());
            ui.add_space(24.0);
            widgets::stat(ui, "Processing Time", &report.processing_time_text());
            ui.add_space(24.0);
            widgets::stat(ui, "Avg Confidence", &report.average_confidence.display());
        });
        ui.add_space(8.0);

        ui.horizontal_top(|ui| {
            for (title, texture) in [("Original", original), ("Detected", annotated)] {
                ui.vertical(|ui| {
                    ui.label(RichText::new(title).strong());
                    match texture {
                        Some(texture) => {
                            let size = fit_within(texture.size_vec2(), RESULT_IMAGE_BOUNDS);
                            ui.add(egui::Image::new(&texture).fit_to_exact_size(size));
                        }
                        None => {
                            ui.label(RichText::new("Image unavailable").weak());
                        }
                    }
                });
            }
        });
        ui.add_space(8.0);

        if report.rows.is_empty() {
            ui.label("No objects detected above the confidence threshold.");
            return;
        }
        egui::Grid::new(("detections", view.view_id))
            .striped(true)
            .num_columns(3)
            .spacing([16.0, 6.0])
            .show(ui, |ui| {
                ui.label(RichText::new("Class").strong());
                ui.label(RichText::new("Confidence").strong());
                ui.label(RichText::new("Bounding Box").strong());
                ui.end_row();
                for row in &report.rows {
                    ui.horizontal(|ui| {
                        widgets::swatch(ui, theme::color32(row.swatch));
                        ui.label(&row.label);
                    });
                    widgets::confidence_bar(ui, row.confidence_fraction, &row.confidence_text);
                    ui.label(RichText::new(&row.bbox_text).monospace());
                    ui.end_row();
                }
            });
    }

    fn show_batch_results(&mut self, ui: &mut egui::Ui) {
        let Some(view) = self.state.batch_result() else {
            return;
        };
        let ctx = ui.ctx().clone();
        let report = &view.report;

        ui.heading("Batch Results");
        ui.horizontal(|ui| {
            widgets::stat(ui, "Total Images", &report.total_images.to_string());
            ui.add_space(24.0);
            widgets::stat(ui, "Total Detections", &report.total_detections.to_string());
            ui.add_space(24.0);
            widgets::stat(ui, "Avg per Image", &report.avg_detections_text());
            ui.add_space(24.0);
            widgets::stat(ui, "Processing Time", &report.processing_time_text());
        });
        ui.add_space(8.0);

        ui.horizontal_wrapped(|ui| {
            for card in &report.cards {
                let texture = thumbnail_texture(&mut self.textures, &ctx, view, card.index);
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_width(CARD_WIDTH);
                    ui.vertical(|ui| {
                        if let Some(texture) = texture {
                            let size = fit_within(texture.size_vec2(), THUMBNAIL_BOUNDS);
                            ui.add(egui::Image::new(&texture).fit_to_exact_size(size));
                        }
                        ui.label(RichText::new(&card.filename).strong());
                        ui.label(format!("{} detections", card.detections_count));
                        if !card.breakdown.is_empty() {
                            ui.label(RichText::new(&card.breakdown).small());
                        }
                    });
                });
            }
        });
        ui.add_space(8.0);

        if let Some(instance) = self.state.chart() {
            ui.heading("Class Distribution");
            if instance.distribution.is_empty() {
                ui.label(format!("{}: none", ClassDistribution::SERIES_LABEL));
            } else {
                chart::show(ui, instance);
            }
        }
    }

    pub(super) fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(alert) = &self.state.alert else {
            return;
        };
        let mut dismissed = false;
        let modal = egui::Modal::new(egui::Id::new("alert_modal")).show(ctx, |ui| {
            ui.set_max_width(420.0);
            ui.heading(alert.category().title());
            ui.add_space(6.0);
            ui.label(alert.message());
            if let Some(detail) = alert.detail() {
                ui.add_space(4.0);
                ui.label(RichText::new(detail).weak());
            }
            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
        if dismissed || modal.should_close() {
            self.state.dismiss_alert();
        }
    }
}

fn image_texture(
    textures: &mut super::app::TextureCache,
    ctx: &egui::Context,
    view: &SingleView,
    slot: TextureSlot,
) -> Option<egui::TextureHandle> {
    let image = match slot {
        TextureSlot::Original => view.original.as_ref(),
        TextureSlot::Annotated => view.annotated.as_ref(),
        TextureSlot::Thumbnail(_) => None,
    }?;
    Some(textures.get_or_load(ctx, view.view_id, slot, image))
}

fn thumbnail_texture(
    textures: &mut super::app::TextureCache,
    ctx: &egui::Context,
    view: &BatchView,
    index: usize,
) -> Option<egui::TextureHandle> {
    let image = view.thumbnails.get(index)?.as_ref()?;
    Some(textures.get_or_load(ctx, view.view_id, TextureSlot::Thumbnail(index), image))
}
