use std::{collections::HashMap, path::PathBuf, time::Duration};

use chrono::{DateTime, Local};
use client_core::{upload::SUPPORTED_IMAGE_EXTENSIONS, Settings, SubmissionKind};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui::{self, TextureHandle};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{
        events::UiEvent,
        orchestration::dispatch_backend_command,
        reducer::{AppState, Tab},
    },
    media::PreviewImage,
    ui::theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Original,
    Annotated,
    Thumbnail(usize),
}

/// Textures uploaded for the currently rendered views, keyed by view id.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<(u64, TextureSlot), TextureHandle>,
}

impl TextureCache {
    pub fn get_or_load(
        &mut self,
        ctx: &egui::Context,
        view_id: u64,
        slot: TextureSlot,
        image: &PreviewImage,
    ) -> TextureHandle {
        self.textures
            .entry((view_id, slot))
            .or_insert_with(|| {
                ctx.load_texture(
                    format!("detection-view:{view_id}:{slot:?}"),
                    image.to_color_image(),
                    egui::TextureOptions::LINEAR,
                )
            })
            .clone()
    }

    /// Frees textures of views that are no longer displayed.
    pub fn retain_views(&mut self, live: &[u64]) {
        self.textures.retain(|(view_id, _), _| live.contains(view_id));
    }
}

pub struct DetectorApp {
    pub(super) state: AppState,
    pub(super) cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    pub(super) textures: TextureCache,
    pub(super) last_health_check: Option<DateTime<Local>>,
}

impl DetectorApp {
    pub fn new(
        settings: &Settings,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        ctx: &egui::Context,
    ) -> Self {
        theme::apply_visuals(ctx);
        Self {
            state: AppState::new(settings),
            cmd_tx,
            ui_rx,
            textures: TextureCache::default(),
            last_health_check: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            if matches!(event, UiEvent::Connectivity(_)) {
                self.last_health_check = Some(Local::now());
            }
            self.state.apply(event);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|input| {
            input
                .raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if dropped.is_empty() {
            return;
        }
        match self.state.tab {
            Tab::Single => self.state.select_single(dropped),
            Tab::Batch => self.state.select_batch(dropped),
        }
    }

    pub(super) fn hovering_files(ctx: &egui::Context) -> bool {
        ctx.input(|input| !input.raw.hovered_files.is_empty())
    }

    pub(super) fn browse_single(&mut self) {
        if let Some(path) = image_dialog().pick_file() {
            self.state.select_single(vec![path]);
        }
    }

    pub(super) fn browse_batch(&mut self) {
        if let Some(paths) = image_dialog().pick_files() {
            self.state.select_batch(paths);
        }
    }

    pub(super) fn submit(&mut self, kind: SubmissionKind) {
        let command = match kind {
            SubmissionKind::Single => self.state.begin_single(),
            SubmissionKind::Batch => self.state.begin_batch(),
        };
        if let Some(command) = command {
            if !dispatch_backend_command(&self.cmd_tx, command, &mut self.state.status) {
                self.state.abandon(kind);
            }
        }
    }

    pub(super) fn clear_results(&mut self) {
        let command = self.state.clear_results();
        dispatch_backend_command(&self.cmd_tx, command, &mut self.state.status);
    }

    pub(super) fn check_health_now(&mut self) {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::CheckHealth,
            &mut self.state.status,
        );
    }

    fn live_view_ids(&self) -> Vec<u64> {
        self.state
            .single_result()
            .map(|view| view.view_id)
            .into_iter()
            .chain(self.state.batch_result().map(|view| view.view_id))
            .collect()
    }
}

fn image_dialog() -> rfd::FileDialog {
    rfd::FileDialog::new().add_filter("Images", SUPPORTED_IMAGE_EXTENSIONS)
}

impl eframe::App for DetectorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.handle_dropped_files(ctx);
        let live = self.live_view_ids();
        self.textures.retain_views(&live);

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        self.show_workspace(ctx);
        self.show_alert(ctx);

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
