use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::config::load_settings;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

mod backend_bridge;
mod controller;
mod media;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::DetectorApp;

#[derive(Parser, Debug)]
#[command(name = "detector-gui", about = "Desktop client for the safety equipment detection API")]
struct Args {
    /// Backend base URL; overrides the config file and environment.
    #[arg(long)]
    api_url: Option<String>,
    /// Settings file; defaults to ./detector.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings =
        load_settings(args.config.as_deref()).context("failed to load detector settings")?;
    if let Some(api_url) = args.api_url {
        settings = settings.with_api_base_url(api_url);
        settings.validate().context("invalid --api-url")?;
    }
    tracing::info!(api = %settings.api_base_url, "starting desktop client");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Safety Equipment Detection")
            .with_inner_size([1180.0, 820.0])
            .with_min_inner_size([820.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Safety Equipment Detection",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DetectorApp::new(
                &settings,
                cmd_tx,
                ui_rx,
                &cc.egui_ctx,
            )))
        }),
    )
    .map_err(|err| anyhow!("desktop window failed: {err}"))
}
