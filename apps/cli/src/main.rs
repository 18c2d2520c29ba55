use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    batch::{collect_image_files, upload_in_chunks, ChunkOptions, ChunkReport, ChunkedUploadSummary},
    config::load_settings,
    metrics::map_badge_value,
    monitor::probe,
    report::{format_seconds, BatchReport, ClassDistribution, SingleReport},
    submission::{submit_batch, submit_single},
    ClientHandle, DetectionClient, Settings,
};
use serde::Serialize;
use shared::error::detail_message;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "detector", about = "Command-line client for the safety equipment detection API")]
struct Cli {
    /// Backend base URL; overrides the config file and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file; defaults to ./detector.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend answers on /health.
    Health,
    /// Print the model metadata and the badge value shown by the desktop app.
    ModelInfo,
    /// Run detection on one image.
    Single {
        image: PathBuf,
        #[arg(long, value_parser = parse_confidence)]
        confidence: Option<f32>,
    },
    /// Run detection on several images in one request.
    Batch {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long, value_parser = parse_confidence)]
        confidence: Option<f32>,
    },
    /// Upload every image under a directory in chunks.
    UploadDir {
        dir: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long, value_parser = parse_confidence)]
        confidence: Option<f32>,
        #[arg(long, default_value = "batch_results.json")]
        output: PathBuf,
    },
}

fn parse_confidence(raw: &str) -> Result<f32, String> {
    let value: f32 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("confidence must be within 0..=1, got {value}"))
    }
}

#[derive(Debug, Serialize)]
struct SavedResults<'a> {
    api_base_url: &'a str,
    completed_at: DateTime<Utc>,
    #[serde(flatten)]
    summary: &'a ChunkedUploadSummary,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings =
        load_settings(cli.config.as_deref()).context("failed to load detector settings")?;
    if let Some(api_url) = cli.api_url {
        settings = settings.with_api_base_url(api_url);
        settings.validate().context("invalid --api-url")?;
    }
    let client = DetectionClient::from_settings(&settings)
        .context("failed to construct detection client")?;
    info!(api = %client.base_url(), "using detection backend");

    match cli.command {
        Command::Health => return health(&client).await,
        Command::ModelInfo => model_info(&client).await?,
        Command::Single { image, confidence } => {
            let confidence = confidence.unwrap_or(settings.default_confidence);
            single(&client, &settings, &image, confidence).await?;
        }
        Command::Batch { images, confidence } => {
            let confidence = confidence.unwrap_or(settings.default_confidence);
            batch(&client, &settings, &images, confidence).await?;
        }
        Command::UploadDir {
            dir,
            chunk_size,
            confidence,
            output,
        } => {
            let options = ChunkOptions {
                confidence: confidence.unwrap_or(settings.default_confidence),
                chunk_size: chunk_size.unwrap_or(settings.batch_chunk_size),
                max_file_bytes: settings.max_file_bytes(),
                ..ChunkOptions::default()
            };
            upload_dir(&client, &settings, &dir, &options, &output).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn health(client: &DetectionClient) -> Result<ExitCode> {
    match client.health().await {
        Ok(health) => {
            println!("Backend is running and healthy");
            if let Some(status) = health.status {
                println!("  status: {status}");
            }
            if let Some(loaded) = health.model_loaded {
                println!("  model loaded: {loaded}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Cannot reach backend at {}: {err}", client.base_url());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn model_info(client: &DetectionClient) -> Result<()> {
    let outcome = client.model_info().await;
    if let Ok(info) = &outcome {
        println!("Model: {}", info.model.as_deref().unwrap_or("-"));
        if let Some(classes) = info.classes {
            println!("Classes: {classes}");
        }
        match info.map_percent() {
            Some(raw) => println!("Reported mAP: {raw}"),
            None => println!("Reported mAP: unavailable"),
        }
        if let Some(list) = &info.classes_list {
            let names: Vec<&str> = list.values().map(String::as_str).collect();
            println!("Class list: {}", names.join(", "));
        }
    }
    println!("Badge: mAP {}%", map_badge_value(outcome));
    Ok(())
}

async fn single(
    client: &DetectionClient,
    settings: &Settings,
    image: &Path,
    confidence: f32,
) -> Result<()> {
    let outcome = submit_single(client, Some(image), confidence, settings.max_file_bytes())
        .await
        .with_context(|| format!("single detection failed for {}", image.display()))?;
    let report = SingleReport::from_response(&outcome.response, outcome.elapsed);

    println!("Detections: {}", report.detections_count);
    println!("Processing time: {}", report.processing_time_text());
    println!("Avg confidence: {}", report.average_confidence.display());
    for row in &report.rows {
        println!(
            "  {:<20} {:>7}  [{}]",
            row.label, row.confidence_text, row.bbox_text
        );
    }
    match client.annotated_image_url(&report.annotated_image, Utc::now().timestamp_millis()) {
        Ok(url) => println!("Annotated image: {url}"),
        Err(err) => warn!("cannot build annotated image URL: {err}"),
    }
    Ok(())
}

async fn batch(
    client: &DetectionClient,
    settings: &Settings,
    images: &[PathBuf],
    confidence: f32,
) -> Result<()> {
    let outcome = submit_batch(client, images, confidence, settings.max_file_bytes())
        .await
        .context("batch detection failed")?;
    let report = BatchReport::from_response(&outcome.response, outcome.elapsed);

    println!("Total images: {}", report.total_images);
    println!("Total detections: {}", report.total_detections);
    println!("Avg per image: {}", report.avg_detections_text());
    println!("Processing time: {}", report.processing_time_text());
    for card in &report.cards {
        println!(
            "  {} - {} detections{}",
            card.filename,
            card.detections_count,
            if card.breakdown.is_empty() {
                String::new()
            } else {
                format!(" ({})", card.breakdown)
            }
        );
    }
    print_distribution(&report.distribution);
    Ok(())
}

fn print_distribution(distribution: &ClassDistribution) {
    if distribution.is_empty() {
        return;
    }
    println!("{}:", ClassDistribution::SERIES_LABEL);
    let width = distribution
        .entries()
        .iter()
        .map(|entry| entry.label.len())
        .max()
        .unwrap_or(0);
    let scale = distribution.max_count().max(1) as f64;
    for entry in distribution.entries() {
        let bar = "#".repeat(((entry.count as f64 / scale) * 40.0).round() as usize);
        println!("  {:<width$} {:>5} {bar}", entry.label, entry.count);
    }
}

async fn upload_dir(
    client: &DetectionClient,
    settings: &Settings,
    dir: &Path,
    options: &ChunkOptions,
    output: &Path,
) -> Result<()> {
    if !probe(client).await.is_connected() {
        bail!("backend at {} is not responding", settings.api_base_url);
    }

    let files = collect_image_files(dir)
        .with_context(|| format!("failed to scan {}", dir.display()))?;
    if files.is_empty() {
        bail!("no image files found under {}", dir.display());
    }
    println!("Found {} images", files.len());

    let result = upload_in_chunks(client, &files, options, print_chunk).await;
    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            let body = match &err.source {
                client_core::ClientError::Status { body, .. } => {
                    detail_message(body).unwrap_or_else(|| body.chars().take(500).collect())
                }
                other => other.to_string(),
            };
            eprintln!("Chunk {}/{} failed: {body}", err.chunk_number, err.chunk_count);
            if body.contains("Too many files") || body.contains("1000") {
                eprintln!("Reduce --chunk-size and try again.");
            }
            return Err(err.into());
        }
    };

    println!("All chunks processed");
    println!("Total images processed: {}", summary.total_images_processed);
    println!("Total detections found: {}", summary.total_detections);
    println!(
        "Avg detections per image: {:.2}",
        summary.avg_detections_per_image()
    );

    let saved = SavedResults {
        api_base_url: &settings.api_base_url,
        completed_at: Utc::now(),
        summary: &summary,
    };
    let json = serde_json::to_string_pretty(&saved)?;
    fs::write(output, json).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Results saved to {}", output.display());
    Ok(())
}

fn print_chunk(report: ChunkReport<'_>) {
    println!(
        "Chunk {}/{} processed in {}: {} images, {} detections, avg {}",
        report.chunk_number,
        report.chunk_count,
        format_seconds(report.elapsed),
        report.response.total_images,
        report.response.total_detections,
        report.response.avg_detections_per_image,
    );
    for path in report.skipped_files {
        println!("  skipped {}", path.display());
    }
    if let Some(first) = report.response.images.first() {
        for det in first.detections.iter().take(3) {
            println!(
                "  sample from {}: {} {:.1}%",
                first.filename,
                det.label,
                det.confidence * 100.0
            );
        }
    }
}
