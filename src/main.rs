//! E-Paper Image Bridge
//!
//! A Rust-based server that:
//! - Accepts images by upload or URL
//! - Converts them to 200x200 1-bit frames for a monochrome e-paper panel
//! - Uploads the packed frame to the panel's network controller
//! - Proxies clear, cross and text commands to the controller

mod config;
mod device;
mod image_proc;
mod web;

#[cfg(test)]
mod test_util;

use anyhow::Context;
use clap::Parser;
use config::Config;
use device::{DeviceClient, DeviceController};
use image_proc::{ArtifactStore, Downloader, ImageProcessor};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "epaper-bridge")]
#[command(about = "Image bridge for networked monochrome e-paper displays")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Web server port (overrides config, default: 5000)
    #[arg(long = "http-port")]
    http_port: Option<u16>,

    /// Display controller base URL (overrides config)
    #[arg(long = "device-url")]
    device_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Clear display and exit
    #[arg(long)]
    clear: bool,

    /// Transcode a local image, upload it and exit
    #[arg(long, value_name = "IMAGE")]
    push: Option<PathBuf>,

    /// Convert a saved hex array (.h) back into a .bin payload and exit
    #[arg(long = "hex-to-bin", value_name = "H_FILE")]
    hex_to_bin: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration; only a missing file falls back to defaults
    let loaded = Config::load_optional(&args.config);
    let verbose = args.verbose || matches!(&loaded, Ok(Some(c)) if c.verbose);

    init_logging(verbose);

    tracing::info!("Starting E-Paper Image Bridge");

    let mut config = match loaded
        .with_context(|| format!("failed to load config from {}", args.config))?
    {
        Some(config) => config,
        None => {
            tracing::info!("No config at {}, using defaults", args.config);
            Config::default()
        }
    };
    if let Some(url) = &args.device_url {
        config.device_url = url.clone();
    }

    config.validate().context("invalid configuration")?;

    if args.write_config {
        config
            .save(&args.config)
            .with_context(|| format!("failed to write {}", args.config))?;
        tracing::info!("Configuration written to {}", args.config);
        return Ok(());
    }

    if let Some(path) = &args.hex_to_bin {
        let bin_path = convert_hex_array(path)?;
        tracing::info!("Wrote {}", bin_path.display());
        return Ok(());
    }

    let processor = build_processor(&config)?;
    tracing::info!("Display controller at {}", processor.device().base_url());

    // Handle one-shot commands
    if args.clear {
        tracing::info!("Clearing display...");
        processor.device().clear().await?;
        tracing::info!("Display cleared");
        return Ok(());
    }

    if let Some(path) = &args.push {
        tracing::info!("Pushing {} to display...", path.display());
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let report = processor.process_and_display(data.into()).await?;
        tracing::info!(
            "Uploaded {} bytes, display answered {}",
            report.frame.payload.len(),
            report.upload.status_code
        );
        return Ok(());
    }

    // Setup shutdown signal handling
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Create web server
    let port = args.http_port.unwrap_or(config.web_port);
    let web_server = web::WebServer::new(processor, config.max_image_bytes);

    // Spawn web server task
    let web_shutdown = shutdown_tx.subscribe();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.run_with_shutdown(port, web_shutdown).await {
            tracing::error!("Web server error: {}", e);
        }
    });

    // Wait for shutdown signal
    wait_for_shutdown().await?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(());

    tokio::select! {
        _ = web_handle => {},
        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
            tracing::warn!("Web server shutdown timeout");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wire the device client, downloader and artifact store together
fn build_processor(config: &Config) -> anyhow::Result<ImageProcessor> {
    let client = DeviceClient::new(&config.device_url, config.device_timeout())?;
    let device = DeviceController::new(client, config.serialize_uploads);
    let downloader = Downloader::new(config.fetch_timeout())?;
    let artifacts = config
        .save_artifacts
        .then(|| ArtifactStore::new(&config.output_dir));

    Ok(ImageProcessor::new(device, downloader, artifacts))
}

/// Parse a hex array file and write its bytes next to it as `.bin`
fn convert_hex_array(path: &Path) -> anyhow::Result<PathBuf> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let bytes = image_proc::encode::parse_hex_array(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if bytes.len() != device::BUFFER_SIZE {
        tracing::warn!(
            "{} holds {} bytes, a full frame is {}",
            path.display(),
            bytes.len(),
            device::BUFFER_SIZE
        );
    }

    let bin_path = path.with_extension("bin");
    std::fs::write(&bin_path, &bytes)
        .with_context(|| format!("failed to write {}", bin_path.display()))?;
    Ok(bin_path)
}

/// Initialize tracing/logging
///
/// Default level is "info"; `--verbose` switches to "debug".
/// `RUST_LOG` takes precedence when set.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("epaper_bridge={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }

    Ok(())
}
