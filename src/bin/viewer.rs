//! Interactive live map window (requires `--features egui`).
//!
//! Usage:
//!   cargo run --features egui --bin transitmap-viewer -- -n network.json [-c viewer.json] [--admin]

use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use eframe::egui;

use transitmap::config::{MapConfig, NetworkConfig};
use transitmap::egui_app::TransitMapApp;
use transitmap::feed::UreqTransport;
use transitmap::style::StyleStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live transit network map", long_about = None)]
struct Args {
    /// Static network configuration (lines, blacklist, label filters)
    #[arg(short, long, value_name = "NETWORK_JSON")]
    network: Utf8PathBuf,

    /// Viewer settings (feed endpoints, zoom limits, style service)
    #[arg(short, long, value_name = "CONFIG_JSON")]
    config: Option<Utf8PathBuf>,

    /// Override the live feed base URL
    #[arg(long)]
    feed: Option<String>,

    /// Override the style service URL
    #[arg(long)]
    style_url: Option<String>,

    /// Override the local style cache file
    #[arg(long)]
    cache: Option<Utf8PathBuf>,

    /// Enable the track style editor
    #[arg(long)]
    admin: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => MapConfig::load(path).with_context(|| format!("Failed to load {}", path))?,
        None => MapConfig::default(),
    };
    if let Some(feed) = args.feed {
        cfg.feed.base_url = feed;
    }
    if args.style_url.is_some() {
        cfg.style_url = args.style_url;
    }
    if args.cache.is_some() {
        cfg.style_cache = args.cache;
    }
    let network = NetworkConfig::load(&args.network)
        .with_context(|| format!("Failed to load network {}", args.network))?;

    // Configuration problems surface here, before a window exists.
    let transport = Arc::new(UreqTransport::new(cfg.request_timeout()));
    let styles = StyleStore::from_config(&cfg, args.admin);
    let app = TransitMapApp::new(network, &cfg, transport, styles)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "transitmap",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}
