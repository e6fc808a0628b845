use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use serde::Serialize;

use transitmap::camera::ViewportController;
use transitmap::color::Rgb;
use transitmap::config::{MapConfig, NetworkConfig};
use transitmap::feed::UreqTransport;
use transitmap::model::{Signal, Train};
use transitmap::poller::LivePoller;
use transitmap::projection::CanvasSize;
use transitmap::render::{RenderOptions, render_scene};
use transitmap::scene::{DerivedSegment, DerivedStation, SceneModel};
use transitmap::style::StyleStore;
use transitmap::svg::SvgCanvas;

#[derive(Parser, Debug)]
#[command(author, version, about = "Poll a live transit feed once and print the derived map scene as JSON", long_about = None)]
struct Cli {
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

    /// Also render the scene into this SVG file
    #[arg(long, value_name = "SVG_FILE")]
    svg: Option<Utf8PathBuf>,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 800.0)]
    height: f64,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    stations: Vec<&'a DerivedStation>,
    segments: Vec<&'a DerivedSegment>,
    trains: &'a [Train],
    signals: &'a [Signal],
    errors: BTreeMap<&'static str, &'a String>,
    style_version: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => MapConfig::load(path).with_context(|| format!("Failed to load {}", path))?,
        None => MapConfig::default(),
    };
    if let Some(feed) = cli.feed {
        cfg.feed.base_url = feed;
    }
    if cli.style_url.is_some() {
        cfg.style_url = cli.style_url;
    }
    if cli.cache.is_some() {
        cfg.style_cache = cli.cache;
    }
    cfg.validate()?;
    let network = NetworkConfig::load(&cli.network)
        .with_context(|| format!("Failed to load network {}", cli.network))?;

    let mut scene = SceneModel::new(network)?;
    let mut styles = StyleStore::from_config(&cfg, false);
    if let Err(e) = styles.load_all_blocking() {
        log::warn!("using cached styles: {e}");
    }
    scene.apply_styles(styles.document().styles.clone());

    let transport = Arc::new(UreqTransport::new(cfg.request_timeout()));
    let mut poller = LivePoller::spawn(transport, cfg.feed.clone(), cfg.poll_interval());
    poller.poll_now(&mut scene);
    poller.dispose();

    if let Some(svg_path) = &cli.svg {
        let mut viewport =
            ViewportController::new(CanvasSize::new(cli.width, cli.height), cfg.zoom, cfg.pan_bounds)?;
        if let Some(bounds) = scene.bounds() {
            viewport.fit_to(bounds);
        }
        let mut canvas = SvgCanvas::new(cli.width, cli.height, Rgb(245, 245, 240));
        let opts = RenderOptions {
            show_labels: cfg.show_labels,
            ..Default::default()
        };
        let stats = render_scene(&mut canvas, &scene, scene.trains(), viewport.camera(), None, None, &opts)?;
        std::fs::write(svg_path, canvas.finish()).with_context(|| format!("Write {}", svg_path))?;
        log::info!("wrote {} ({:?})", svg_path, stats);
    }

    let snapshot = Snapshot {
        stations: scene.derived_stations().collect(),
        segments: scene.visible_segments().collect(),
        trains: scene.trains(),
        signals: scene.signals(),
        errors: poller
            .status()
            .errors
            .iter()
            .map(|(k, e)| (k.label(), e))
            .collect(),
        style_version: styles.document().version,
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
