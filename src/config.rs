//! Static network configuration and viewer settings.
//!
//! Both are plain JSON documents supplied by the embedding application at
//! construction time; nothing here is fetched at runtime.

use std::collections::BTreeSet;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::camera::{ZoomLimits, validate_pan_bounds};
use crate::color::{Rgb, parse_color};
use crate::error::{MapError, Result};
use crate::geometry::Rect;
use crate::model::Line;

/// Stroke width used for lines that do not configure one.
pub const DEFAULT_LINE_WIDTH: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub lines: Vec<Line>,
    /// Station names excluded from rendering and interaction.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Stations whose name contains any of these substrings get no label.
    /// Their markers are still drawn and still hit-testable.
    #[serde(default)]
    pub label_filters: Vec<String>,
}

impl NetworkConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: NetworkConfig = serde_json::from_str(text)
            .map_err(|e| MapError::config(format!("network configuration: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MapError::config(format!("cannot read {path}: {e}")))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for line in &self.lines {
            if line.id.trim().is_empty() {
                return Err(MapError::config(format!("line '{}' has an empty id", line.name)));
            }
            if !seen.insert(line.id.as_str()) {
                return Err(MapError::config(format!("duplicate line id '{}'", line.id)));
            }
            if parse_color(&line.color).is_none() {
                return Err(MapError::config(format!(
                    "line '{}' has unparsable color '{}'",
                    line.id, line.color
                )));
            }
            if let Some(w) = line.width {
                if !w.is_finite() || w <= 0.0 {
                    return Err(MapError::config(format!(
                        "line '{}' has invalid width {w}",
                        line.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_blacklisted(&self, station: &str) -> bool {
        self.blacklist.iter().any(|b| b == station)
    }

    /// Whether `station` matches a label filter. Only the label is dropped.
    pub fn label_suppressed(&self, station: &str) -> bool {
        self.label_filters
            .iter()
            .any(|f| !f.is_empty() && station.contains(f.as_str()))
    }

    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// First configured line serving both stations.
    pub fn line_for_pair(&self, a: &str, b: &str) -> Option<&Line> {
        self.lines.iter().find(|l| l.serves(a) && l.serves(b))
    }

    pub fn line_color(line: &Line) -> Rgb {
        parse_color(&line.color).unwrap_or(Rgb::NEUTRAL)
    }
}

/// Endpoint paths of the live transit data service, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEndpoints {
    pub base_url: String,
    pub network: String,
    pub trains: String,
    pub signals: String,
    /// Optional block/track state endpoint.
    pub blocks: Option<String>,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            network: "/api/network".to_string(),
            trains: "/api/trains".to_string(),
            signals: "/api/signals".to_string(),
            blocks: None,
        }
    }
}

impl FeedEndpoints {
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Viewer settings. Every field has a default so partial files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub feed: FeedEndpoints,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub zoom: ZoomLimits,
    /// World rectangle the canvas centre is kept inside. `None` = unclamped.
    pub pan_bounds: Option<Rect>,
    /// Hit radius in screen pixels.
    pub hit_radius_px: f64,
    /// Zoom used when double-click focusing a station.
    pub focus_zoom: f64,
    pub style_url: Option<String>,
    pub style_cache: Option<Utf8PathBuf>,
    pub show_labels: bool,
    pub interpolate_trains: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            feed: FeedEndpoints::default(),
            poll_interval_ms: 5_000,
            request_timeout_ms: 4_000,
            zoom: ZoomLimits::default(),
            pan_bounds: None,
            hit_radius_px: 10.0,
            focus_zoom: 2.0,
            style_url: None,
            style_cache: None,
            show_labels: true,
            interpolate_trains: false,
        }
    }
}

impl MapConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: MapConfig = serde_json::from_str(text)
            .map_err(|e| MapError::config(format!("map configuration: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MapError::config(format!("cannot read {path}: {e}")))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.zoom.validate()?;
        if self.poll_interval_ms == 0 {
            return Err(MapError::config("poll interval must be positive"));
        }
        if !self.hit_radius_px.is_finite() || self.hit_radius_px <= 0.0 {
            return Err(MapError::config(format!(
                "hit radius must be positive, got {}",
                self.hit_radius_px
            )));
        }
        validate_pan_bounds(self.pan_bounds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
