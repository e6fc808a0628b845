use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::geometry::Point;

// ────────────────────────────────────────────────────────────────────────────
// Static network
// ────────────────────────────────────────────────────────────────────────────

/// A station as reported by the topology feed. Identified by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    /// World position. `None` when the feed only places the station through
    /// segment endpoint coordinates.
    pub pos: Option<Point>,
    /// Excluded from rendering and interaction despite appearing in raw data.
    #[serde(default)]
    pub blacklisted: bool,
}

impl Station {
    pub fn new(name: impl Into<String>, pos: Point) -> Self {
        Self {
            name: name.into(),
            pos: Some(pos),
            blacklisted: false,
        }
    }
}

/// A configured transit line. Lines are loaded once from the static
/// network configuration; the style overlay is the only runtime change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Member stations; a station may belong to several lines.
    #[serde(default)]
    pub stations: Vec<String>,
    /// Default stroke width in pixels.
    #[serde(default)]
    pub width: Option<f64>,
}

impl Line {
    pub fn serves(&self, station: &str) -> bool {
        self.stations.iter().any(|s| s == station)
    }
}

/// A drawable piece of track between two stations, regenerated every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Explicit id from the feed; the style key is always the symmetric
    /// station-pair key regardless.
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    /// Owning line id, when the feed states it.
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub from_pos: Option<Point>,
    #[serde(default)]
    pub to_pos: Option<Point>,
}

impl TrackSegment {
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            line: None,
            from_pos: None,
            to_pos: None,
        }
    }

    pub fn track_id(&self) -> String {
        crate::style::generate_track_id(&self.from, &self.to)
    }
}

/// One topology snapshot: stations, optional feed-side lines, segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub stations: Vec<Station>,
    #[serde(default)]
    pub lines: Vec<Line>,
    pub segments: Vec<TrackSegment>,
}

// ────────────────────────────────────────────────────────────────────────────
// Live entities
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub id: String,
    pub pos: Point,
    /// Heading in radians, screen convention (0 = +x, clockwise positive).
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Train {
    pub fn at(id: impl Into<String>, pos: Point) -> Self {
        Self {
            id: id.into(),
            pos,
            heading: None,
            line: None,
            name: None,
            speed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    Go,
    Caution,
    Stop,
    Unknown,
}

impl SignalState {
    /// Map the aspect names used by game-server feeds onto the three states.
    pub fn from_aspect(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "go" | "green" | "clear" | "proceed" | "open" => SignalState::Go,
            "caution" | "yellow" | "amber" | "warning" => SignalState::Caution,
            "stop" | "red" | "danger" | "closed" | "blocked" => SignalState::Stop,
            _ => SignalState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub pos: Point,
    pub state: SignalState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Open,
    Closed,
    Occupied,
}

impl TrackState {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "free" | "clear" => Some(TrackState::Open),
            "closed" | "blocked" | "maintenance" => Some(TrackState::Closed),
            "occupied" | "reserved" => Some(TrackState::Occupied),
            _ => None,
        }
    }
}

/// Live state of one track block, keyed by the symmetric track id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStateReport {
    pub track_id: String,
    pub state: TrackState,
}

// ────────────────────────────────────────────────────────────────────────────
// Style overlay
// ────────────────────────────────────────────────────────────────────────────

/// Admin-authored visual override for one track segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TrackStyle {
    /// Apply the fields present in `patch` on top of `self`.
    pub fn merge(&mut self, patch: &TrackStyle) {
        if patch.color.is_some() {
            self.color = patch.color.clone();
        }
        if patch.width.is_some() {
            self.width = patch.width;
        }
        if patch.hidden.is_some() {
            self.hidden = patch.hidden;
        }
        if patch.label.is_some() {
            self.label = patch.label.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.width.is_none() && self.hidden.is_none() && self.label.is_none()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(false)
    }
}

/// The persisted style document, stored remotely as one JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDocument {
    #[serde(default)]
    pub version: u64,
    #[serde(default, deserialize_with = "timestamp_string")]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub styles: BTreeMap<String, TrackStyle>,
}

/// Reply of the style service to a POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub success: bool,
    #[serde(default, deserialize_with = "timestamp_string")]
    pub last_modified: Option<String>,
}

/// Timestamps arrive either as ISO strings or as epoch milliseconds.
fn timestamp_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
