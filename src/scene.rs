//! In-memory scene: static network merged with live entities and styles.
//!
//! Every `apply_*` call replaces one input slice wholesale and re-derives
//! the renderable geometry synchronously. Derivation depends only on the
//! current inputs, so applying the same inputs twice yields the same scene.
//!
//! A segment is dropped when either endpoint is blacklisted or cannot be
//! placed, so every derived endpoint belongs to a visible station.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::color::{Rgb, parse_color};
use crate::config::{DEFAULT_LINE_WIDTH, NetworkConfig};
use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::model::{
    Line, Signal, Station, TrackSegment, TrackState, TrackStateReport, TrackStyle, Train,
};
use crate::style::generate_track_id;

/// A segment ready to draw, with its effective style resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSegment {
    pub track_id: String,
    pub from: String,
    pub to: String,
    pub a: Point,
    pub b: Point,
    pub line_id: Option<String>,
    pub color: Rgb,
    pub width: f64,
    pub hidden: bool,
    pub label: Option<String>,
    pub state: TrackState,
    /// Whether an admin override contributed to the style.
    pub overridden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStation {
    pub name: String,
    pub pos: Point,
    /// Ids of the configured lines serving this station.
    pub lines: Vec<String>,
    pub color: Rgb,
    pub show_label: bool,
}

impl DerivedStation {
    pub fn is_interchange(&self) -> bool {
        self.lines.len() > 1
    }
}

#[derive(Debug, Clone, Default)]
struct Derived {
    stations: IndexMap<String, DerivedStation>,
    segments: Vec<DerivedSegment>,
    bounds: Option<Rect>,
}

#[derive(Debug, Clone)]
pub struct SceneModel {
    config: NetworkConfig,
    stations: Vec<Station>,
    lines: Vec<Line>,
    segments: Vec<TrackSegment>,
    trains: Vec<Train>,
    previous_trains: HashMap<String, Point>,
    signals: Vec<Signal>,
    styles: BTreeMap<String, TrackStyle>,
    track_states: HashMap<String, TrackState>,
    derived: Derived,
    revision: u64,
}

impl SceneModel {
    /// Build an empty scene for a validated network configuration.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let lines = config.lines.clone();
        Ok(Self {
            config,
            stations: Vec::new(),
            lines,
            segments: Vec::new(),
            trains: Vec::new(),
            previous_trains: HashMap::new(),
            signals: Vec::new(),
            styles: BTreeMap::new(),
            track_states: HashMap::new(),
            derived: Derived::default(),
            revision: 0,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn apply_topology(&mut self, stations: Vec<Station>, lines: Vec<Line>, segments: Vec<TrackSegment>) {
        self.stations = stations;
        self.lines = lines;
        self.segments = segments;
        self.rederive();
    }

    pub fn apply_live_entities(&mut self, trains: Vec<Train>, signals: Vec<Signal>) {
        self.previous_trains = self
            .trains
            .iter()
            .map(|t| (t.id.clone(), t.pos))
            .collect();
        self.trains = trains;
        self.signals = signals;
        self.rederive();
    }

    pub fn apply_styles(&mut self, overrides: BTreeMap<String, TrackStyle>) {
        self.styles = overrides;
        self.rederive();
    }

    pub fn apply_track_states(&mut self, states: Vec<TrackStateReport>) {
        self.track_states = states.into_iter().map(|s| (s.track_id, s.state)).collect();
        self.rederive();
    }

    /// Bumped after every apply; the render loop redraws when it changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }
    pub fn trains(&self) -> &[Train] {
        &self.trains
    }
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }
    pub fn styles(&self) -> &BTreeMap<String, TrackStyle> {
        &self.styles
    }

    /// All derived segments, hidden ones included (the style editor lists them).
    pub fn derived_segments(&self) -> &[DerivedSegment] {
        &self.derived.segments
    }

    /// The renderable set: derived segments that are not hidden.
    pub fn visible_segments(&self) -> impl Iterator<Item = &DerivedSegment> {
        self.derived.segments.iter().filter(|s| !s.hidden)
    }

    pub fn segment(&self, track_id: &str) -> Option<&DerivedSegment> {
        self.derived.segments.iter().find(|s| s.track_id == track_id)
    }

    pub fn derived_stations(&self) -> impl Iterator<Item = &DerivedStation> {
        self.derived.stations.values()
    }

    pub fn station(&self, name: &str) -> Option<&DerivedStation> {
        self.derived.stations.get(name)
    }

    pub fn train(&self, id: &str) -> Option<&Train> {
        self.trains.iter().find(|t| t.id == id)
    }

    pub fn signal(&self, id: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.id == id)
    }

    /// World bounding box of the derived network.
    pub fn bounds(&self) -> Option<Rect> {
        self.derived.bounds
    }

    /// Trains placed between their previous and current position.
    ///
    /// Only trains whose id appeared in the previous tick and moved at most
    /// `max_jump` world units are interpolated; everything else snaps.
    pub fn trains_at(&self, alpha: f64, max_jump: f64) -> Vec<Train> {
        let alpha = alpha.clamp(0.0, 1.0);
        self.trains
            .iter()
            .map(|t| {
                let mut t = t.clone();
                if let Some(prev) = self.previous_trains.get(&t.id) {
                    if prev.distance(t.pos) <= max_jump {
                        t.pos = prev.lerp(t.pos, alpha);
                    }
                }
                t
            })
            .collect()
    }

    fn rederive(&mut self) {
        self.derived = self.derive();
        self.revision += 1;
    }

    fn blacklist(&self) -> HashSet<&str> {
        self.config
            .blacklist
            .iter()
            .map(String::as_str)
            .chain(self.stations.iter().filter(|s| s.blacklisted).map(|s| s.name.as_str()))
            .collect()
    }

    fn derive(&self) -> Derived {
        let blacklist = self.blacklist();

        // Station positions: explicit first, then segment endpoint coordinates.
        let mut positions: IndexMap<&str, Option<Point>> = IndexMap::new();
        for s in &self.stations {
            positions.insert(s.name.as_str(), s.pos.filter(Point::is_finite));
        }
        for seg in &self.segments {
            for (name, pos) in [(&seg.from, seg.from_pos), (&seg.to, seg.to_pos)] {
                let slot = positions.entry(name.as_str()).or_insert(None);
                if slot.is_none() {
                    *slot = pos.filter(Point::is_finite);
                }
            }
        }

        let mut stations = IndexMap::new();
        for (name, pos) in &positions {
            if blacklist.contains(name) {
                continue;
            }
            let Some(pos) = pos else {
                log::debug!("station '{name}' has no position, not drawn");
                continue;
            };
            let serving: Vec<&Line> = self.lines.iter().filter(|l| l.serves(name)).collect();
            stations.insert(
                name.to_string(),
                DerivedStation {
                    name: name.to_string(),
                    pos: *pos,
                    lines: serving.iter().map(|l| l.id.clone()).collect(),
                    color: serving.first().map(|l| NetworkConfig::line_color(l)).unwrap_or(Rgb::BLACK),
                    show_label: !self.config.label_suppressed(name),
                },
            );
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            if blacklist.contains(seg.from.as_str()) || blacklist.contains(seg.to.as_str()) {
                log::debug!("segment {}–{} touches a blacklisted station", seg.from, seg.to);
                continue;
            }
            let (Some(a), Some(b)) = (stations.get(&seg.from), stations.get(&seg.to)) else {
                log::debug!("segment {}–{} has an unplaced endpoint", seg.from, seg.to);
                continue;
            };
            let track_id = generate_track_id(&seg.from, &seg.to);
            if !seen.insert(track_id.clone()) {
                continue;
            }
            segments.push(self.derive_segment(seg, track_id, a.pos, b.pos));
        }

        let bounds = Rect::bounding(stations.values().map(|s| s.pos));
        Derived {
            stations,
            segments,
            bounds,
        }
    }

    fn derive_segment(&self, seg: &TrackSegment, track_id: String, a: Point, b: Point) -> DerivedSegment {
        let line = seg
            .line
            .as_deref()
            .and_then(|id| self.lines.iter().find(|l| l.id == id))
            .or_else(|| {
                self.lines
                    .iter()
                    .find(|l| l.serves(&seg.from) && l.serves(&seg.to))
            });
        let mut color = line.map(NetworkConfig::line_color).unwrap_or(Rgb::NEUTRAL);
        let mut width = line.and_then(|l| l.width).unwrap_or(DEFAULT_LINE_WIDTH);
        let mut hidden = false;
        let mut label = None;

        let style = self.styles.get(&track_id);
        if let Some(style) = style {
            if let Some(c) = style.color.as_deref() {
                match parse_color(c) {
                    Some(rgb) => color = rgb,
                    None => log::warn!("ignoring unparsable override color '{c}' on {track_id}"),
                }
            }
            if let Some(w) = style.width.filter(|w| w.is_finite() && *w > 0.0) {
                width = w;
            }
            hidden = style.is_hidden();
            label = style.label.clone().filter(|l| !l.trim().is_empty());
        }

        DerivedSegment {
            state: self.track_states.get(&track_id).copied().unwrap_or(TrackState::Open),
            track_id,
            from: seg.from.clone(),
            to: seg.to.clone(),
            a,
            b,
            line_id: line.map(|l| l.id.clone()),
            color,
            width,
            hidden,
            label,
            overridden: style.is_some(),
        }
    }
}
