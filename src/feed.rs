//! Live transit data payload handling.
//!
//! Bodies from the live data service come in several shapes: plain JSON,
//! SSE-framed single snapshots (`data: {...}`), error envelopes
//! (`{"error": "...", "trains": []}`) with status 200 or 5xx, and the odd
//! non-JSON page. [`unwrap_payload`] turns a raw response into either a JSON
//! value or a typed error; the `decode_*` functions normalise entity shapes
//! and drop individual items they cannot read.
//!
//! Positions are accepted as `{x, y}`, `{x, z}`, `[x, y]` or `[x, y, z]`,
//! either inline or under `pos`/`position`/`location`. Three-component
//! positions are game-world `(x, height, z)`; the map plane is x/z.

use std::time::Duration;

use serde_json::Value;

use crate::error::{MapError, Result};
use crate::geometry::Point;
use crate::model::{
    Line, Signal, SignalState, Station, Topology, TrackSegment, TrackState, TrackStateReport,
    Train,
};
use crate::style::generate_track_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedKind {
    Topology,
    Trains,
    Signals,
    Blocks,
}

impl FeedKind {
    pub fn label(&self) -> &'static str {
        match self {
            FeedKind::Topology => "network",
            FeedKind::Trains => "trains",
            FeedKind::Signals => "signals",
            FeedKind::Blocks => "blocks",
        }
    }
}

/// Raw HTTP outcome. Error statuses are responses, not transport failures,
/// because the service puts error envelopes in 5xx bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}

pub trait Transport: Send + Sync {
    /// Errors only when no response was received at all.
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Blocking HTTP transport.
pub struct UreqTransport {
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let fetch_err = |message: String| MapError::Fetch {
            url: url.to_string(),
            message,
        };
        let (status, resp) = match ureq::get(url).timeout(self.timeout).call() {
            Ok(resp) => (resp.status(), resp),
            Err(ureq::Error::Status(code, resp)) => (code, resp),
            Err(e) => return Err(fetch_err(e.to_string())),
        };
        let body = resp.into_string().map_err(|e| fetch_err(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

/// Strip SSE framing: the last `data:` line carries the snapshot.
fn strip_sse(body: &str) -> &str {
    let trimmed = body.trim();
    if !trimmed.starts_with("data:") && !trimmed.starts_with("event:") {
        return trimmed;
    }
    trimmed
        .lines()
        .filter_map(|l| l.trim().strip_prefix("data:"))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("")
}

/// Validate a response and return its JSON payload.
pub fn unwrap_payload(resp: &HttpResponse) -> Result<Value> {
    let text = strip_sse(&resp.body);
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) if resp.status >= 400 => {
            return Err(MapError::Upstream {
                status: resp.status,
                message: format!("non-JSON error body ({e})"),
            });
        }
        Err(e) => return Err(MapError::Malformed(format!("body is not JSON: {e}"))),
    };
    if let Some(err) = value.get("error").filter(|e| !e.is_null() && *e != &Value::Bool(false)) {
        let message = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(MapError::Upstream {
            status: resp.status,
            message,
        });
    }
    if resp.status >= 400 {
        return Err(MapError::Upstream {
            status: resp.status,
            message: format!("HTTP status {}", resp.status),
        });
    }
    Ok(value)
}

fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| item.get(*k).filter(|v| !v.is_null()))
}

fn read_point(v: &Value) -> Option<Point> {
    match v {
        Value::Array(a) => match a.as_slice() {
            [x, y] => Some(Point::new(number(x)?, number(y)?)),
            [x, _, z] => Some(Point::new(number(x)?, number(z)?)),
            _ => None,
        },
        Value::Object(_) => {
            let x = number(v.get("x")?)?;
            let y = match (v.get("y").and_then(number), v.get("z").and_then(number)) {
                (_, Some(z)) => z,
                (Some(y), None) => y,
                (None, None) => return None,
            };
            Some(Point::new(x, y))
        }
        _ => None,
    }
}

fn entity_point(item: &Value) -> Option<Point> {
    match field(item, &["pos", "position", "location", "coords"]) {
        Some(p) => read_point(p),
        None => read_point(item),
    }
}

/// Entity list either at the top level or under one of `keys`.
fn entity_array<'a>(value: &'a Value, keys: &[&str]) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items.as_slice()),
        Value::Object(_) => match field(value, keys) {
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(MapError::Malformed(format!(
                "expected an array under '{}', found {}",
                keys[0],
                kind_name(other)
            ))),
            None if keys.iter().any(|k| value.get(*k).is_some()) => Ok(&[]),
            None => Err(MapError::Malformed(format!("missing '{}' array", keys[0]))),
        },
        other => Err(MapError::Malformed(format!(
            "expected an object or array, found {}",
            kind_name(other)
        ))),
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_station(item: &Value) -> Option<Station> {
    if let Some(name) = text(item) {
        return Some(Station {
            name,
            pos: None,
            blacklisted: false,
        });
    }
    let name = field(item, &["name", "id"]).and_then(text)?;
    Some(Station {
        name,
        pos: entity_point(item),
        blacklisted: item.get("blacklisted").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn segment_ends(item: &Value) -> Option<(String, String)> {
    if let Value::Array(a) = item {
        return match a.as_slice() {
            [a, b] => Some((text(a)?, text(b)?)),
            _ => None,
        };
    }
    if let Some(Value::Array(pair)) = field(item, &["stations", "ends"]) {
        return match pair.as_slice() {
            [a, b] => Some((text(a)?, text(b)?)),
            _ => None,
        };
    }
    let from = field(item, &["from", "a", "start", "source"]).and_then(text)?;
    let to = field(item, &["to", "b", "end", "target"]).and_then(text)?;
    Some((from, to))
}

fn decode_segment(item: &Value) -> Option<TrackSegment> {
    let (from, to) = segment_ends(item)?;
    if from == to {
        return None;
    }
    let explicit = |keys: &[&str]| field(item, keys).and_then(read_point);
    Some(TrackSegment {
        id: item.get("id").and_then(text),
        from,
        to,
        line: field(item, &["line", "lineId", "line_id"]).and_then(text),
        from_pos: explicit(&["from_pos", "fromPos"]),
        to_pos: explicit(&["to_pos", "toPos"]),
    })
}

fn decode_items<T>(items: &[Value], what: &str, f: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match f(item) {
            Some(v) => out.push(v),
            None => log::debug!("dropping unreadable {what} #{i}: {item}"),
        }
    }
    out
}

pub fn decode_topology(value: &Value) -> Result<Topology> {
    let root = match value.get("network") {
        Some(inner @ Value::Object(_)) => inner,
        _ => value,
    };
    if !root.is_object() {
        return Err(MapError::Malformed(format!(
            "network topology must be an object, found {}",
            kind_name(root)
        )));
    }
    let stations = entity_array(root, &["stations"])?;
    let segments = entity_array(root, &["segments", "tracks", "connections"])?;
    let lines: Vec<Line> = match root.get("lines") {
        Some(Value::Array(items)) => decode_items(items, "line", |v| {
            serde_json::from_value(v.clone()).ok()
        }),
        _ => Vec::new(),
    };
    Ok(Topology {
        stations: decode_items(stations, "station", decode_station),
        lines,
        segments: decode_items(segments, "segment", decode_segment),
    })
}

fn decode_train(item: &Value) -> Option<Train> {
    let id = field(item, &["id", "trainId", "uuid"]).and_then(text)?;
    let pos = entity_point(item)?;
    let heading = field(item, &["heading"])
        .and_then(number)
        .or_else(|| field(item, &["yaw", "headingDeg"]).and_then(number).map(f64::to_radians));
    Some(Train {
        id,
        pos,
        heading,
        line: field(item, &["line", "lineId", "route"]).and_then(text),
        name: field(item, &["name", "label"]).and_then(text),
        speed: item.get("speed").and_then(number),
    })
}

pub fn decode_trains(value: &Value) -> Result<Vec<Train>> {
    let items = entity_array(value, &["trains", "vehicles"])?;
    Ok(decode_items(items, "train", decode_train))
}

fn decode_signal(item: &Value) -> Option<Signal> {
    let id = field(item, &["id", "name"]).and_then(text)?;
    let pos = entity_point(item)?;
    let state = field(item, &["state", "aspect", "status"])
        .and_then(Value::as_str)
        .map(SignalState::from_aspect)
        .unwrap_or(SignalState::Unknown);
    Some(Signal { id, pos, state })
}

pub fn decode_signals(value: &Value) -> Result<Vec<Signal>> {
    let items = entity_array(value, &["signals"])?;
    Ok(decode_items(items, "signal", decode_signal))
}

fn decode_block(item: &Value) -> Option<TrackStateReport> {
    let track_id = match segment_ends(item) {
        Some((a, b)) => generate_track_id(&a, &b),
        None => field(item, &["trackId", "track_id", "id"]).and_then(text)?,
    };
    let state = match field(item, &["state", "status"]) {
        Some(v) => TrackState::from_name(v.as_str()?)?,
        None => match item.get("occupied").and_then(Value::as_bool) {
            Some(true) => TrackState::Occupied,
            Some(false) => TrackState::Open,
            None => return None,
        },
    };
    Some(TrackStateReport { track_id, state })
}

pub fn decode_blocks(value: &Value) -> Result<Vec<TrackStateReport>> {
    let items = entity_array(value, &["blocks", "tracks"])?;
    Ok(decode_items(items, "block", decode_block))
}
