//! Scene drawing against an abstract [`Canvas`].
//!
//! Z-order: track segments, stations, labels, trains, signals, then the
//! hover/selection highlight. A bad entity (non-finite position) is skipped
//! and logged; it never aborts the frame.

use crate::color::Rgb;
use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::hit::{Hit, HitKind};
use crate::labels::{LabelConfig, LabelPlacer};
use crate::model::{SignalState, TrackState, Train};
use crate::projection::{Camera, Projector};
use crate::scene::SceneModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: Rgb,
    pub dashed: bool,
}

impl Stroke {
    pub fn solid(width: f64, color: Rgb) -> Self {
        Self {
            width,
            color,
            dashed: false,
        }
    }
}

/// Drawing surface in screen pixels.
pub trait Canvas {
    fn line(&mut self, a: Point, b: Point, stroke: Stroke);
    fn circle(&mut self, center: Point, radius: f64, fill: Option<Rgb>, stroke: Option<Stroke>);
    fn polygon(&mut self, points: &[Point], fill: Rgb, stroke: Option<Stroke>);
    /// Draw `text` centred on `center`.
    fn text(&mut self, center: Point, text: &str, size: f64, color: Rgb);

    /// Width and height of `text` at `size`. The default is a monospace estimate.
    fn text_size(&self, text: &str, size: f64) -> (f64, f64) {
        (text.chars().count() as f64 * size * 0.6, size * 1.2)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub show_labels: bool,
    pub station_radius: f64,
    pub train_radius: f64,
    pub signal_radius: f64,
    pub label_size: f64,
    pub label_color: Rgb,
    pub station_fill: Rgb,
    pub hover_color: Rgb,
    pub selection_color: Rgb,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_labels: true,
            station_radius: 5.0,
            train_radius: 6.0,
            signal_radius: 3.5,
            label_size: 12.0,
            label_color: Rgb(30, 30, 30),
            station_fill: Rgb::WHITE,
            hover_color: Rgb(255, 170, 0),
            selection_color: Rgb(0, 120, 255),
        }
    }
}

/// Counters for one frame, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub segments: usize,
    pub stations: usize,
    pub labels: usize,
    pub trains: usize,
    pub signals: usize,
    pub skipped: usize,
}

pub fn signal_color(state: SignalState) -> Rgb {
    match state {
        SignalState::Go => Rgb(0, 170, 60),
        SignalState::Caution => Rgb(240, 180, 0),
        SignalState::Stop => Rgb(220, 30, 30),
        SignalState::Unknown => Rgb(140, 140, 140),
    }
}

struct Frame<'a, C: Canvas + ?Sized> {
    canvas: &'a mut C,
    proj: Projector,
    view: Rect,
    opts: &'a RenderOptions,
    stats: FrameStats,
}

impl<C: Canvas + ?Sized> Frame<'_, C> {
    fn screen(&mut self, what: &str, world: Point) -> Option<Point> {
        let p = self.proj.project(world);
        if p.is_finite() {
            Some(p)
        } else {
            log::warn!("skipping {what}: position {world:?} does not project");
            self.stats.skipped += 1;
            None
        }
    }

    fn segments(&mut self, scene: &SceneModel) {
        for seg in scene.visible_segments() {
            let (Some(a), Some(b)) = (self.screen(&seg.track_id, seg.a), self.screen(&seg.track_id, seg.b)) else {
                continue;
            };
            let Some(bbox) = Rect::bounding([a, b]) else { continue };
            if !bbox.intersects(self.view) && !self.view.contains(a) {
                continue;
            }
            let stroke = match seg.state {
                TrackState::Open => Stroke::solid(seg.width, seg.color),
                TrackState::Closed => Stroke {
                    width: seg.width,
                    color: seg.color.mix(Rgb::WHITE, 0.6),
                    dashed: true,
                },
                TrackState::Occupied => {
                    self.canvas.line(a, b, Stroke::solid(seg.width + 3.0, Rgb(255, 140, 0)));
                    Stroke::solid(seg.width, seg.color)
                }
            };
            self.canvas.line(a, b, stroke);
            self.stats.segments += 1;
        }
    }

    fn stations(&mut self, scene: &SceneModel, placer: &mut LabelPlacer) {
        let r = self.opts.station_radius;
        for st in scene.derived_stations() {
            let Some(p) = self.screen(&st.name, st.pos) else { continue };
            if !self.view.contains(p) {
                continue;
            }
            let radius = if st.is_interchange() { r * 1.3 } else { r };
            self.canvas
                .circle(p, radius, Some(self.opts.station_fill), Some(Stroke::solid(2.0, st.color)));
            placer.block(Rect::from_center_size(p, radius * 2.0, radius * 2.0));
            self.stats.stations += 1;
        }
    }

    fn labels(&mut self, scene: &SceneModel, placer: &mut LabelPlacer) {
        let size = self.opts.label_size;
        for st in scene.derived_stations().filter(|s| s.show_label) {
            let p = self.proj.project(st.pos);
            if !p.is_finite() || !self.view.contains(p) {
                continue;
            }
            let dims = self.canvas.text_size(&st.name, size);
            if let Some(l) = placer.place_near(p, self.opts.station_radius, &st.name, dims) {
                self.canvas.text(l.rect.center(), &l.text, size, self.opts.label_color);
                self.stats.labels += 1;
            }
        }
        for seg in scene.visible_segments() {
            let Some(label) = seg.label.as_deref() else { continue };
            let (a, b) = (self.proj.project(seg.a), self.proj.project(seg.b));
            let mid = a.midpoint(b);
            if !mid.is_finite() || !self.view.contains(mid) {
                continue;
            }
            let len = a.distance(b).max(f64::EPSILON);
            let dir = Point::new((b.x - a.x) / len, (b.y - a.y) / len);
            let dims = self.canvas.text_size(label, size * 0.9);
            if let Some(l) = placer.place_along(mid, dir, label, dims) {
                self.canvas.text(l.rect.center(), &l.text, size * 0.9, seg.color);
                self.stats.labels += 1;
            }
        }
    }

    fn trains(&mut self, scene: &SceneModel, trains: &[Train]) {
        let r = self.opts.train_radius;
        for t in trains {
            let Some(p) = self.screen(&t.id, t.pos) else { continue };
            if !self.view.contains(p) {
                continue;
            }
            let color = t
                .line
                .as_deref()
                .and_then(|id| scene.lines().iter().find(|l| l.id == id))
                .map(crate::config::NetworkConfig::line_color)
                .unwrap_or(Rgb(40, 40, 40));
            match t.heading.filter(|h| h.is_finite()) {
                Some(h) => {
                    let (s, c) = h.sin_cos();
                    let tip = Point::new(p.x + c * r * 1.6, p.y + s * r * 1.6);
                    let left = Point::new(p.x - c * r + s * r, p.y - s * r - c * r);
                    let right = Point::new(p.x - c * r - s * r, p.y - s * r + c * r);
                    self.canvas
                        .polygon(&[tip, left, right], color, Some(Stroke::solid(1.0, Rgb::WHITE)));
                }
                None => self.canvas.circle(p, r, Some(color), Some(Stroke::solid(1.5, Rgb::WHITE))),
            }
            self.stats.trains += 1;
        }
    }

    fn signals(&mut self, scene: &SceneModel) {
        for s in scene.signals() {
            let Some(p) = self.screen(&s.id, s.pos) else { continue };
            if !self.view.contains(p) {
                continue;
            }
            self.canvas.circle(
                p,
                self.opts.signal_radius,
                Some(signal_color(s.state)),
                Some(Stroke::solid(1.0, Rgb(20, 20, 20))),
            );
            self.stats.signals += 1;
        }
    }

    fn highlight(&mut self, scene: &SceneModel, trains: &[Train], hit: &Hit, color: Rgb) {
        match hit.kind {
            HitKind::Track => {
                if let Some(seg) = scene.segment(&hit.id).filter(|s| !s.hidden) {
                    let (a, b) = (self.proj.project(seg.a), self.proj.project(seg.b));
                    if a.is_finite() && b.is_finite() {
                        self.canvas.line(a, b, Stroke::solid(seg.width + 4.0, color.mix(Rgb::WHITE, 0.3)));
                        self.canvas.line(a, b, Stroke::solid(seg.width, seg.color));
                    }
                }
            }
            kind => {
                let (pos, radius) = match kind {
                    HitKind::Station => (scene.station(&hit.id).map(|s| s.pos), self.opts.station_radius),
                    HitKind::Train => (trains.iter().find(|t| t.id == hit.id).map(|t| t.pos), self.opts.train_radius),
                    _ => (scene.signal(&hit.id).map(|s| s.pos), self.opts.signal_radius),
                };
                let Some(p) = pos.map(|w| self.proj.project(w)).filter(Point::is_finite) else {
                    return;
                };
                self.canvas.circle(p, radius + 4.0, None, Some(Stroke::solid(2.5, color)));
            }
        }
    }
}

/// Draw one frame. Fails only for an invalid camera; per-entity problems
/// are counted in [`FrameStats::skipped`].
pub fn render_scene<C: Canvas + ?Sized>(
    canvas: &mut C,
    scene: &SceneModel,
    trains: &[Train],
    camera: &Camera,
    hover: Option<&Hit>,
    selection: Option<&Hit>,
    opts: &RenderOptions,
) -> Result<FrameStats> {
    let proj = Projector::new(camera)?;
    let pad = opts.label_size * 4.0;
    let view = Rect::from_min_max(
        Point::new(-pad, -pad),
        Point::new(camera.canvas.width + pad, camera.canvas.height + pad),
    );
    let mut frame = Frame {
        canvas,
        proj,
        view,
        opts,
        stats: FrameStats::default(),
    };
    let mut placer = LabelPlacer::new(LabelConfig::default());

    frame.segments(scene);
    frame.stations(scene, &mut placer);
    if opts.show_labels {
        frame.labels(scene, &mut placer);
    }
    frame.trains(scene, trains);
    frame.signals(scene);
    if let Some(sel) = selection {
        frame.highlight(scene, trains, sel, opts.selection_color);
    }
    if let Some(h) = hover.filter(|h| Some(*h) != selection) {
        frame.highlight(scene, trains, h, opts.hover_color);
    }
    if frame.stats.skipped > 0 {
        log::warn!("frame skipped {} entities", frame.stats.skipped);
    }
    Ok(frame.stats)
}

/// Inputs that decide whether a new frame is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameKey {
    pub scene_revision: u64,
    pub camera_revision: u64,
    pub hover: Option<Hit>,
    pub selection: Option<Hit>,
    /// Animation tick; stays constant when trains are not interpolated.
    pub anim_tick: u64,
    pub show_labels: bool,
}

/// Debounces redraws: several triggers within one frame collapse into one draw.
#[derive(Debug, Default)]
pub struct FrameGate {
    last: Option<FrameKey>,
}

impl FrameGate {
    pub fn needs_redraw(&self, key: &FrameKey) -> bool {
        self.last.as_ref() != Some(key)
    }

    pub fn mark_drawn(&mut self, key: FrameKey) {
        self.last = Some(key);
    }

    /// Force the next check to report a redraw (e.g. after a resize).
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
