//! Viewport controller: owns the camera and turns gestures into pan/zoom.
//!
//! Gesture states are `Idle` and `Panning` (pointer down, move, up); wheel
//! zoom is instantaneous and anchored at the cursor, so the world point
//! under the anchor stays under the anchor after the step.
//!
//! Pan is unclamped unless `pan_bounds` is set. With bounds, the world point
//! at the canvas centre is kept inside the bounds rectangle after every pan,
//! zoom or focus change.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::geometry::{Point, Rect};
use crate::projection::{Camera, CanvasSize};

/// Mouse wheel sensitivity: zoom factor per scrolled pixel.
pub const WHEEL_ZOOM_STEP: f64 = 0.001;
/// Pixels kept free around the network when fitting it to the canvas.
pub const FIT_MARGIN: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 40.0,
        }
    }
}

impl ZoomLimits {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let l = Self { min, max };
        l.validate()?;
        Ok(l)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min <= 0.0 {
            return Err(MapError::config(format!(
                "zoom limits must be finite and positive, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(MapError::config(format!(
                "min zoom {} exceeds max zoom {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

/// Reject pan bounds that cannot be clamped against.
pub fn validate_pan_bounds(bounds: Option<Rect>) -> Result<()> {
    match bounds {
        Some(b) if !b.is_well_formed() => Err(MapError::config(format!(
            "pan bounds must be a finite, non-inverted rectangle, got {:?}..{:?}",
            b.min, b.max
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Panning { last: Point },
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    camera: Camera,
    limits: ZoomLimits,
    pan_bounds: Option<Rect>,
    home: Option<Rect>,
    gesture: Gesture,
    revision: u64,
}

impl ViewportController {
    pub fn new(canvas: CanvasSize, limits: ZoomLimits, pan_bounds: Option<Rect>) -> Result<Self> {
        limits.validate()?;
        validate_pan_bounds(pan_bounds)?;
        let camera = Camera::new(Point::ZERO, limits.clamp(1.0), canvas)?;
        Ok(Self {
            camera,
            limits,
            pan_bounds,
            home: None,
            gesture: Gesture::Idle,
            revision: 0,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Incremented on every camera change; the render loop redraws when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// World point under a screen point. Zoom is never outside the
    /// validated limits, so the division is always defined.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.camera.pan.x) / self.camera.zoom,
            (screen.y - self.camera.pan.y) / self.camera.zoom,
        )
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.camera.zoom + self.camera.pan.x,
            world.y * self.camera.zoom + self.camera.pan.y,
        )
    }

    /// Resize the canvas, keeping the world point at the centre fixed.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        if canvas == self.camera.canvas {
            return;
        }
        let center_world = self.screen_to_world(self.camera.canvas.center());
        self.camera.canvas = canvas;
        self.place(center_world, canvas.center());
        self.touch();
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.gesture = Gesture::Panning { last: at };
    }

    pub fn pointer_move(&mut self, at: Point) {
        if let Gesture::Panning { last } = self.gesture {
            self.gesture = Gesture::Panning { last: at };
            self.pan_by(at.x - last.x, at.y - last.y);
        }
    }

    pub fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Wheel scroll in pixels (positive zooms in), anchored at `anchor`.
    pub fn wheel(&mut self, scroll_y: f64, anchor: Point) {
        let factor = (1.0 + scroll_y * WHEEL_ZOOM_STEP).max(0.1);
        self.zoom_by(factor, anchor);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
            return;
        }
        self.camera.pan.x += dx;
        self.camera.pan.y += dy;
        self.enforce_pan_bounds();
        self.touch();
    }

    /// Multiply zoom by `factor` (clamped to the limits) keeping the world
    /// point under `anchor` fixed on screen.
    pub fn zoom_by(&mut self, factor: f64, anchor: Point) {
        if !factor.is_finite() || factor <= 0.0 || !anchor.is_finite() {
            log::debug!("ignoring zoom step {factor} at {anchor:?}");
            return;
        }
        let new_zoom = self.limits.clamp(self.camera.zoom * factor);
        if (new_zoom - self.camera.zoom).abs() <= f64::EPSILON {
            return;
        }
        let world = self.screen_to_world(anchor);
        self.camera.zoom = new_zoom;
        self.place(world, anchor);
        self.enforce_pan_bounds();
        self.touch();
    }

    /// Centre `world` on the canvas at `target_zoom` (clamped). Immediate.
    pub fn focus_on(&mut self, world: Point, target_zoom: f64) {
        if !world.is_finite() {
            return;
        }
        if target_zoom.is_finite() && target_zoom > 0.0 {
            self.camera.zoom = self.limits.clamp(target_zoom);
        }
        self.place(world, self.camera.canvas.center());
        self.enforce_pan_bounds();
        self.touch();
    }

    /// Frame `bounds` inside the canvas and remember it as the reset target.
    pub fn fit_to(&mut self, bounds: Rect) {
        self.home = Some(bounds);
        let canvas = self.camera.canvas;
        let avail_w = (canvas.width - 2.0 * FIT_MARGIN).max(1.0);
        let avail_h = (canvas.height - 2.0 * FIT_MARGIN).max(1.0);
        let sx = if bounds.width() > f64::EPSILON { avail_w / bounds.width() } else { f64::INFINITY };
        let sy = if bounds.height() > f64::EPSILON { avail_h / bounds.height() } else { f64::INFINITY };
        let zoom = sx.min(sy);
        let zoom = if zoom.is_finite() { zoom } else { self.camera.zoom };
        self.focus_on(bounds.center(), zoom);
    }

    /// Return to the last fitted bounds, or to the origin at zoom 1.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
        match self.home {
            Some(home) => self.fit_to(home),
            None => {
                self.camera.zoom = self.limits.clamp(1.0);
                self.camera.pan = Point::ZERO;
                self.enforce_pan_bounds();
                self.touch();
            }
        }
    }

    pub fn has_home(&self) -> bool {
        self.home.is_some()
    }

    fn place(&mut self, world: Point, screen: Point) {
        self.camera.pan = Point::new(
            screen.x - world.x * self.camera.zoom,
            screen.y - world.y * self.camera.zoom,
        );
    }

    fn enforce_pan_bounds(&mut self) {
        let Some(bounds) = self.pan_bounds else {
            return;
        };
        let center = self.camera.canvas.center();
        let world = self.screen_to_world(center);
        if !bounds.contains(world) {
            self.place(bounds.clamp_point(world), center);
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
