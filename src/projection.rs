//! World ↔ screen coordinate projection.
//!
//! `screen = world * zoom + pan`, so `world = (screen - pan) / zoom`.
//! A camera with a zero, negative or non-finite zoom is rejected with
//! [`MapError::Configuration`] before any division happens.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_max(Point::ZERO, Point::new(self.width, self.height))
    }
}

/// Camera state: pan offset in screen pixels, zoom in pixels per world unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub pan: Point,
    pub zoom: f64,
    pub canvas: CanvasSize,
}

impl Camera {
    pub fn new(pan: Point, zoom: f64, canvas: CanvasSize) -> Result<Self> {
        let c = Self { pan, zoom, canvas };
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(MapError::config(format!(
                "camera zoom must be finite and positive, got {}",
                self.zoom
            )));
        }
        if !self.pan.is_finite() {
            return Err(MapError::config("camera pan must be finite"));
        }
        Ok(())
    }

    /// World point currently shown at the centre of the canvas.
    pub fn center_world(&self) -> Result<Point> {
        unproject(self.canvas.center(), self)
    }

    /// World-space rectangle covered by the canvas.
    pub fn visible_world(&self) -> Result<Rect> {
        let p = Projector::new(self)?;
        Ok(Rect::from_min_max(
            p.unproject(Point::ZERO),
            p.unproject(Point::new(self.canvas.width, self.canvas.height)),
        ))
    }
}

/// A validated camera snapshot. Construction is the only fallible step, so
/// per-entity projection inside a frame cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    pan: Point,
    zoom: f64,
}

impl Projector {
    pub fn new(camera: &Camera) -> Result<Self> {
        camera.validate()?;
        Ok(Self {
            pan: camera.pan,
            zoom: camera.zoom,
        })
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn project(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.pan.x,
            world.y * self.zoom + self.pan.y,
        )
    }

    pub fn unproject(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    /// Convert a screen-space length (pixels) into world units.
    pub fn world_len(&self, pixels: f64) -> f64 {
        pixels / self.zoom
    }
}

pub fn project(world: Point, camera: &Camera) -> Result<Point> {
    Ok(Projector::new(camera)?.project(world))
}

pub fn unproject(screen: Point, camera: &Camera) -> Result<Point> {
    Ok(Projector::new(camera)?.unproject(screen))
}
