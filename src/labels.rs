//! Deterministic screen-space label placement with collision avoidance.
//!
//! Labels are offered in draw order. Each one tries a fixed list of
//! candidate positions around its anchor (right, left, above, below) and
//! takes the first whose box, grown by `padding` on every side, does not
//! intersect any box placed earlier. Labels with no free slot are
//! dropped for this frame.

use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy)]
pub struct LabelConfig {
    pub padding: f64,
    /// Gap between the anchor and the label box.
    pub offset: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            padding: 2.0,
            offset: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Default)]
pub struct LabelPlacer {
    cfg: LabelConfig,
    placed: Vec<Rect>,
}

fn padded(r: Rect, pad: f64) -> Rect {
    Rect::from_center_size(r.center(), r.width() + 2.0 * pad, r.height() + 2.0 * pad)
}

impl LabelPlacer {
    pub fn new(cfg: LabelConfig) -> Self {
        Self {
            cfg,
            placed: Vec::new(),
        }
    }

    /// Reserve an area (e.g. a station marker) so labels avoid it.
    pub fn block(&mut self, r: Rect) {
        self.placed.push(r);
    }

    fn free(&self, r: Rect) -> bool {
        let grown = padded(r, self.cfg.padding);
        self.placed.iter().all(|p| !grown.intersects(*p))
    }

    /// Place a label of size `(w, h)` next to `anchor`, which is `clearance`
    /// pixels wide on each side (e.g. a marker radius).
    pub fn place_near(&mut self, anchor: Point, clearance: f64, text: &str, size: (f64, f64)) -> Option<PlacedLabel> {
        let (w, h) = size;
        let gap = clearance + self.cfg.offset;
        let candidates = [
            Point::new(anchor.x + gap + w * 0.5, anchor.y),
            Point::new(anchor.x - gap - w * 0.5, anchor.y),
            Point::new(anchor.x, anchor.y - gap - h * 0.5),
            Point::new(anchor.x, anchor.y + gap + h * 0.5),
        ];
        self.take_first(&candidates, text, w, h)
    }

    /// Place a label centred on `center`, sliding along `dir` (a unit
    /// vector) in steps of half the label width when the centre is taken.
    pub fn place_along(&mut self, center: Point, dir: Point, text: &str, size: (f64, f64)) -> Option<PlacedLabel> {
        let (w, h) = size;
        let step = (w * 0.5).max(1.0);
        let candidates: Vec<Point> = [0.0, 1.0, -1.0, 2.0, -2.0]
            .iter()
            .map(|k| Point::new(center.x + dir.x * step * k, center.y + dir.y * step * k))
            .collect();
        self.take_first(&candidates, text, w, h)
    }

    fn take_first(&mut self, candidates: &[Point], text: &str, w: f64, h: f64) -> Option<PlacedLabel> {
        let rect = candidates
            .iter()
            .map(|c| Rect::from_center_size(*c, w, h))
            .find(|r| self.free(*r))?;
        self.placed.push(rect);
        Some(PlacedLabel {
            text: text.to_string(),
            rect,
        })
    }
}
