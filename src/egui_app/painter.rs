#![cfg(feature = "egui")]

use eframe::egui::{self, Color32, Pos2, Shape, Vec2};

use crate::color::Rgb;
use crate::geometry::Point;
use crate::render::{Canvas, Stroke};

pub(crate) fn rgb_to_color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.0, c.1, c.2)
}

fn to_stroke(s: Stroke) -> egui::Stroke {
    egui::Stroke::new(s.width as f32, rgb_to_color32(s.color))
}

/// Records the render loop's draw calls as egui shapes so an unchanged
/// frame can be replayed without redrawing.
pub struct ShapeCanvas<'a> {
    painter: &'a egui::Painter,
    origin: Pos2,
    pub shapes: Vec<Shape>,
}

impl<'a> ShapeCanvas<'a> {
    /// `origin` is the top-left of the canvas rect in egui screen space.
    pub fn new(painter: &'a egui::Painter, origin: Pos2) -> Self {
        Self {
            painter,
            origin,
            shapes: Vec::new(),
        }
    }

    fn pos(&self, p: Point) -> Pos2 {
        Pos2::new(self.origin.x + p.x as f32, self.origin.y + p.y as f32)
    }
}

impl Canvas for ShapeCanvas<'_> {
    fn line(&mut self, a: Point, b: Point, stroke: Stroke) {
        let pts = [self.pos(a), self.pos(b)];
        if stroke.dashed {
            let w = stroke.width as f32;
            self.shapes
                .extend(Shape::dashed_line(&pts, to_stroke(stroke), w * 3.0, w * 2.0));
        } else {
            self.shapes.push(Shape::line_segment(pts, to_stroke(stroke)));
        }
    }

    fn circle(&mut self, center: Point, radius: f64, fill: Option<Rgb>, stroke: Option<Stroke>) {
        let c = self.pos(center);
        let r = radius as f32;
        if let Some(fill) = fill {
            self.shapes.push(Shape::circle_filled(c, r, rgb_to_color32(fill)));
        }
        if let Some(stroke) = stroke {
            self.shapes.push(Shape::circle_stroke(c, r, to_stroke(stroke)));
        }
    }

    fn polygon(&mut self, points: &[Point], fill: Rgb, stroke: Option<Stroke>) {
        let pts: Vec<Pos2> = points.iter().map(|p| self.pos(*p)).collect();
        let stroke = stroke.map(to_stroke).unwrap_or(egui::Stroke::NONE);
        self.shapes
            .push(Shape::convex_polygon(pts, rgb_to_color32(fill), stroke));
    }

    fn text(&mut self, center: Point, text: &str, size: f64, color: Rgb) {
        let color = rgb_to_color32(color);
        let galley = self.painter.layout_no_wrap(
            text.to_string(),
            egui::FontId::proportional(size as f32),
            color,
        );
        let pos = self.pos(center) - galley.size() / 2.0;
        self.shapes.push(Shape::galley(pos, galley, color));
    }

    fn text_size(&self, text: &str, size: f64) -> (f64, f64) {
        let galley = self.painter.layout_no_wrap(
            text.to_string(),
            egui::FontId::proportional(size as f32),
            Color32::BLACK,
        );
        let Vec2 { x, y } = galley.size();
        (x as f64, y as f64)
    }
}
