//! Headless [`Canvas`] that accumulates an SVG document.

use std::fmt::Write as _;

use crate::color::Rgb;
use crate::geometry::Point;
use crate::render::{Canvas, Stroke};

pub struct SvgCanvas {
    width: f64,
    height: f64,
    background: Rgb,
    body: String,
}

fn stroke_attrs(stroke: Option<Stroke>) -> String {
    match stroke {
        Some(s) => {
            let dash = if s.dashed {
                format!(r#" stroke-dasharray="{:.1} {:.1}""#, s.width * 3.0, s.width * 2.0)
            } else {
                String::new()
            };
            format!(r#" stroke="{}" stroke-width="{:.2}"{dash}"#, s.color, s.width)
        }
        None => String::new(),
    }
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64, background: Rgb) -> Self {
        Self {
            width,
            height,
            background,
            body: String::new(),
        }
    }

    pub fn finish(self) -> String {
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                "\n",
                r#"<rect width="100%" height="100%" fill="{bg}"/>"#,
                "\n{body}</svg>\n"
            ),
            w = self.width,
            h = self.height,
            bg = self.background,
            body = self.body
        )
    }
}

impl Canvas for SvgCanvas {
    fn line(&mut self, a: Point, b: Point, stroke: Stroke) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-linecap="round"{}/>"#,
            a.x,
            a.y,
            b.x,
            b.y,
            stroke_attrs(Some(stroke))
        );
    }

    fn circle(&mut self, center: Point, radius: f64, fill: Option<Rgb>, stroke: Option<Stroke>) {
        let fill = fill.map(|c| c.to_hex()).unwrap_or_else(|| "none".to_string());
        let _ = writeln!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{fill}"{}/>"#,
            center.x,
            center.y,
            radius,
            stroke_attrs(stroke)
        );
    }

    fn polygon(&mut self, points: &[Point], fill: Rgb, stroke: Option<Stroke>) {
        let pts: Vec<String> = points.iter().map(|p| format!("{:.2},{:.2}", p.x, p.y)).collect();
        let _ = writeln!(
            self.body,
            r#"<polygon points="{}" fill="{fill}"{}/>"#,
            pts.join(" "),
            stroke_attrs(stroke)
        );
    }

    fn text(&mut self, center: Point, text: &str, size: f64, color: Rgb) {
        let _ = writeln!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" font-size="{:.1}" font-family="sans-serif" text-anchor="middle" dominant-baseline="central" fill="{color}">{}</text>"#,
            center.x,
            center.y,
            size,
            html_escape::encode_text(text)
        );
    }
}
