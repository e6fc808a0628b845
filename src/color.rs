//! Utility for parsing display color strings (hex, `rgb(...)` or named colors).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Simple RGB color independent of any GUI toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    /// Color used for segments that belong to no configured line.
    pub const NEUTRAL: Rgb = Rgb(128, 128, 128);

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Blend towards `other` by `t` in `[0, 1]`.
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let f = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(f(self.0, other.0), f(self.1, other.1), f(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Parse a color string such as `#e32017`, `#f00`, `rgb(255, 0, 0)` or `red`.
pub fn parse_color(val: &str) -> Option<Rgb> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = val.to_ascii_lowercase();
    if let Some(inner) = lower
        .strip_prefix("rgb(")
        .and_then(|s| s.strip_suffix(')'))
    {
        let parts: Vec<u8> = inner
            .split(',')
            .filter_map(|s| s.trim().parse::<u8>().ok())
            .collect();
        return match parts.as_slice() {
            [r, g, b] => Some(Rgb(*r, *g, *b)),
            _ => None,
        };
    }
    let named = match lower.as_str() {
        "white" => Rgb(0xff, 0xff, 0xff),
        "black" => Rgb(0x00, 0x00, 0x00),
        "red" => Rgb(0xff, 0x00, 0x00),
        "green" => Rgb(0x00, 0x80, 0x00),
        "blue" => Rgb(0x00, 0x00, 0xff),
        "yellow" => Rgb(0xff, 0xff, 0x00),
        "orange" => Rgb(0xff, 0xa5, 0x00),
        "cyan" => Rgb(0x00, 0xff, 0xff),
        "magenta" => Rgb(0xff, 0x00, 0xff),
        "lightblue" => Rgb(0xad, 0xd8, 0xe6),
        "darkgreen" => Rgb(0x00, 0x64, 0x00),
        "gray" | "grey" => Rgb(0x80, 0x80, 0x80),
        "lightgray" | "lightgrey" => Rgb(0xd3, 0xd3, 0xd3),
        "darkgray" | "darkgrey" => Rgb(0xa9, 0xa9, 0xa9),
        "brown" => Rgb(0xa5, 0x2a, 0x2a),
        "purple" => Rgb(0x80, 0x00, 0x80),
        "pink" => Rgb(0xff, 0xc0, 0xcb),
        "lime" => Rgb(0x00, 0xff, 0x00),
        "navy" => Rgb(0x00, 0x00, 0x80),
        "teal" => Rgb(0x00, 0x80, 0x80),
        "olive" => Rgb(0x80, 0x80, 0x00),
        "maroon" => Rgb(0x80, 0x00, 0x00),
        "silver" => Rgb(0xc0, 0xc0, 0xc0),
        _ => return None,
    };
    Some(named)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let d = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Rgb(d(0)?, d(1)?, d(2)?))
        }
        6 => {
            let d = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(Rgb(d(0)?, d(2)?, d(4)?))
        }
        _ => None,
    }
}
