//! Egui-based interactive map window (feature = "egui").
//!
//! `state` holds the toolkit-independent application state and input
//! handling, `painter` adapts the render loop's `Canvas` to egui shapes and
//! `ui` lays out the panels.

#![cfg(feature = "egui")]

mod painter;
mod state;
mod ui;

pub use painter::ShapeCanvas;
pub use state::{StyleDraft, TransitMapApp};
