//! Interactive live transit network map.
//!
//! The crate ingests network topology and live vehicle positions from a
//! transit data service, keeps a camera over the network, resolves pointer
//! hits and draws the result through a small [`render::Canvas`] trait.
//! Admins can overlay per-track styles that are persisted to a style service.
//!
//! The binary `transitmap` polls once and prints the derived scene as JSON;
//! `transitmap-viewer` (feature `egui`) is the interactive window.

pub mod camera;
pub mod color;
pub mod config;
pub mod error;
pub mod feed;
pub mod geometry;
pub mod hit;
pub mod labels;
pub mod model;
pub mod poller;
pub mod projection;
pub mod render;
pub mod scene;
pub mod style;
pub mod svg;

// Optional GUI functionality lives behind the `egui` feature flag.
#[cfg(feature = "egui")]
pub mod egui_app;

pub use error::{MapError, Result};
