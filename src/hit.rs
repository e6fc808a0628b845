//! Pointer hit testing against the projected scene.
//!
//! The hit radius is fixed in screen pixels. In world units the tolerance is
//! therefore `radius_px / zoom`: it shrinks as the user zooms in and grows as
//! they zoom out, so targets always feel the same size under the cursor.
//!
//! When several entities qualify the kind priority decides
//! (train, then station, then signal, then track), then the distance.

use serde::Serialize;

use crate::error::Result;
use crate::geometry::{Point, point_segment_distance};
use crate::model::Train;
use crate::projection::{Camera, Projector};
use crate::scene::SceneModel;

/// Entity kinds in hit priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Train,
    Station,
    Signal,
    Track,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub kind: HitKind,
    pub id: String,
    /// Distance from the cursor in screen pixels.
    pub distance_px: f64,
}

impl Hit {
    pub fn is(&self, kind: HitKind, id: &str) -> bool {
        self.kind == kind && self.id == id
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HitTester {
    /// Radius for point entities (trains, stations, signals).
    pub radius_px: f64,
    /// Perpendicular distance threshold for tracks.
    pub track_tolerance_px: f64,
}

impl Default for HitTester {
    fn default() -> Self {
        Self {
            radius_px: 10.0,
            track_tolerance_px: 6.0,
        }
    }
}

impl HitTester {
    pub fn new(radius_px: f64) -> Self {
        Self {
            radius_px,
            track_tolerance_px: (radius_px * 0.6).max(3.0),
        }
    }

    /// Resolve using the scene's current train positions.
    pub fn resolve(&self, screen: Point, scene: &SceneModel, camera: &Camera) -> Result<Option<Hit>> {
        self.resolve_among(screen, scene, scene.trains(), camera)
    }

    /// Resolve against explicitly supplied train positions, e.g. the
    /// interpolated ones currently on screen.
    pub fn resolve_among(
        &self,
        screen: Point,
        scene: &SceneModel,
        trains: &[Train],
        camera: &Camera,
    ) -> Result<Option<Hit>> {
        let proj = Projector::new(camera)?;
        if !screen.is_finite() {
            return Ok(None);
        }
        let cursor = proj.unproject(screen);
        let point_tol = proj.world_len(self.radius_px);
        let track_tol = proj.world_len(self.track_tolerance_px);
        let zoom = proj.zoom();

        let mut best: Option<Hit> = None;
        let mut consider = |kind: HitKind, id: &str, world_dist: f64, tol: f64| {
            if !world_dist.is_finite() || world_dist > tol {
                return;
            }
            let cand = Hit {
                kind,
                id: id.to_string(),
                distance_px: world_dist * zoom,
            };
            let better = match &best {
                None => true,
                Some(b) => (cand.kind, cand.distance_px) < (b.kind, b.distance_px),
            };
            if better {
                best = Some(cand);
            }
        };

        for t in trains {
            consider(HitKind::Train, &t.id, cursor.distance(t.pos), point_tol);
        }
        for s in scene.derived_stations() {
            consider(HitKind::Station, &s.name, cursor.distance(s.pos), point_tol);
        }
        for s in scene.signals() {
            consider(HitKind::Signal, &s.id, cursor.distance(s.pos), point_tol);
        }
        for seg in scene.visible_segments() {
            let d = point_segment_distance(cursor, seg.a, seg.b);
            consider(HitKind::Track, &seg.track_id, d, track_tol);
        }
        Ok(best)
    }
}

/// Resolve the entity under `screen` with the default radii.
pub fn resolve_hit(screen: Point, scene: &SceneModel, camera: &Camera) -> Result<Option<Hit>> {
    HitTester::default().resolve(screen, scene, camera)
}
