#![cfg(feature = "egui")]

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Shape};

use crate::camera::ViewportController;
use crate::color::Rgb;
use crate::config::{MapConfig, NetworkConfig};
use crate::error::Result;
use crate::feed::Transport;
use crate::geometry::Point;
use crate::hit::{Hit, HitKind, HitTester};
use crate::model::{TrackStyle, Train};
use crate::poller::LivePoller;
use crate::projection::CanvasSize;
use crate::render::{FrameGate, RenderOptions};
use crate::scene::SceneModel;
use crate::style::{StyleEvent, StyleStore};

/// Trains moving further than this (world units) between ticks snap.
pub const MAX_INTERPOLATION_JUMP: f64 = 200.0;

/// Editable copy of one track override, shown in the admin side panel.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleDraft {
    pub track_id: String,
    pub use_color: bool,
    pub color: [u8; 3],
    pub use_width: bool,
    pub width: f64,
    pub hidden: bool,
    pub label: String,
}

impl StyleDraft {
    pub fn for_track(scene: &SceneModel, styles: &StyleStore, track_id: &str) -> Option<Self> {
        let seg = scene.segment(track_id)?;
        let current = styles.get_style(track_id).cloned().unwrap_or_default();
        Some(Self {
            track_id: track_id.to_string(),
            use_color: current.color.is_some(),
            color: [seg.color.0, seg.color.1, seg.color.2],
            use_width: current.width.is_some(),
            width: seg.width,
            hidden: current.is_hidden(),
            label: current.label.unwrap_or_default(),
        })
    }

    pub fn to_style(&self) -> TrackStyle {
        let [r, g, b] = self.color;
        TrackStyle {
            color: self
                .use_color
                .then(|| Rgb(r, g, b).to_hex()),
            width: self.use_width.then_some(self.width),
            hidden: self.hidden.then_some(true),
            label: Some(self.label.trim().to_string()).filter(|l| !l.is_empty()),
        }
    }
}

/// Interactive live map window.
pub struct TransitMapApp {
    pub scene: SceneModel,
    pub viewport: ViewportController,
    pub poller: LivePoller,
    pub styles: StyleStore,
    pub hit_tester: HitTester,
    pub render_opts: RenderOptions,
    pub hover: Option<Hit>,
    pub selection: Option<Hit>,
    pub editor: Option<StyleDraft>,
    /// Last user-facing message from the style store.
    pub notice: Option<String>,
    pub interpolate: bool,
    pub focus_zoom: f64,
    pub(crate) frame_gate: FrameGate,
    pub(crate) cached_shapes: Vec<Shape>,
    pub(crate) canvas_origin: Option<egui::Pos2>,
    last_round: Instant,
    fitted: bool,
    applied_style_revision: u64,
}

impl TransitMapApp {
    /// Build the app from injected configuration and collaborators. Fails
    /// with a configuration error before any window state exists.
    pub fn new(
        network: NetworkConfig,
        cfg: &MapConfig,
        transport: Arc<dyn Transport>,
        mut styles: StyleStore,
    ) -> Result<Self> {
        cfg.validate()?;
        let mut scene = SceneModel::new(network)?;
        let viewport = ViewportController::new(CanvasSize::new(800.0, 600.0), cfg.zoom, cfg.pan_bounds)?;
        styles.load_all();
        scene.apply_styles(styles.document().styles.clone());
        let applied_style_revision = styles.revision();
        let poller = LivePoller::spawn(transport, cfg.feed.clone(), cfg.poll_interval());
        Ok(Self {
            scene,
            viewport,
            poller,
            styles,
            hit_tester: HitTester::new(cfg.hit_radius_px),
            render_opts: RenderOptions {
                show_labels: cfg.show_labels,
                ..Default::default()
            },
            hover: None,
            selection: None,
            editor: None,
            notice: None,
            interpolate: cfg.interpolate_trains,
            focus_zoom: cfg.focus_zoom,
            frame_gate: FrameGate::default(),
            cached_shapes: Vec::new(),
            canvas_origin: None,
            last_round: Instant::now(),
            fitted: false,
            applied_style_revision,
        })
    }

    /// Schedule polls, merge finished rounds and style jobs. Returns whether
    /// the scene changed.
    pub fn sync(&mut self, now: Instant) -> bool {
        self.poller.tick(now);
        let mut changed = self.poller.pump(&mut self.scene);
        if changed {
            self.last_round = now;
            if !self.fitted {
                if let Some(bounds) = self.scene.bounds() {
                    self.viewport.fit_to(bounds);
                    self.fitted = true;
                }
            }
        }
        if let Some(event) = self.styles.pump() {
            self.notice = match event {
                StyleEvent::Loaded | StyleEvent::Reset => None,
                StyleEvent::Saved => Some("Styles saved".to_string()),
                StyleEvent::LoadFailed(e) => Some(format!("Using cached styles: {e}")),
                StyleEvent::SaveFailed(e) => Some(format!("Save failed, edits kept: {e}")),
                StyleEvent::ResetFailed(e) => Some(format!("Reset failed: {e}")),
            };
        }
        if self.styles.revision() != self.applied_style_revision {
            self.scene.apply_styles(self.styles.document().styles.clone());
            self.applied_style_revision = self.styles.revision();
            changed = true;
        }
        if self.selection.as_ref().is_some_and(|s| !self.selection_exists(s)) {
            self.selection = None;
        }
        changed
    }

    fn selection_exists(&self, hit: &Hit) -> bool {
        match hit.kind {
            HitKind::Station => self.scene.station(&hit.id).is_some(),
            HitKind::Track => self.scene.segment(&hit.id).is_some(),
            HitKind::Train => self.scene.train(&hit.id).is_some(),
            HitKind::Signal => self.scene.signal(&hit.id).is_some(),
        }
    }

    /// Trains as they should appear at `now`.
    pub fn displayed_trains(&self, now: Instant) -> Vec<Train> {
        if !self.interpolate {
            return self.scene.trains().to_vec();
        }
        let interval = self.poller.interval().max(Duration::from_millis(1));
        let alpha = now.duration_since(self.last_round).as_secs_f64() / interval.as_secs_f64();
        self.scene.trains_at(alpha, MAX_INTERPOLATION_JUMP)
    }

    /// Animation tick for redraw keys; 0 when trains are not interpolated.
    pub fn anim_tick(&self, now: Instant) -> u64 {
        if self.interpolate {
            (now.duration_since(self.last_round).as_millis() / 16) as u64
        } else {
            0
        }
    }

    fn hit_at(&self, screen: Point, trains: &[Train]) -> Option<Hit> {
        match self
            .hit_tester
            .resolve_among(screen, &self.scene, trains, self.viewport.camera())
        {
            Ok(hit) => hit,
            Err(e) => {
                log::error!("hit test failed: {e}");
                None
            }
        }
    }

    pub fn pointer_hover(&mut self, screen: Option<Point>, trains: &[Train]) {
        self.hover = screen.and_then(|p| self.hit_at(p, trains));
    }

    /// Select what is under the cursor; in admin mode a track opens the editor.
    pub fn click(&mut self, screen: Point, trains: &[Train]) {
        self.selection = self.hit_at(screen, trains);
        self.editor = match &self.selection {
            Some(hit) if hit.kind == HitKind::Track && self.styles.can_edit() => {
                StyleDraft::for_track(&self.scene, &self.styles, &hit.id)
            }
            _ => None,
        };
    }

    /// Double-clicking a station centres the camera on it.
    pub fn double_click(&mut self, screen: Point, trains: &[Train]) {
        if let Some(hit) = self.hit_at(screen, trains) {
            if hit.kind == HitKind::Station {
                if let Some(st) = self.scene.station(&hit.id) {
                    let zoom = self.viewport.zoom().max(self.focus_zoom);
                    self.viewport.focus_on(st.pos, zoom);
                }
            }
            self.selection = Some(hit);
        }
    }

    /// Write the editor draft into the style store (not yet saved remotely).
    pub fn apply_draft(&mut self) {
        let Some(draft) = &self.editor else {
            return;
        };
        if !self.styles.can_edit() {
            return;
        }
        self.styles.replace_style(&draft.track_id, draft.to_style());
    }

    pub fn remove_override(&mut self) {
        let Some(draft) = self.editor.take() else {
            return;
        };
        if self.styles.can_edit() {
            self.styles.remove_style(&draft.track_id);
        }
        self.editor = StyleDraft::for_track(&self.scene, &self.styles, &draft.track_id);
    }

    pub fn save_styles(&mut self) {
        if let Err(e) = self.styles.save_all() {
            self.notice = Some(format!("Save failed, edits kept: {e}"));
        }
    }

    pub fn revert_styles(&mut self) {
        self.styles.load_all();
        self.editor = None;
    }

    pub fn reset_styles(&mut self) {
        if let Err(e) = self.styles.reset_all() {
            self.notice = Some(format!("Reset failed: {e}"));
        }
        self.editor = None;
    }

    /// Stop polling; late responses are discarded.
    pub fn dispose(&mut self) {
        self.poller.dispose();
    }
}

impl eframe::App for TransitMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        super::ui::update(self, ctx);
    }
}
