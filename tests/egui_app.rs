#![cfg(feature = "egui")]

use std::sync::Arc;
use std::time::Instant;

use transitmap::config::{MapConfig, NetworkConfig};
use transitmap::egui_app::{StyleDraft, TransitMapApp};
use transitmap::feed::{HttpResponse, Transport};
use transitmap::geometry::Point;
use transitmap::hit::HitKind;
use transitmap::model::{Station, TrackSegment};
use transitmap::style::{StyleStore, generate_track_id};
use transitmap::{MapError, Result};

struct Offline;

impl Transport for Offline {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        Err(MapError::Fetch {
            url: url.to_string(),
            message: "offline".into(),
        })
    }
}

fn app(admin: bool) -> TransitMapApp {
    let mut app = TransitMapApp::new(
        NetworkConfig::default(),
        &MapConfig::default(),
        Arc::new(Offline),
        StyleStore::in_memory(admin),
    )
    .unwrap();
    app.scene.apply_topology(
        vec![
            Station::new("S1", Point::new(0.0, 0.0)),
            Station::new("S2", Point::new(100.0, 0.0)),
        ],
        vec![],
        vec![TrackSegment::between("S1", "S2")],
    );
    app
}

#[test]
fn invalid_config_fails_before_window() {
    let cfg = MapConfig {
        poll_interval_ms: 0,
        ..Default::default()
    };
    let res = TransitMapApp::new(
        NetworkConfig::default(),
        &cfg,
        Arc::new(Offline),
        StyleStore::in_memory(false),
    );
    assert!(matches!(res, Err(MapError::Configuration(_))));
}

#[test]
fn admin_click_on_track_opens_editor_and_applies_style() {
    let mut app = app(true);
    let trains = app.scene.trains().to_vec();
    app.click(Point::new(50.0, 2.0), &trains);
    assert_eq!(app.selection.as_ref().map(|h| h.kind), Some(HitKind::Track));
    let draft = app.editor.as_mut().expect("editor open");
    assert_eq!(draft.track_id, generate_track_id("S1", "S2"));
    draft.use_color = true;
    draft.color = [0, 0, 255];
    draft.hidden = true;
    app.apply_draft();

    app.sync(Instant::now());
    let seg = app.scene.segment(&generate_track_id("S1", "S2")).unwrap();
    assert!(seg.hidden);
    assert_eq!(seg.color, transitmap::color::Rgb(0, 0, 255));
    assert!(app.styles.is_dirty());
}

#[test]
fn viewer_click_never_opens_editor() {
    let mut app = app(false);
    app.click(Point::new(50.0, 2.0), &[]);
    assert!(app.selection.is_some());
    assert!(app.editor.is_none());
}

#[test]
fn double_click_focuses_station() {
    let mut app = app(false);
    app.double_click(Point::new(100.0, 1.0), &[]);
    assert_eq!(app.viewport.zoom(), 2.0);
    let s = app.viewport.world_to_screen(Point::new(100.0, 0.0));
    assert_eq!(s, app.viewport.camera().canvas.center());
}

#[test]
fn draft_only_carries_enabled_fields() {
    let app = app(true);
    let id = generate_track_id("S1", "S2");
    let mut draft = StyleDraft::for_track(&app.scene, &app.styles, &id).unwrap();
    assert!(!draft.use_color && !draft.use_width && !draft.hidden);
    draft.use_width = true;
    draft.width = 7.5;
    draft.label = "  ".into();
    let style = draft.to_style();
    assert_eq!(style.width, Some(7.5));
    assert!(style.color.is_none() && style.hidden.is_none() && style.label.is_none());
}
