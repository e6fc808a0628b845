use std::collections::BTreeMap;

use transitmap::color::Rgb;
use transitmap::config::NetworkConfig;
use transitmap::geometry::Point;
use transitmap::hit::{Hit, HitKind};
use transitmap::model::{Line, Station, TrackSegment, TrackState, TrackStateReport, TrackStyle, Train};
use transitmap::projection::{Camera, CanvasSize};
use transitmap::render::{Canvas, FrameGate, FrameKey, RenderOptions, Stroke, render_scene};
use transitmap::scene::SceneModel;
use transitmap::style::generate_track_id;
use transitmap::svg::SvgCanvas;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Line(Point, Point, Stroke),
    Circle(Point, f64),
    Polygon(usize),
    Text(String),
}

#[derive(Default)]
struct RecordingCanvas {
    ops: Vec<Op>,
}

impl RecordingCanvas {
    fn lines(&self) -> Vec<&Stroke> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Line(_, _, s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn line(&mut self, a: Point, b: Point, stroke: Stroke) {
        self.ops.push(Op::Line(a, b, stroke));
    }
    fn circle(&mut self, center: Point, radius: f64, _fill: Option<Rgb>, _stroke: Option<Stroke>) {
        self.ops.push(Op::Circle(center, radius));
    }
    fn polygon(&mut self, points: &[Point], _fill: Rgb, _stroke: Option<Stroke>) {
        self.ops.push(Op::Polygon(points.len()));
    }
    fn text(&mut self, _center: Point, text: &str, _size: f64, _color: Rgb) {
        self.ops.push(Op::Text(text.to_string()));
    }
}

fn scene() -> SceneModel {
    let mut scene = SceneModel::new(NetworkConfig {
        lines: vec![Line {
            id: "L1".into(),
            name: "Line 1".into(),
            color: "#e32017".into(),
            stations: vec!["S1".into(), "S2".into()],
            width: Some(4.0),
        }],
        blacklist: vec![],
        label_filters: vec![],
    })
    .unwrap();
    let lines = scene.config().lines.clone();
    scene.apply_topology(
        vec![
            Station::new("S1", Point::new(100.0, 100.0)),
            Station::new("S2", Point::new(400.0, 100.0)),
        ],
        lines,
        vec![TrackSegment::between("S1", "S2")],
    );
    scene
}

fn camera() -> Camera {
    Camera::new(Point::ZERO, 1.0, CanvasSize::new(800.0, 600.0)).unwrap()
}

fn render(scene: &SceneModel, trains: &[Train], selection: Option<&Hit>) -> (RecordingCanvas, transitmap::render::FrameStats) {
    let mut canvas = RecordingCanvas::default();
    let stats = render_scene(&mut canvas, scene, trains, &camera(), None, selection, &RenderOptions::default()).unwrap();
    (canvas, stats)
}

#[test]
fn segments_are_drawn_first_in_line_style() {
    let scene = scene();
    let (canvas, stats) = render(&scene, &[], None);
    assert_eq!(stats.segments, 1);
    assert_eq!(stats.stations, 2);
    match &canvas.ops[0] {
        Op::Line(a, b, s) => {
            assert_eq!(*a, Point::new(100.0, 100.0));
            assert_eq!(*b, Point::new(400.0, 100.0));
            assert_eq!(*s, Stroke::solid(4.0, Rgb(0xe3, 0x20, 0x17)));
        }
        other => panic!("expected a segment first, got {other:?}"),
    }
    let texts = canvas.texts();
    assert!(texts.contains(&"S1") && texts.contains(&"S2"), "{texts:?}");
}

#[test]
fn hidden_segment_is_not_drawn() {
    let mut scene = scene();
    let mut styles = BTreeMap::new();
    styles.insert(
        generate_track_id("S1", "S2"),
        TrackStyle {
            hidden: Some(true),
            ..Default::default()
        },
    );
    scene.apply_styles(styles);
    let (canvas, stats) = render(&scene, &[], None);
    assert_eq!(stats.segments, 0);
    assert!(canvas.lines().is_empty());
    // Stations are still shown.
    assert_eq!(stats.stations, 2);
}

#[test]
fn bad_train_is_skipped_without_aborting_frame() {
    let scene = scene();
    let trains = vec![
        Train::at("ghost", Point::new(f64::NAN, 10.0)),
        Train::at("t1", Point::new(200.0, 100.0)),
    ];
    let (_, stats) = render(&scene, &trains, None);
    assert_eq!(stats.trains, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.segments, 1);
}

#[test]
fn heading_draws_arrow_and_offscreen_trains_are_culled() {
    let scene = scene();
    let mut arrow = Train::at("t1", Point::new(200.0, 100.0));
    arrow.heading = Some(0.0);
    let far = Train::at("far", Point::new(5000.0, 5000.0));
    let (canvas, stats) = render(&scene, &[arrow, far], None);
    assert_eq!(stats.trains, 1);
    assert_eq!(canvas.ops.iter().filter(|op| matches!(op, Op::Polygon(3))).count(), 1);
}

#[test]
fn track_state_changes_stroke() {
    let mut scene = scene();
    scene.apply_track_states(vec![TrackStateReport {
        track_id: generate_track_id("S1", "S2"),
        state: TrackState::Closed,
    }]);
    let (canvas, _) = render(&scene, &[], None);
    assert!(canvas.lines()[0].dashed);

    scene.apply_track_states(vec![TrackStateReport {
        track_id: generate_track_id("S1", "S2"),
        state: TrackState::Occupied,
    }]);
    let (canvas, _) = render(&scene, &[], None);
    let lines = canvas.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].width > lines[1].width);
}

#[test]
fn selected_track_is_highlighted_last() {
    let scene = scene();
    let sel = Hit {
        kind: HitKind::Track,
        id: generate_track_id("S1", "S2"),
        distance_px: 0.0,
    };
    let (canvas, _) = render(&scene, &[], Some(&sel));
    assert_eq!(canvas.lines().len(), 3);
    assert!(matches!(canvas.ops.last(), Some(Op::Line(..))));
}

#[test]
fn labels_can_be_disabled() {
    let scene = scene();
    let mut canvas = RecordingCanvas::default();
    let opts = RenderOptions {
        show_labels: false,
        ..Default::default()
    };
    let stats = render_scene(&mut canvas, &scene, &[], &camera(), None, None, &opts).unwrap();
    assert_eq!(stats.labels, 0);
    assert!(canvas.texts().is_empty());
}

#[test]
fn invalid_camera_fails_the_frame() {
    let scene = scene();
    let mut cam = camera();
    cam.zoom = f64::NAN;
    let mut canvas = RecordingCanvas::default();
    assert!(render_scene(&mut canvas, &scene, &[], &cam, None, None, &RenderOptions::default()).is_err());
    assert!(canvas.ops.is_empty());
}

#[test]
fn frame_gate_debounces_identical_frames() {
    let key = FrameKey {
        scene_revision: 3,
        camera_revision: 7,
        hover: None,
        selection: None,
        anim_tick: 0,
        show_labels: true,
    };
    let mut gate = FrameGate::default();
    assert!(gate.needs_redraw(&key));
    gate.mark_drawn(key.clone());
    assert!(!gate.needs_redraw(&key));

    let moved = FrameKey {
        camera_revision: 8,
        ..key.clone()
    };
    assert!(gate.needs_redraw(&moved));

    gate.invalidate();
    assert!(gate.needs_redraw(&key));
}

#[test]
fn label_toggle_redraws_during_animation() {
    let mut gate = FrameGate::default();
    let labelled = FrameKey {
        scene_revision: 1,
        camera_revision: 1,
        hover: None,
        selection: None,
        anim_tick: 4,
        show_labels: true,
    };
    gate.mark_drawn(labelled.clone());
    let unlabelled = FrameKey {
        anim_tick: 5,
        show_labels: false,
        ..labelled.clone()
    };
    assert!(gate.needs_redraw(&unlabelled));
    gate.mark_drawn(unlabelled.clone());
    assert!(gate.needs_redraw(&FrameKey {
        show_labels: true,
        ..unlabelled
    }));
}

#[test]
fn svg_output_escapes_station_names() {
    let mut scene = SceneModel::new(NetworkConfig::default()).unwrap();
    scene.apply_topology(
        vec![
            Station::new("Bank & Monument", Point::new(50.0, 50.0)),
            Station::new("<Depot>", Point::new(150.0, 50.0)),
        ],
        vec![],
        vec![TrackSegment::between("Bank & Monument", "<Depot>")],
    );
    let mut canvas = SvgCanvas::new(400.0, 200.0, Rgb::WHITE);
    render_scene(&mut canvas, &scene, &[], &camera(), None, None, &RenderOptions::default()).unwrap();
    let svg = canvas.finish();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Bank &amp; Monument"));
    assert!(svg.contains("&lt;Depot&gt;"));
    assert!(svg.contains("<line"));
    assert!(svg.contains(r##"stroke="#808080""##));
}
