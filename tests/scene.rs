use std::collections::BTreeMap;

use transitmap::color::Rgb;
use transitmap::config::NetworkConfig;
use transitmap::geometry::Point;
use transitmap::model::{
    Line, Station, TrackSegment, TrackState, TrackStateReport, TrackStyle, Train,
};
use transitmap::scene::SceneModel;
use transitmap::style::generate_track_id;

fn line(id: &str, color: &str, stations: &[&str]) -> Line {
    Line {
        id: id.into(),
        name: format!("Line {id}"),
        color: color.into(),
        stations: stations.iter().map(|s| s.to_string()).collect(),
        width: None,
    }
}

fn network(lines: Vec<Line>, blacklist: &[&str]) -> NetworkConfig {
    NetworkConfig {
        lines,
        blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
        label_filters: vec![],
    }
}

fn scene_with(cfg: NetworkConfig, stations: Vec<Station>, segments: Vec<TrackSegment>) -> SceneModel {
    let mut scene = SceneModel::new(cfg).unwrap();
    let lines = scene.config().lines.clone();
    scene.apply_topology(stations, lines, segments);
    scene
}

fn two_stations() -> SceneModel {
    scene_with(
        network(vec![line("L1", "#00aa00", &["S1", "S2"])], &[]),
        vec![
            Station::new("S1", Point::new(0.0, 0.0)),
            Station::new("S2", Point::new(100.0, 0.0)),
        ],
        vec![TrackSegment::between("S1", "S2")],
    )
}

fn style(color: Option<&str>, hidden: Option<bool>) -> TrackStyle {
    TrackStyle {
        color: color.map(str::to_string),
        hidden,
        ..Default::default()
    }
}

#[test]
fn one_line_two_stations_yields_one_segment_in_line_color() {
    let scene = two_stations();
    let segs: Vec<_> = scene.visible_segments().collect();
    assert_eq!(segs.len(), 1);
    let seg = segs[0];
    assert_eq!(seg.track_id, generate_track_id("S1", "S2"));
    assert_eq!(seg.color, Rgb(0, 0xaa, 0));
    assert_eq!(seg.width, 3.0);
    assert_eq!(seg.line_id.as_deref(), Some("L1"));
    assert_eq!(seg.a, Point::new(0.0, 0.0));
    assert_eq!(seg.b, Point::new(100.0, 0.0));
    assert!(!seg.overridden);
}

#[test]
fn override_color_wins_over_line_color() {
    let mut scene = scene_with(
        network(vec![line("L1", "red", &["S1", "S2"])], &[]),
        vec![
            Station::new("S1", Point::new(0.0, 0.0)),
            Station::new("S2", Point::new(100.0, 0.0)),
        ],
        vec![TrackSegment::between("S2", "S1")],
    );
    assert_eq!(scene.derived_segments()[0].color, Rgb(255, 0, 0));

    let mut styles = BTreeMap::new();
    styles.insert(generate_track_id("S1", "S2"), style(Some("blue"), None));
    scene.apply_styles(styles);
    let seg = &scene.derived_segments()[0];
    assert_eq!(seg.color, Rgb(0, 0, 255));
    assert!(seg.overridden);
}

#[test]
fn unparsable_override_color_falls_back_to_line() {
    let mut scene = two_stations();
    let mut styles = BTreeMap::new();
    styles.insert(generate_track_id("S1", "S2"), style(Some("not-a-color"), None));
    scene.apply_styles(styles);
    assert_eq!(scene.derived_segments()[0].color, Rgb(0, 0xaa, 0));
}

#[test]
fn hidden_override_removes_segment_from_render_set() {
    let mut scene = two_stations();
    let id = generate_track_id("S2", "S1");
    let mut styles = BTreeMap::new();
    styles.insert(id.clone(), style(None, Some(true)));
    scene.apply_styles(styles);

    assert_eq!(scene.visible_segments().count(), 0);
    // Topology still has it, and the editor can still find it.
    assert_eq!(scene.segments().len(), 1);
    assert!(scene.segment(&id).unwrap().hidden);
}

#[test]
fn blacklisted_endpoint_drops_segment() {
    let stations = vec![
        Station::new("S1", Point::new(0.0, 0.0)),
        Station::new("S2", Point::new(100.0, 0.0)),
        Station::new("Depot", Point::new(50.0, 50.0)),
    ];
    let segments = vec![
        TrackSegment::between("S1", "S2"),
        TrackSegment::between("S2", "Depot"),
    ];
    let scene = scene_with(network(vec![], &["Depot"]), stations.clone(), segments.clone());
    let ids: Vec<_> = scene.visible_segments().map(|s| s.track_id.clone()).collect();
    assert_eq!(ids, vec![generate_track_id("S1", "S2")]);
    assert!(scene.station("Depot").is_none());
    assert!(scene.station("S2").is_some());

    // Both endpoints blacklisted.
    let scene = scene_with(network(vec![], &["S1", "S2"]), stations, segments);
    assert_eq!(scene.visible_segments().count(), 0);
    assert_eq!(scene.derived_stations().count(), 1);
}

#[test]
fn feed_blacklist_flag_is_honoured() {
    let mut depot = Station::new("Depot", Point::new(5.0, 5.0));
    depot.blacklisted = true;
    let scene = scene_with(
        network(vec![], &[]),
        vec![Station::new("S1", Point::new(0.0, 0.0)), depot],
        vec![TrackSegment::between("S1", "Depot")],
    );
    assert_eq!(scene.visible_segments().count(), 0);
    assert!(scene.station("Depot").is_none());
}

#[test]
fn applying_same_inputs_twice_is_idempotent() {
    let mut scene = two_stations();
    let first: Vec<_> = scene.derived_segments().to_vec();
    let stations = scene.stations().to_vec();
    let lines = scene.lines().to_vec();
    let segments = scene.segments().to_vec();
    let rev = scene.revision();
    scene.apply_topology(stations, lines, segments);
    assert_eq!(scene.derived_segments(), first.as_slice());
    assert!(scene.revision() > rev);
}

#[test]
fn duplicate_and_reversed_segments_are_merged() {
    let scene = scene_with(
        network(vec![], &[]),
        vec![
            Station::new("S1", Point::new(0.0, 0.0)),
            Station::new("S2", Point::new(10.0, 0.0)),
        ],
        vec![TrackSegment::between("S1", "S2"), TrackSegment::between("S2", "S1")],
    );
    assert_eq!(scene.derived_segments().len(), 1);
    // No serving line configured: neutral grey.
    assert_eq!(scene.derived_segments()[0].color, Rgb::NEUTRAL);
}

#[test]
fn station_positions_come_from_segment_endpoints() {
    let mut seg = TrackSegment::between("A", "B");
    seg.from_pos = Some(Point::new(1.0, 2.0));
    seg.to_pos = Some(Point::new(3.0, 4.0));
    let scene = scene_with(
        network(vec![], &[]),
        vec![Station {
            name: "A".into(),
            pos: None,
            blacklisted: false,
        }],
        vec![seg],
    );
    assert_eq!(scene.station("A").unwrap().pos, Point::new(1.0, 2.0));
    assert_eq!(scene.station("B").unwrap().pos, Point::new(3.0, 4.0));
    assert_eq!(scene.visible_segments().count(), 1);
}

#[test]
fn segment_with_unplaced_endpoint_is_dropped() {
    let scene = scene_with(
        network(vec![], &[]),
        vec![Station::new("A", Point::new(0.0, 0.0))],
        vec![TrackSegment::between("A", "Nowhere")],
    );
    assert_eq!(scene.derived_segments().len(), 0);
}

#[test]
fn explicit_segment_line_wins() {
    let mut seg = TrackSegment::between("S1", "S2");
    seg.line = Some("L2".into());
    let scene = scene_with(
        network(
            vec![line("L1", "#ff0000", &["S1", "S2"]), line("L2", "#0000ff", &["S1", "S2"])],
            &[],
        ),
        vec![
            Station::new("S1", Point::new(0.0, 0.0)),
            Station::new("S2", Point::new(1.0, 0.0)),
        ],
        vec![seg],
    );
    assert_eq!(scene.derived_segments()[0].color, Rgb(0, 0, 255));
    assert!(scene.station("S1").unwrap().is_interchange());
}

#[test]
fn track_states_are_attached_by_track_id() {
    let mut scene = two_stations();
    scene.apply_track_states(vec![TrackStateReport {
        track_id: generate_track_id("S2", "S1"),
        state: TrackState::Closed,
    }]);
    assert_eq!(scene.derived_segments()[0].state, TrackState::Closed);
    scene.apply_track_states(vec![]);
    assert_eq!(scene.derived_segments()[0].state, TrackState::Open);
}

#[test]
fn label_filters_suppress_station_labels() {
    let mut cfg = network(vec![], &[]);
    cfg.label_filters = vec!["Siding".into()];
    let scene = scene_with(
        cfg,
        vec![
            Station::new("North Siding 2", Point::new(0.0, 0.0)),
            Station::new("Central", Point::new(1.0, 0.0)),
        ],
        vec![],
    );
    assert!(!scene.station("North Siding 2").unwrap().show_label);
    assert!(scene.station("Central").unwrap().show_label);
    // The filtered station keeps its marker.
    assert_eq!(scene.derived_stations().count(), 2);
}

#[test]
fn trains_interpolate_only_for_stable_ids_and_small_jumps() {
    let mut scene = two_stations();
    scene.apply_live_entities(
        vec![Train::at("t1", Point::new(0.0, 0.0)), Train::at("t2", Point::new(0.0, 0.0))],
        vec![],
    );
    scene.apply_live_entities(
        vec![
            Train::at("t1", Point::new(10.0, 0.0)),
            Train::at("t2", Point::new(1000.0, 0.0)),
            Train::at("t3", Point::new(5.0, 5.0)),
        ],
        vec![],
    );
    let at = scene.trains_at(0.5, 200.0);
    assert_eq!(at[0].pos, Point::new(5.0, 0.0));
    assert_eq!(at[1].pos, Point::new(1000.0, 0.0));
    assert_eq!(at[2].pos, Point::new(5.0, 5.0));
    // Alpha is clamped.
    assert_eq!(scene.trains_at(3.0, 200.0)[0].pos, Point::new(10.0, 0.0));
}

#[test]
fn bounds_cover_visible_stations() {
    let scene = two_stations();
    let b = scene.bounds().unwrap();
    assert_eq!(b.min, Point::new(0.0, 0.0));
    assert_eq!(b.max, Point::new(100.0, 0.0));
}

#[test]
fn invalid_network_config_is_rejected() {
    let cfg = network(vec![line("L1", "#00ff00", &[]), line("L1", "#0000ff", &[])], &[]);
    assert!(SceneModel::new(cfg).is_err());
}
