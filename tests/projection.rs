use transitmap::MapError;
use transitmap::geometry::Point;
use transitmap::projection::{Camera, CanvasSize, Projector, project, unproject};

fn canvas() -> CanvasSize {
    CanvasSize::new(800.0, 600.0)
}

#[test]
fn project_unproject_round_trip() {
    let cam = Camera::new(Point::new(120.0, -40.0), 2.5, canvas()).unwrap();
    for w in [Point::new(0.0, 0.0), Point::new(-310.5, 77.25), Point::new(1e4, -3e3)] {
        let s = project(w, &cam).unwrap();
        let back = unproject(s, &cam).unwrap();
        assert!((back.x - w.x).abs() < 1e-9, "{back:?} vs {w:?}");
        assert!((back.y - w.y).abs() < 1e-9, "{back:?} vs {w:?}");
    }
}

#[test]
fn project_applies_zoom_then_pan() {
    let cam = Camera::new(Point::new(10.0, 20.0), 2.0, canvas()).unwrap();
    assert_eq!(project(Point::new(5.0, 5.0), &cam).unwrap(), Point::new(20.0, 30.0));
}

#[test]
fn zero_or_non_finite_zoom_is_a_configuration_error() {
    for zoom in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = Camera::new(Point::ZERO, zoom, canvas()).unwrap_err();
        assert!(matches!(err, MapError::Configuration(_)), "zoom {zoom}: {err}");
    }

    // A camera mutated into a bad state is rejected at projection time too.
    let mut cam = Camera::new(Point::ZERO, 1.0, canvas()).unwrap();
    cam.zoom = 0.0;
    assert!(matches!(project(Point::ZERO, &cam), Err(MapError::Configuration(_))));
    assert!(matches!(unproject(Point::ZERO, &cam), Err(MapError::Configuration(_))));
    assert!(Projector::new(&cam).is_err());
}

#[test]
fn visible_world_covers_canvas() {
    let cam = Camera::new(Point::new(400.0, 300.0), 2.0, canvas()).unwrap();
    let r = cam.visible_world().unwrap();
    assert_eq!(r.min, Point::new(-200.0, -150.0));
    assert_eq!(r.max, Point::new(200.0, 150.0));
    assert_eq!(cam.center_world().unwrap(), Point::ZERO);
}

#[test]
fn world_len_scales_inversely_with_zoom() {
    let cam = Camera::new(Point::ZERO, 4.0, canvas()).unwrap();
    let p = Projector::new(&cam).unwrap();
    assert_eq!(p.world_len(10.0), 2.5);
}
