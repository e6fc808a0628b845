use transitmap::camera::{Gesture, ViewportController, ZoomLimits};
use transitmap::error::MapError;
use transitmap::geometry::{Point, Rect};
use transitmap::projection::CanvasSize;

fn close(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
}

fn controller() -> ViewportController {
    ViewportController::new(CanvasSize::new(800.0, 600.0), ZoomLimits::new(0.1, 10.0).unwrap(), None)
        .unwrap()
}

#[test]
fn wheel_zoom_keeps_world_point_under_cursor() {
    let mut vc = controller();
    vc.pan_by(35.0, -12.0);
    let anchor = Point::new(613.0, 144.0);
    let before = vc.screen_to_world(anchor);
    vc.wheel(240.0, anchor);
    assert!(vc.zoom() > 1.0);
    assert!(close(vc.screen_to_world(anchor), before));
    vc.wheel(-500.0, anchor);
    assert!(close(vc.screen_to_world(anchor), before));
}

#[test]
fn zoom_is_clamped_to_limits() {
    let mut vc = controller();
    for _ in 0..50 {
        vc.zoom_by(2.0, Point::new(400.0, 300.0));
    }
    assert_eq!(vc.zoom(), 10.0);
    for _ in 0..50 {
        vc.wheel(-5000.0, Point::new(10.0, 10.0));
    }
    assert_eq!(vc.zoom(), 0.1);
}

#[test]
fn invalid_zoom_steps_are_ignored() {
    let mut vc = controller();
    let rev = vc.revision();
    vc.zoom_by(0.0, Point::new(1.0, 1.0));
    vc.zoom_by(f64::NAN, Point::new(1.0, 1.0));
    vc.zoom_by(2.0, Point::new(f64::NAN, 1.0));
    assert_eq!(vc.zoom(), 1.0);
    assert_eq!(vc.revision(), rev);
}

#[test]
fn invalid_limits_are_rejected() {
    assert!(ZoomLimits::new(0.0, 2.0).is_err());
    assert!(ZoomLimits::new(3.0, 2.0).is_err());
    assert!(ZoomLimits::new(0.5, f64::INFINITY).is_err());
    let bad = ZoomLimits { min: -1.0, max: 2.0 };
    assert!(ViewportController::new(CanvasSize::new(10.0, 10.0), bad, None).is_err());
}

#[test]
fn drag_pans_by_pointer_delta() {
    let mut vc = controller();
    let start = vc.screen_to_world(Point::new(100.0, 100.0));
    vc.pointer_down(Point::new(100.0, 100.0));
    assert!(matches!(vc.gesture(), Gesture::Panning { .. }));
    vc.pointer_move(Point::new(130.0, 90.0));
    vc.pointer_move(Point::new(150.0, 80.0));
    vc.pointer_up();
    assert_eq!(vc.gesture(), Gesture::Idle);
    assert_eq!(vc.camera().pan, Point::new(50.0, -20.0));
    // The grabbed world point followed the pointer.
    assert!(close(vc.screen_to_world(Point::new(150.0, 80.0)), start));

    // Moves without a pressed pointer do nothing.
    vc.pointer_move(Point::new(500.0, 500.0));
    assert_eq!(vc.camera().pan, Point::new(50.0, -20.0));
}

#[test]
fn pan_is_unclamped_without_bounds() {
    let mut vc = controller();
    vc.pan_by(-1e6, 1e6);
    assert_eq!(vc.camera().pan, Point::new(-1e6, 1e6));
}

#[test]
fn pan_bounds_keep_centre_inside() {
    let bounds = Rect::from_min_max(Point::new(-100.0, -100.0), Point::new(100.0, 100.0));
    let mut vc =
        ViewportController::new(CanvasSize::new(800.0, 600.0), ZoomLimits::default(), Some(bounds)).unwrap();
    vc.pan_by(-5000.0, 0.0);
    let c = vc.screen_to_world(Point::new(400.0, 300.0));
    assert!(bounds.contains(c), "{c:?}");
    assert!((c.x - 100.0).abs() < 1e-9);

    vc.focus_on(Point::new(-900.0, 20.0), 2.0);
    let c = vc.screen_to_world(Point::new(400.0, 300.0));
    assert!(close(c, Point::new(-100.0, 20.0)), "{c:?}");
}

#[test]
fn focus_on_centres_point_at_clamped_zoom() {
    let mut vc = controller();
    vc.focus_on(Point::new(250.0, -75.0), 50.0);
    assert_eq!(vc.zoom(), 10.0);
    assert!(close(vc.world_to_screen(Point::new(250.0, -75.0)), Point::new(400.0, 300.0)));
}

#[test]
fn fit_to_frames_bounds_and_reset_returns_there() {
    let mut vc = controller();
    let bounds = Rect::from_min_max(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
    vc.fit_to(bounds);
    assert!(vc.has_home());
    let fitted = *vc.camera();
    let a = vc.world_to_screen(bounds.min);
    let b = vc.world_to_screen(bounds.max);
    assert!(a.x >= 0.0 && a.y >= 0.0 && b.x <= 800.0 && b.y <= 600.0);
    assert!(close(vc.world_to_screen(bounds.center()), Point::new(400.0, 300.0)));

    vc.pan_by(123.0, 45.0);
    vc.zoom_by(3.0, Point::new(10.0, 10.0));
    vc.reset();
    assert_eq!(*vc.camera(), fitted);
}

#[test]
fn reset_without_home_returns_to_origin() {
    let mut vc = controller();
    vc.pan_by(50.0, 50.0);
    vc.zoom_by(4.0, Point::new(0.0, 0.0));
    vc.reset();
    assert_eq!(vc.zoom(), 1.0);
    assert_eq!(vc.camera().pan, Point::ZERO);
}

#[test]
fn resize_keeps_centre_world_point() {
    let mut vc = controller();
    vc.focus_on(Point::new(42.0, 17.0), 3.0);
    vc.set_canvas_size(CanvasSize::new(1024.0, 400.0));
    assert!(close(vc.screen_to_world(Point::new(512.0, 200.0)), Point::new(42.0, 17.0)));
}

#[test]
fn revision_moves_on_camera_change() {
    let mut vc = controller();
    let r0 = vc.revision();
    vc.pan_by(1.0, 0.0);
    assert!(vc.revision() > r0);
    let r1 = vc.revision();
    vc.pan_by(0.0, 0.0);
    assert_eq!(vc.revision(), r1);
}

#[test]
fn malformed_pan_bounds_are_rejected_at_construction() {
    let canvas = CanvasSize::new(800.0, 600.0);
    let inverted = Rect::from_min_max(Point::new(10.0, 10.0), Point::new(-10.0, -10.0));
    let nan = Rect::from_min_max(Point::new(f64::NAN, 0.0), Point::new(10.0, 10.0));
    let infinite = Rect::from_min_max(Point::new(0.0, 0.0), Point::new(f64::INFINITY, 10.0));
    for bad in [inverted, nan, infinite] {
        let err = ViewportController::new(canvas, ZoomLimits::default(), Some(bad)).unwrap_err();
        assert!(matches!(err, MapError::Configuration(_)), "{bad:?}: {err}");
    }
    // A degenerate single-point rectangle is still usable.
    let point = Rect::from_min_max(Point::new(5.0, 5.0), Point::new(5.0, 5.0));
    let mut vc = ViewportController::new(canvas, ZoomLimits::default(), Some(point)).unwrap();
    vc.pan_by(40.0, -40.0);
    vc.zoom_by(2.0, Point::new(10.0, 10.0));
    assert!(close(vc.screen_to_world(Point::new(400.0, 300.0)), Point::new(5.0, 5.0)));
}

#[test]
fn zoom_anchor_holds_across_camera_states() {
    let limits = ZoomLimits::new(0.1, 10.0).unwrap();
    let setups: [(&str, fn(&mut ViewportController)); 5] = [
        ("initial", |_| {}),
        ("panned", |vc| vc.pan_by(-220.0, 87.5)),
        ("zoomed in", |vc| vc.zoom_by(6.0, Point::new(100.0, 500.0))),
        ("focused", |vc| vc.focus_on(Point::new(-3000.0, 1200.0), 0.25)),
        ("fitted", |vc| {
            vc.fit_to(Rect::from_min_max(Point::new(-50.0, 10.0), Point::new(950.0, 410.0)))
        }),
    ];
    let anchors = [
        Point::new(0.0, 0.0),
        Point::new(400.0, 300.0),
        Point::new(799.0, 12.0),
        Point::new(-40.0, 650.0),
    ];
    // The last factors overshoot both limits, so part of the step is absorbed.
    let factors = [1.1, 0.5, 3.0, 1000.0, 1e-4];
    for (name, setup) in setups {
        for anchor in anchors {
            for factor in factors {
                let mut vc = ViewportController::new(CanvasSize::new(800.0, 600.0), limits, None).unwrap();
                setup(&mut vc);
                let before = vc.screen_to_world(anchor);
                let expected = (vc.zoom() * factor).clamp(0.1, 10.0);
                vc.zoom_by(factor, anchor);
                assert!((vc.zoom() - expected).abs() < 1e-9, "{name} x{factor}: zoom {}", vc.zoom());
                let after = vc.screen_to_world(anchor);
                assert!(
                    (after.x - before.x).abs() < 1e-6 * before.x.abs().max(1.0)
                        && (after.y - before.y).abs() < 1e-6 * before.y.abs().max(1.0),
                    "{name} x{factor} at {anchor:?}: {before:?} -> {after:?}"
                );
            }
        }
    }
}
