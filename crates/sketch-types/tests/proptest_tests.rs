//! Property-based tests for sketch geometry invariants.

use nalgebra::Vector2;
use proptest::prelude::*;

use sketch_types::{normalize_degrees, normalize_radians, LineFrame, Reflection, Sketch};

fn arb_coord() -> impl Strategy<Value = f64> {
    -1000.0f64..1000.0
}

fn arb_angle() -> impl Strategy<Value = f64> {
    -20.0f64..20.0
}

const TOL: f64 = 1e-6;

proptest! {
    #[test]
    fn normalized_radians_stay_in_range(a in arb_angle()) {
        let n = normalize_radians(a);
        prop_assert!((0.0..std::f64::consts::TAU).contains(&n));
        prop_assert!((a.sin() - n.sin()).abs() < 1e-9);
        prop_assert!((a.cos() - n.cos()).abs() < 1e-9);
    }

    #[test]
    fn normalized_degrees_stay_in_range(a in -5000.0f64..5000.0) {
        let n = normalize_degrees(a);
        prop_assert!((0.0..360.0).contains(&n));
    }

    #[test]
    fn anchor_lies_on_its_line(ang in arb_angle(), ax in arb_coord(), ay in arb_coord()) {
        let f = LineFrame::new(ang, ax, ay);
        prop_assert!(f.signed_distance(ax, ay).abs() < TOL);
        prop_assert!((f.nx * f.nx + f.ny * f.ny - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reflection_preserves_distance_to_axis(
        (ax, ay) in (arb_coord(), arb_coord()),
        (dx, dy) in (1.0f64..100.0, -100.0f64..100.0),
        (px, py) in (arb_coord(), arb_coord()),
    ) {
        let mut sketch = Sketch::new();
        let axis = sketch.add_segment((ax, ay), (ax + dx, ay + dy));
        let r = Reflection::across_segment(&sketch, axis).unwrap();
        let frame = sketch.line_frame(axis).unwrap();

        let p = Vector2::new(px, py);
        let q = r.apply(p);
        let dp = frame.signed_distance(p.x, p.y);
        let dq = frame.signed_distance(q.x, q.y);
        prop_assert!((dp + dq).abs() < 1e-6 * (1.0 + dp.abs()),
            "reflection should flip the signed distance: {} vs {}", dp, dq);
    }
}
