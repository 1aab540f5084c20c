//! Reflection of geometry across a line, used by mirror modifiers.

use nalgebra::Vector2;

use crate::error::GeometryError;
use crate::geometry::{normalize_radians, Geometry};
use crate::sketch::{ObjectId, Sketch};

/// Reflection across the infinite line through `origin` with unit normal
/// `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflection {
    pub origin: Vector2<f64>,
    pub normal: Vector2<f64>,
}

impl Reflection {
    /// Reflection across the line through a segment's current end points.
    pub fn across_segment(sketch: &Sketch, segment: ObjectId) -> Result<Self, GeometryError> {
        let s = sketch.segment(segment)?;
        let a = sketch.position(s.a)?;
        let b = sketch.position(s.b)?;
        let d = b - a;
        let normal = Vector2::new(-d.y, d.x)
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| GeometryError::Degenerate(format!("mirror line {segment} has zero length")))?;
        Ok(Self { origin: a, normal })
    }

    pub fn apply(&self, p: Vector2<f64>) -> Vector2<f64> {
        let proj = self.normal.dot(&(p - self.origin));
        p - self.normal * (2.0 * proj)
    }
}

impl Sketch {
    fn reflect_point(&mut self, source: ObjectId, target: ObjectId, r: &Reflection) -> Result<Vector2<f64>, GeometryError> {
        let p = r.apply(self.position(source)?);
        self.set_position(target, p)?;
        Ok(p)
    }

    /// Overwrite `target` with the reflection of `source`. Both objects must
    /// be of the same kind. Arcs swap their end points so the mirrored arc
    /// stays counter-clockwise.
    pub fn mirror_into(&mut self, source: ObjectId, target: ObjectId, r: &Reflection) -> Result<(), GeometryError> {
        let src = self.object(source)?.geometry;
        let dst = self.object(target)?.geometry;
        match (src, dst) {
            (Geometry::Point(_), Geometry::Point(_)) => {
                self.reflect_point(source, target, r)?;
            }
            (Geometry::Segment(s), Geometry::Segment(d)) => {
                let a = self.reflect_point(s.a, d.a, r)?;
                let b = self.reflect_point(s.b, d.b, r)?;
                let dir = b - a;
                self.set_value(d.ang, normalize_radians(dir.y.atan2(dir.x)));
                self.set_value(d.t, self.value(s.t));
            }
            (Geometry::Circle(s), Geometry::Circle(d)) => {
                self.reflect_point(s.c, d.c, r)?;
                self.set_value(d.r, self.value(s.r));
            }
            (Geometry::Arc(s), Geometry::Arc(d)) => {
                let c = self.reflect_point(s.c, d.c, r)?;
                let a = self.reflect_point(s.b, d.a, r)?;
                let b = self.reflect_point(s.a, d.b, r)?;
                self.set_value(d.r, self.value(s.r));
                self.set_value(d.ang1, normalize_radians((a.y - c.y).atan2(a.x - c.x)));
                self.set_value(d.ang2, normalize_radians((b.y - c.y).atan2(b.x - c.x)));
            }
            (Geometry::Ellipse(s), Geometry::Ellipse(d)) => {
                self.reflect_point(s.ep1, d.ep1, r)?;
                self.reflect_point(s.ep2, d.ep2, r)?;
                self.set_value(d.r, self.value(s.r));
            }
            (Geometry::Bezier(s), Geometry::Bezier(d)) => {
                self.reflect_point(s.p0, d.p0, r)?;
                self.reflect_point(s.p1, d.p1, r)?;
                self.reflect_point(s.p2, d.p2, r)?;
                self.reflect_point(s.p3, d.p3, r)?;
            }
            (s, d) => {
                return Err(GeometryError::KindMismatch {
                    source_kind: s.kind(),
                    target_kind: d.kind(),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn y_axis(sketch: &mut Sketch) -> Reflection {
        let axis = sketch.add_segment((0.0, 0.0), (0.0, 10.0));
        Reflection::across_segment(sketch, axis).unwrap()
    }

    #[test]
    fn reflects_point_across_vertical_axis() {
        let mut sketch = Sketch::new();
        let r = y_axis(&mut sketch);
        let p = r.apply(Vector2::new(3.0, 5.0));
        assert_abs_diff_eq!(p.x, -3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn reflection_is_an_involution() {
        let mut sketch = Sketch::new();
        let axis = sketch.add_segment((1.0, 2.0), (4.0, 7.0));
        let r = Reflection::across_segment(&sketch, axis).unwrap();
        let p = Vector2::new(-2.5, 0.75);
        let back = r.apply(r.apply(p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn mirrored_segment_keeps_length_and_updates_angle() {
        let mut sketch = Sketch::new();
        let r = y_axis(&mut sketch);
        let src = sketch.add_segment((1.0, 0.0), (3.0, 0.0));
        let dst = sketch.add_segment((0.0, 0.0), (0.0, 0.0));
        sketch.mirror_into(src, dst, &r).unwrap();

        let d = sketch.segment(dst).unwrap();
        assert_abs_diff_eq!(sketch.value(d.t), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.value(d.ang), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.position(d.b).unwrap().x, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn mirrored_arc_swaps_end_points() {
        let mut sketch = Sketch::new();
        let r = y_axis(&mut sketch);
        let src = sketch.add_arc((2.0, 0.0), 1.0, 0.0, FRAC_PI_2);
        let dst = sketch.add_arc((0.0, 0.0), 0.5, 0.0, 0.1);
        sketch.mirror_into(src, dst, &r).unwrap();

        let d = sketch.arc(dst).unwrap();
        // source b = (2, 1) lands on target a = (-2, 1)
        let a = sketch.position(d.a).unwrap();
        assert_abs_diff_eq!(a.x, -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.value(d.ang1), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.value(d.ang2), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.value(d.r), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut sketch = Sketch::new();
        let r = y_axis(&mut sketch);
        let p = sketch.add_point(1.0, 1.0);
        let c = sketch.add_circle((1.0, 1.0), 1.0);
        assert!(matches!(
            sketch.mirror_into(p, c, &r),
            Err(GeometryError::KindMismatch { .. })
        ));
    }

    #[test]
    fn zero_length_mirror_line_is_degenerate() {
        let mut sketch = Sketch::new();
        let axis = sketch.add_segment((1.0, 1.0), (1.0, 1.0));
        assert!(matches!(
            Reflection::across_segment(&sketch, axis),
            Err(GeometryError::Degenerate(_))
        ));
    }
}
