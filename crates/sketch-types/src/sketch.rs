use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::debug;

use crate::error::GeometryError;
use crate::geometry::*;
use crate::param::{Param, ParamId};

// ── Identifiers ─────────────────────────────────────────────────────────────

/// Persisted identifier of a sketch object. Constraint records refer to
/// objects by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static CONSTRAINT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Debug identity of a live constraint instance. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u64);

impl ConstraintId {
    /// Allocate the next process-wide id.
    pub fn next() -> Self {
        Self(CONSTRAINT_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Objects ─────────────────────────────────────────────────────────────────

/// A geometric object stored in a sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchObject {
    pub id: ObjectId,
    pub geometry: Geometry,
    /// The modifier constraint that exclusively writes this object, if any.
    /// A non-owning back reference.
    pub managed_by: Option<ConstraintId>,
}

/// Arena of parameters plus the objects built on top of them.
#[derive(Debug, Clone, Default)]
pub struct Sketch {
    params: SlotMap<ParamId, Param>,
    objects: BTreeMap<ObjectId, SketchObject>,
    next_object: u32,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Parameters ──────────────────────────────────────────────────────

    pub fn add_param(&mut self, param: Param) -> ParamId {
        self.params.insert(param)
    }

    pub fn remove_param(&mut self, id: ParamId) -> Option<Param> {
        self.params.remove(id)
    }

    pub fn param(&self, id: ParamId) -> Option<&Param> {
        self.params.get(id)
    }

    pub fn param_mut(&mut self, id: ParamId) -> Option<&mut Param> {
        self.params.get_mut(id)
    }

    /// Current value of a parameter; NaN for a handle that is not in this
    /// sketch.
    pub fn value(&self, id: ParamId) -> f64 {
        self.params.get(id).map_or(f64::NAN, |p| p.value)
    }

    pub fn set_value(&mut self, id: ParamId, value: f64) {
        if let Some(p) = self.params.get_mut(id) {
            p.value = value;
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    // ── Object creation ─────────────────────────────────────────────────

    fn insert(&mut self, geometry: Geometry) -> ObjectId {
        self.next_object += 1;
        let id = ObjectId(self.next_object);
        self.objects.insert(
            id,
            SketchObject {
                id,
                geometry,
                managed_by: None,
            },
        );
        id
    }

    pub fn add_point(&mut self, x: f64, y: f64) -> ObjectId {
        let x = self.add_param(Param::new(x, "x"));
        let y = self.add_param(Param::new(y, "y"));
        self.insert(Geometry::Point(Point { x, y }))
    }

    /// Create a segment between two existing points. The angle and length
    /// parameters are initialized from the points' current positions.
    pub fn add_segment_between(&mut self, a: ObjectId, b: ObjectId) -> Result<ObjectId, GeometryError> {
        let d = self.position(b)? - self.position(a)?;
        let ang = self.add_param(Param::new(normalize_radians(d.y.atan2(d.x)), "ang"));
        let t = self.add_param(Param::new(d.norm(), "t"));
        Ok(self.insert(Geometry::Segment(Segment { a, b, ang, t })))
    }

    /// Create a segment together with its two endpoint objects.
    pub fn add_segment(&mut self, from: (f64, f64), to: (f64, f64)) -> ObjectId {
        let a = self.add_point(from.0, from.1);
        let b = self.add_point(to.0, to.1);
        let ang = self.add_param(Param::new(
            normalize_radians((to.1 - from.1).atan2(to.0 - from.0)),
            "ang",
        ));
        let t = self.add_param(Param::new((to.0 - from.0).hypot(to.1 - from.1), "t"));
        self.insert(Geometry::Segment(Segment { a, b, ang, t }))
    }

    pub fn add_circle(&mut self, center: (f64, f64), radius: f64) -> ObjectId {
        let c = self.add_point(center.0, center.1);
        let r = self.add_param(Param::new(radius, "r"));
        self.insert(Geometry::Circle(Circle { c, r }))
    }

    /// Create an arc from its center, radius and start/end angles; the end
    /// points are placed on the circle.
    pub fn add_arc(&mut self, center: (f64, f64), radius: f64, ang1: f64, ang2: f64) -> ObjectId {
        let c = self.add_point(center.0, center.1);
        let a = self.add_point(center.0 + radius * ang1.cos(), center.1 + radius * ang1.sin());
        let b = self.add_point(center.0 + radius * ang2.cos(), center.1 + radius * ang2.sin());
        let r = self.add_param(Param::new(radius, "r"));
        let ang1 = self.add_param(Param::new(ang1, "ang1"));
        let ang2 = self.add_param(Param::new(ang2, "ang2"));
        self.insert(Geometry::Arc(Arc {
            a,
            b,
            c,
            r,
            ang1,
            ang2,
        }))
    }

    pub fn add_ellipse(&mut self, ep1: (f64, f64), ep2: (f64, f64), minor_radius: f64) -> ObjectId {
        let ep1 = self.add_point(ep1.0, ep1.1);
        let ep2 = self.add_point(ep2.0, ep2.1);
        let r = self.add_param(Param::new(minor_radius, "r"));
        self.insert(Geometry::Ellipse(Ellipse { ep1, ep2, r }))
    }

    pub fn add_bezier(
        &mut self,
        p0: (f64, f64),
        p1: (f64, f64),
        p2: (f64, f64),
        p3: (f64, f64),
    ) -> ObjectId {
        let p0 = self.add_point(p0.0, p0.1);
        let p1 = self.add_point(p1.0, p1.1);
        let p2 = self.add_point(p2.0, p2.1);
        let p3 = self.add_point(p3.0, p3.1);
        self.insert(Geometry::Bezier(BezierCurve { p0, p1, p2, p3 }))
    }

    /// Remove every object and parameter.
    pub fn clear(&mut self) {
        self.params.clear();
        self.objects.clear();
    }

    // ── Object access ───────────────────────────────────────────────────

    pub fn object(&self, id: ObjectId) -> Result<&SketchObject, GeometryError> {
        self.objects.get(&id).ok_or(GeometryError::UnknownObject(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SketchObject> {
        self.objects.values()
    }

    pub fn kind(&self, id: ObjectId) -> Result<ObjectKind, GeometryError> {
        Ok(self.object(id)?.geometry.kind())
    }

    fn wrong_kind(&self, id: ObjectId, expected: &'static str) -> GeometryError {
        match self.objects.get(&id) {
            Some(obj) => GeometryError::WrongKind {
                id,
                expected,
                found: obj.geometry.kind(),
            },
            None => GeometryError::UnknownObject(id),
        }
    }

    pub fn point(&self, id: ObjectId) -> Result<Point, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Point(p)) => Ok(p),
            _ => Err(self.wrong_kind(id, "point")),
        }
    }

    pub fn segment(&self, id: ObjectId) -> Result<Segment, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Segment(s)) => Ok(s),
            _ => Err(self.wrong_kind(id, "segment")),
        }
    }

    pub fn circle(&self, id: ObjectId) -> Result<Circle, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Circle(c)) => Ok(c),
            _ => Err(self.wrong_kind(id, "circle")),
        }
    }

    pub fn arc(&self, id: ObjectId) -> Result<Arc, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Arc(a)) => Ok(a),
            _ => Err(self.wrong_kind(id, "arc")),
        }
    }

    pub fn ellipse(&self, id: ObjectId) -> Result<Ellipse, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Ellipse(e)) => Ok(e),
            _ => Err(self.wrong_kind(id, "ellipse")),
        }
    }

    pub fn bezier(&self, id: ObjectId) -> Result<BezierCurve, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Bezier(b)) => Ok(b),
            _ => Err(self.wrong_kind(id, "bezier curve")),
        }
    }

    /// Center and radius of a circle or an arc.
    pub fn round(&self, id: ObjectId) -> Result<Round, GeometryError> {
        match self.objects.get(&id).map(|o| o.geometry) {
            Some(Geometry::Circle(c)) => Ok(Round { c: c.c, r: c.r }),
            Some(Geometry::Arc(a)) => Ok(Round { c: a.c, r: a.r }),
            _ => Err(self.wrong_kind(id, "circle or arc")),
        }
    }

    // ── Parameter enumeration ───────────────────────────────────────────

    /// Call `visit` once per parameter of the object, in the object's fixed
    /// visit order.
    pub fn visit_params(&self, id: ObjectId, visit: &mut dyn FnMut(ParamId)) -> Result<(), GeometryError> {
        match self.object(id)?.geometry {
            Geometry::Point(p) => {
                visit(p.x);
                visit(p.y);
            }
            Geometry::Segment(s) => {
                self.visit_params(s.a, visit)?;
                self.visit_params(s.b, visit)?;
                visit(s.ang);
                visit(s.t);
            }
            Geometry::Circle(c) => {
                self.visit_params(c.c, visit)?;
                visit(c.r);
            }
            Geometry::Arc(a) => {
                visit(a.r);
                visit(a.ang1);
                visit(a.ang2);
                self.visit_params(a.a, visit)?;
                self.visit_params(a.b, visit)?;
                self.visit_params(a.c, visit)?;
            }
            Geometry::Ellipse(e) => {
                self.visit_params(e.ep1, visit)?;
                self.visit_params(e.ep2, visit)?;
                visit(e.r);
            }
            Geometry::Bezier(b) => {
                self.visit_params(b.p0, visit)?;
                self.visit_params(b.p3, visit)?;
                self.visit_params(b.p1, visit)?;
                self.visit_params(b.p2, visit)?;
            }
        }
        Ok(())
    }

    // ── Current geometry values ─────────────────────────────────────────

    /// Current position of a point object.
    pub fn position(&self, id: ObjectId) -> Result<Vector2<f64>, GeometryError> {
        let p = self.point(id)?;
        Ok(Vector2::new(self.value(p.x), self.value(p.y)))
    }

    pub fn set_position(&mut self, id: ObjectId, pos: Vector2<f64>) -> Result<(), GeometryError> {
        let p = self.point(id)?;
        self.set_value(p.x, pos.x);
        self.set_value(p.y, pos.y);
        Ok(())
    }

    /// Normal and offset of a segment's supporting line, from the current
    /// `ang` and anchor values.
    pub fn line_frame(&self, id: ObjectId) -> Result<LineFrame, GeometryError> {
        let s = self.segment(id)?;
        let a = self.position(s.a)?;
        Ok(LineFrame::new(self.value(s.ang), a.x, a.y))
    }

    /// Current direction angle of a segment in degrees, wrapped to `[0, 360)`.
    pub fn segment_angle_deg(&self, id: ObjectId) -> Result<f64, GeometryError> {
        let s = self.segment(id)?;
        Ok(normalize_degrees(self.value(s.ang).to_degrees()))
    }

    /// Euclidean length between a segment's end points.
    pub fn segment_length(&self, id: ObjectId) -> Result<f64, GeometryError> {
        let s = self.segment(id)?;
        Ok((self.position(s.b)? - self.position(s.a)?).norm())
    }

    // ── Modifier ownership ──────────────────────────────────────────────

    pub fn managed_by(&self, id: ObjectId) -> Result<Option<ConstraintId>, GeometryError> {
        Ok(self.object(id)?.managed_by)
    }

    /// Mark every object in `ids` as managed by `owner`. Either all objects
    /// are claimed or none is: if any object is already owned the sketch is
    /// left untouched.
    pub fn claim(&mut self, ids: &[ObjectId], owner: ConstraintId) -> Result<(), GeometryError> {
        for &id in ids {
            if let Some(existing) = self.object(id)?.managed_by {
                return Err(GeometryError::AlreadyManaged { id, owner: existing });
            }
        }
        for id in ids {
            if let Some(obj) = self.objects.get_mut(id) {
                obj.managed_by = Some(owner);
            }
        }
        debug!(%owner, count = ids.len(), "claimed managed objects");
        Ok(())
    }

    /// Drop `owner`'s claim on the given objects. Objects owned by someone
    /// else are left alone.
    pub fn release(&mut self, ids: &[ObjectId], owner: ConstraintId) {
        for id in ids {
            if let Some(obj) = self.objects.get_mut(id) {
                if obj.managed_by == Some(owner) {
                    obj.managed_by = None;
                }
            }
        }
        debug!(%owner, count = ids.len(), "released managed objects");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn point_visits_x_then_y() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(1.0, 2.0);
        let point = sketch.point(p).unwrap();
        let mut order = Vec::new();
        sketch.visit_params(p, &mut |id| order.push(id)).unwrap();
        assert_eq!(order, vec![point.x, point.y]);
        assert_eq!(sketch.value(order[0]), 1.0);
        assert_eq!(sketch.value(order[1]), 2.0);
    }

    #[test]
    fn segment_initializes_angle_and_length() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((1.0, 1.0), (1.0, 4.0));
        let s = sketch.segment(seg).unwrap();
        assert_abs_diff_eq!(sketch.value(s.ang), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.value(s.t), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sketch.segment_angle_deg(seg).unwrap(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn segment_pointing_down_has_normalized_angle() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (0.0, -2.0));
        assert_abs_diff_eq!(sketch.segment_angle_deg(seg).unwrap(), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn segment_visit_order() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (3.0, 4.0));
        let s = sketch.segment(seg).unwrap();
        let a = sketch.point(s.a).unwrap();
        let b = sketch.point(s.b).unwrap();
        let mut order = Vec::new();
        sketch.visit_params(seg, &mut |id| order.push(id)).unwrap();
        assert_eq!(order, vec![a.x, a.y, b.x, b.y, s.ang, s.t]);
    }

    #[test]
    fn arc_visit_order_starts_with_radius_and_angles() {
        let mut sketch = Sketch::new();
        let arc = sketch.add_arc((0.0, 0.0), 2.0, 0.0, FRAC_PI_2);
        let a = sketch.arc(arc).unwrap();
        let mut order = Vec::new();
        sketch.visit_params(arc, &mut |id| order.push(id)).unwrap();
        assert_eq!(order.len(), 9);
        assert_eq!(&order[..3], &[a.r, a.ang1, a.ang2]);

        let end = sketch.position(a.b).unwrap();
        assert_abs_diff_eq!(end.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(end.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn bezier_visits_end_points_first() {
        let mut sketch = Sketch::new();
        let curve = sketch.add_bezier((0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0));
        let b = sketch.bezier(curve).unwrap();
        let mut order = Vec::new();
        sketch.visit_params(curve, &mut |id| order.push(id)).unwrap();
        let p3 = sketch.point(b.p3).unwrap();
        assert_eq!(order[2], p3.x);
        assert_eq!(order[3], p3.y);
    }

    #[test]
    fn typed_access_reports_wrong_kind() {
        let mut sketch = Sketch::new();
        let c = sketch.add_circle((0.0, 0.0), 1.0);
        let err = sketch.segment(c).unwrap_err();
        assert_eq!(
            err,
            GeometryError::WrongKind {
                id: c,
                expected: "segment",
                found: ObjectKind::Circle
            }
        );
        assert_eq!(
            sketch.point(ObjectId(999)).unwrap_err(),
            GeometryError::UnknownObject(ObjectId(999))
        );
    }

    #[test]
    fn round_accepts_circles_and_arcs() {
        let mut sketch = Sketch::new();
        let c = sketch.add_circle((0.0, 0.0), 1.0);
        let a = sketch.add_arc((0.0, 0.0), 1.0, 0.0, 1.0);
        let p = sketch.add_point(0.0, 0.0);
        assert!(sketch.round(c).is_ok());
        assert!(sketch.round(a).is_ok());
        assert!(sketch.round(p).is_err());
    }

    #[test]
    fn claim_is_all_or_nothing() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(1.0, 0.0);
        let first = ConstraintId::next();
        let second = ConstraintId::next();

        sketch.claim(&[p2], first).unwrap();
        let err = sketch.claim(&[p1, p2], second).unwrap_err();
        assert_eq!(err, GeometryError::AlreadyManaged { id: p2, owner: first });
        assert_eq!(sketch.managed_by(p1).unwrap(), None);
        assert_eq!(sketch.managed_by(p2).unwrap(), Some(first));

        sketch.release(&[p1, p2], second);
        assert_eq!(sketch.managed_by(p2).unwrap(), Some(first));
        sketch.release(&[p2], first);
        assert_eq!(sketch.managed_by(p2).unwrap(), None);
    }

    #[test]
    fn value_of_foreign_param_is_nan() {
        let mut other = Sketch::new();
        let foreign = other.add_param(Param::new(1.0, "x"));
        let sketch = Sketch::new();
        assert!(sketch.value(foreign).is_nan());
    }
}
