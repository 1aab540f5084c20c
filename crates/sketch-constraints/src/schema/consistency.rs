//! Polar placement and the internal consistency constraints that tie a
//! segment's or arc's end points to its own `ang`/`t`/`r` parameters.

use sketch_types::{ObjectId, ParamId};

use super::{fixed_objects, ConstraintKind, ScopeBuilder};
use crate::error::ConstraintError;
use crate::polynomial::{Polynomial, TermFn, TermFn::*};

/// `ang t x1 y1 x2 y2` for `[segment, origin, target]`
pub(super) fn scope_polar(kind: ConstraintKind, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
    let [seg, origin, target] = fixed_objects::<3>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    scope.sketch().point(origin)?;
    scope.sketch().point(target)?;
    scope.visit(s.ang);
    scope.visit(s.t);
    scope.visit_object(origin)?;
    scope.visit_object(target)
}

/// Polar placement of a segment's own `b` from its `a`.
pub(super) fn scope_segment(kind: ConstraintKind, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
    let [seg] = fixed_objects::<1>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    scope.visit(s.ang);
    scope.visit(s.t);
    scope.visit_object(s.a)?;
    scope.visit_object(s.b)
}

/// The arc's full visit order.
pub(super) fn scope_arc(kind: ConstraintKind, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
    let [arc] = fixed_objects::<1>(kind, objects)?;
    scope.sketch().arc(arc)?;
    scope.visit_object(arc)
}

/// `x1 + t·cos(ang) - x2`, `y1 + t·sin(ang) - y2`
pub fn polar(out: &mut Vec<Polynomial>, [ang, t, x1, y1, x2, y2]: [ParamId; 6]) {
    out.push(
        Polynomial::default()
            .monomial(1.0)
            .term(x1, Identity)
            .monomial(1.0)
            .term(ang, Cos)
            .term(t, Identity)
            .monomial(-1.0)
            .term(x2, Identity),
    );
    out.push(
        Polynomial::default()
            .monomial(1.0)
            .term(y1, Identity)
            .monomial(1.0)
            .term(ang, Sin)
            .term(t, Identity)
            .monomial(-1.0)
            .term(y2, Identity),
    );
}

fn arc_end(out: &mut Vec<Polynomial>, end: ParamId, center: ParamId, r: ParamId, ang: ParamId, func: TermFn) {
    out.push(
        Polynomial::default()
            .monomial(-1.0)
            .term(end, Identity)
            .monomial(1.0)
            .term(center, Identity)
            .monomial(1.0)
            .term(r, Identity)
            .term(ang, func),
    );
}

/// End points on the circle at `ang1` and `ang2`.
pub fn arc_consistency(out: &mut Vec<Polynomial>, [r, ang1, ang2, ax, ay, bx, by, cx, cy]: [ParamId; 9]) {
    arc_end(out, ax, cx, r, ang1, Cos);
    arc_end(out, ay, cy, r, ang1, Sin);
    arc_end(out, bx, cx, r, ang2, Cos);
    arc_end(out, by, cy, r, ang2, Sin);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CompileSettings;
    use approx::assert_abs_diff_eq;
    use sketch_types::Sketch;

    fn residuals(sketch: &mut Sketch, kind: ConstraintKind, objects: &[ObjectId]) -> Vec<f64> {
        let mut scope = ScopeBuilder::new(sketch, CompileSettings::default());
        kind.define_params_scope(&mut scope, objects).unwrap();
        let (params, _) = scope.finish();
        let mut out = Vec::new();
        kind.collect_polynomials(&mut out, &params, &Default::default()).unwrap();
        out.iter().map(|p| p.evaluate(|id| sketch.value(id))).collect()
    }

    #[test]
    fn fresh_arc_is_consistent() {
        let mut sketch = Sketch::new();
        let arc = sketch.add_arc((1.0, -2.0), 3.0, 0.4, 2.2);
        for r in residuals(&mut sketch, ConstraintKind::ArcConsistency, &[arc]) {
            assert_abs_diff_eq!(r, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn segment_consistency_detects_drift() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((1.0, 1.0), (4.0, 5.0));
        for r in residuals(&mut sketch, ConstraintKind::SegmentConsistency, &[seg]) {
            assert_abs_diff_eq!(r, 0.0, epsilon = 1e-12);
        }

        let t = sketch.segment(seg).unwrap().t;
        sketch.set_value(t, 6.0);
        let r = residuals(&mut sketch, ConstraintKind::SegmentConsistency, &[seg]);
        // b moves by one unit along (0.6, 0.8)
        assert_abs_diff_eq!(r[0], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(r[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn polar_places_target() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (0.0, 2.0));
        let origin = sketch.add_point(1.0, 1.0);
        let target = sketch.add_point(1.0, 3.0);
        for r in residuals(&mut sketch, ConstraintKind::Polar, &[seg, origin, target]) {
            assert_abs_diff_eq!(r, 0.0, epsilon = 1e-12);
        }
    }
}
