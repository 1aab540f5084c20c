//! Line/circle tangency and fillets.
//!
//! Tangency is a single residual: the signed distance from the center to
//! the line equals the radius, with the side frozen in an `inverted` flag
//! measured when the constraint is created.

use sketch_types::{ObjectId, ParamId, Sketch};

use super::{fixed_objects, ConstraintKind, ScopeBuilder};
use crate::constants::{ConstantDef, ConstantType, Value};
use crate::error::ConstraintError;
use crate::polynomial::{Polynomial, TermFn::*};

/// Whether the center of `round` lies on the negative side of `seg`.
fn center_below(sketch: &Sketch, seg: ObjectId, round: ObjectId) -> Result<bool, ConstraintError> {
    let c = sketch.position(sketch.round(round)?.c)?;
    Ok(sketch.line_frame(seg)?.signed_distance(c.x, c.y) < 0.0)
}

fn tangent_side(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [seg, round] = fixed_objects::<2>(ConstraintKind::TangentLC, objects)?;
    center_below(sketch, seg, round).map(Value::Flag)
}

fn fillet_side_1(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [l1, _, arc] = fixed_objects::<3>(ConstraintKind::Fillet, objects)?;
    center_below(sketch, l1, arc).map(Value::Flag)
}

fn fillet_side_2(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [_, l2, arc] = fixed_objects::<3>(ConstraintKind::Fillet, objects)?;
    center_below(sketch, l2, arc).map(Value::Flag)
}

pub(super) const TANGENT_LC: &[ConstantDef] = &[ConstantDef {
    name: "inverted",
    ty: ConstantType::Boolean,
    description: "whether the circle is attached from the opposite side",
    read_only: false,
    initial: tangent_side,
    transform: None,
}];

pub(super) const FILLET: &[ConstantDef] = &[
    ConstantDef {
        name: "inverted1",
        ty: ConstantType::Boolean,
        description: "whether the arc touches the first line from the opposite side",
        read_only: false,
        initial: fillet_side_1,
        transform: None,
    },
    ConstantDef {
        name: "inverted2",
        ty: ConstantType::Boolean,
        description: "whether the arc touches the second line from the opposite side",
        read_only: false,
        initial: fillet_side_2,
        transform: None,
    },
];

fn visit_line(scope: &mut ScopeBuilder<'_>, seg: ObjectId) -> Result<(), ConstraintError> {
    let s = scope.sketch().segment(seg)?;
    scope.visit(s.ang);
    scope.visit_object(s.a)
}

/// `ang ax ay cx cy r`
pub(super) fn scope_tangent_lc(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [seg, round] = fixed_objects::<2>(kind, objects)?;
    let round = scope.sketch().round(round)?;
    visit_line(scope, seg)?;
    scope.visit_object(round.c)?;
    scope.visit(round.r);
    Ok(())
}

/// `ang1 ax1 ay1 ang2 ax2 ay2 cx cy r`
pub(super) fn scope_fillet(kind: ConstraintKind, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
    let [l1, l2, arc] = fixed_objects::<3>(kind, objects)?;
    let arc = scope.sketch().arc(arc)?;
    visit_line(scope, l1)?;
    visit_line(scope, l2)?;
    scope.visit_object(arc.c)?;
    scope.visit(arc.r);
    Ok(())
}

/// Signed distance from `(cx, cy)` to the line, minus `±r`.
pub fn tangent_lc([ang, ax, ay, cx, cy, r]: [ParamId; 6], inverted: bool) -> Polynomial {
    let side = if inverted { -1.0 } else { 1.0 };
    Polynomial::default()
        .monomial(-1.0)
        .term(cx, Identity)
        .term(ang, Sin)
        .monomial(1.0)
        .term(cy, Identity)
        .term(ang, Cos)
        .monomial(1.0)
        .term(ax, Identity)
        .term(ang, Sin)
        .monomial(-1.0)
        .term(ay, Identity)
        .term(ang, Cos)
        .monomial(-side)
        .term(r, Identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sketch_types::Param;

    #[test]
    fn circle_resting_on_line() {
        let mut sketch = Sketch::new();
        // line y = 0, circle at (3, 2) with r = 2
        let ps = [0.0, 0.0, 0.0, 3.0, 2.0, 2.0].map(|v| sketch.add_param(Param::new(v, "p")));
        let above = tangent_lc(ps, false);
        let below = tangent_lc(ps, true);
        assert_abs_diff_eq!(above.evaluate(|id| sketch.value(id)), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(below.evaluate(|id| sketch.value(id)), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn side_is_measured_from_geometry() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (10.0, 0.0));
        let up = sketch.add_circle((5.0, 1.0), 1.0);
        let down = sketch.add_circle((5.0, -1.0), 1.0);
        assert_eq!(tangent_side(&sketch, &[seg, up]).unwrap(), Value::Flag(false));
        assert_eq!(tangent_side(&sketch, &[seg, down]).unwrap(), Value::Flag(true));
    }

    #[test]
    fn fillet_scope_order() {
        let mut sketch = Sketch::new();
        let l1 = sketch.add_segment((0.0, 0.0), (10.0, 0.0));
        let l2 = sketch.add_segment((0.0, 0.0), (0.0, 10.0));
        let arc = sketch.add_arc((1.0, 1.0), 1.0, std::f64::consts::PI, 1.5 * std::f64::consts::PI);
        let s1 = sketch.segment(l1).unwrap();
        let a = sketch.arc(arc).unwrap();

        let mut scope = ScopeBuilder::new(&mut sketch, Default::default());
        scope_fillet(ConstraintKind::Fillet, &mut scope, &[l1, l2, arc]).unwrap();
        let (params, aux) = scope.finish();
        assert_eq!(params.len(), 9);
        assert!(aux.is_empty());
        assert_eq!(params[0], s1.ang);
        assert_eq!(params[8], a.r);
    }
}
