use sketch_types::{ObjectId, ParamId, Sketch};

use super::{fixed_objects, ConstraintKind, ScopeBuilder};
use crate::constants::{ConstantDef, ConstantType, Value};
use crate::error::ConstraintError;
use crate::polynomial::{Polynomial, TermFn::*};

fn segment_length(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [seg] = fixed_objects::<1>(ConstraintKind::SegmentLength, objects)?;
    Ok(Value::Number(sketch.segment_length(seg)?))
}

fn radius(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [round] = fixed_objects::<1>(ConstraintKind::RadiusLength, objects)?;
    Ok(Value::Number(sketch.value(sketch.round(round)?.r)))
}

pub(super) const SEGMENT_LENGTH: &[ConstantDef] = &[ConstantDef {
    name: "length",
    ty: ConstantType::Number,
    description: "length of the segment",
    read_only: false,
    initial: segment_length,
    transform: None,
}];

pub(super) const RADIUS_LENGTH: &[ConstantDef] = &[ConstantDef {
    name: "length",
    ty: ConstantType::Number,
    description: "length of the radius",
    read_only: false,
    initial: radius,
    transform: None,
}];

pub(super) fn scope_segment_length(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [seg] = fixed_objects::<1>(kind, objects)?;
    let t = scope.sketch().segment(seg)?.t;
    scope.visit(t);
    Ok(())
}

pub(super) fn scope_radius_length(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [round] = fixed_objects::<1>(kind, objects)?;
    let r = scope.sketch().round(round)?.r;
    scope.visit(r);
    Ok(())
}

pub(super) fn scope_equal_radius(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [c1, c2] = fixed_objects::<2>(kind, objects)?;
    let r1 = scope.sketch().round(c1)?.r;
    let r2 = scope.sketch().round(c2)?.r;
    scope.visit(r1);
    scope.visit(r2);
    Ok(())
}

pub(super) fn scope_equal_length(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [s1, s2] = fixed_objects::<2>(kind, objects)?;
    let t1 = scope.sketch().segment(s1)?.t;
    let t2 = scope.sketch().segment(s2)?.t;
    scope.visit(t1);
    scope.visit(t2);
    Ok(())
}

/// `p - value`
pub fn fixed_value(out: &mut Vec<Polynomial>, [p]: [ParamId; 1], value: f64) {
    out.push(Polynomial::new(-value).monomial(1.0).term(p, Identity));
}

/// `p1 - p2`
pub fn equal(out: &mut Vec<Polynomial>, [p1, p2]: [ParamId; 2]) {
    out.push(Polynomial::default().monomial(1.0).term(p1, Identity).monomial(-1.0).term(p2, Identity));
}
