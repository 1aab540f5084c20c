//! Point placement: coincidence, incidence, midpoint, symmetry, distances
//! and locking.

use sketch_types::{ObjectId, ParamId, Sketch};

use super::{fixed_objects, ConstraintKind, ScopeBuilder};
use crate::constants::{ConstantDef, ConstantType, Value};
use crate::error::ConstraintError;
use crate::polynomial::{Polynomial, TermFn::*};

// ── Constants ───────────────────────────────────────────────────────────────

fn point_distance(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [p1, p2] = fixed_objects::<2>(ConstraintKind::DistancePP, objects)?;
    Ok(Value::Number((sketch.position(p1)? - sketch.position(p2)?).norm()))
}

fn signed_line_distance(sketch: &Sketch, objects: &[ObjectId]) -> Result<f64, ConstraintError> {
    let [pt, seg] = fixed_objects::<2>(ConstraintKind::DistancePL, objects)?;
    let p = sketch.position(pt)?;
    Ok(sketch.line_frame(seg)?.signed_distance(p.x, p.y))
}

fn line_distance(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    Ok(Value::Number(signed_line_distance(sketch, objects)?.abs()))
}

fn line_side(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    Ok(Value::Flag(signed_line_distance(sketch, objects)? < 0.0))
}

fn locked_x(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [pt] = fixed_objects::<1>(ConstraintKind::LockPoint, objects)?;
    Ok(Value::Number(sketch.position(pt)?.x))
}

fn locked_y(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    let [pt] = fixed_objects::<1>(ConstraintKind::LockPoint, objects)?;
    Ok(Value::Number(sketch.position(pt)?.y))
}

pub(super) const DISTANCE_PP: &[ConstantDef] = &[ConstantDef {
    name: "distance",
    ty: ConstantType::Number,
    description: "the distance between two points",
    read_only: false,
    initial: point_distance,
    transform: None,
}];

pub(super) const DISTANCE_PL: &[ConstantDef] = &[
    ConstantDef {
        name: "distance",
        ty: ConstantType::Number,
        description: "the distance between the point and the line",
        read_only: false,
        initial: line_distance,
        transform: None,
    },
    ConstantDef {
        name: "inverted",
        ty: ConstantType::Boolean,
        description: "whether the point lies on the opposite side of the line",
        read_only: false,
        initial: line_side,
        transform: None,
    },
];

pub(super) const LOCK_POINT: &[ConstantDef] = &[
    ConstantDef {
        name: "x",
        ty: ConstantType::Number,
        description: "X coordinate",
        read_only: false,
        initial: locked_x,
        transform: None,
    },
    ConstantDef {
        name: "y",
        ty: ConstantType::Number,
        description: "Y coordinate",
        read_only: false,
        initial: locked_y,
        transform: None,
    },
];

// ── Scopes ──────────────────────────────────────────────────────────────────

/// `x1 y1 x2 y2`
pub(super) fn scope_pp(kind: ConstraintKind, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
    let [p1, p2] = fixed_objects::<2>(kind, objects)?;
    scope.sketch().point(p1)?;
    scope.sketch().point(p2)?;
    scope.visit_object(p1)?;
    scope.visit_object(p2)
}

/// `x y ax ay ang`
pub(super) fn scope_point_on_line(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [pt, seg] = fixed_objects::<2>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    scope.sketch().point(pt)?;
    scope.visit_object(pt)?;
    scope.visit_object(s.a)?;
    scope.visit(s.ang);
    Ok(())
}

/// `x y cx cy r`
pub(super) fn scope_point_on_circle(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [pt, circle] = fixed_objects::<2>(kind, objects)?;
    let round = scope.sketch().round(circle)?;
    scope.sketch().point(pt)?;
    scope.visit_object(pt)?;
    scope.visit_object(round.c)?;
    scope.visit(round.r);
    Ok(())
}

/// `ax ay x y bx by`, followed by `ang` for symmetry.
pub(super) fn scope_point_in_middle(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
    with_angle: bool,
) -> Result<(), ConstraintError> {
    let [pt, seg] = fixed_objects::<2>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    scope.sketch().point(pt)?;
    scope.visit_object(s.a)?;
    scope.visit_object(pt)?;
    scope.visit_object(s.b)?;
    if with_angle {
        scope.visit(s.ang);
    }
    Ok(())
}

/// `x y ang ax ay`
pub(super) fn scope_distance_pl(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [pt, seg] = fixed_objects::<2>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    scope.sketch().point(pt)?;
    scope.visit_object(pt)?;
    scope.visit(s.ang);
    scope.visit_object(s.a)
}

/// `x y`
pub(super) fn scope_lock_point(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [pt] = fixed_objects::<1>(kind, objects)?;
    scope.sketch().point(pt)?;
    scope.visit_object(pt)
}

// ── Residuals ───────────────────────────────────────────────────────────────

/// `x1 - x2`, `y1 - y2`
pub fn coincident(out: &mut Vec<Polynomial>, [x1, y1, x2, y2]: [ParamId; 4]) {
    out.push(Polynomial::default().monomial(1.0).term(x1, Identity).monomial(-1.0).term(x2, Identity));
    out.push(Polynomial::default().monomial(1.0).term(y1, Identity).monomial(-1.0).term(y2, Identity));
}

fn signed_distance_terms(p: Polynomial, [x, y, ax, ay, ang]: [ParamId; 5]) -> Polynomial {
    p.monomial(-1.0)
        .term(x, Identity)
        .term(ang, Sin)
        .monomial(1.0)
        .term(y, Identity)
        .term(ang, Cos)
        .monomial(1.0)
        .term(ax, Identity)
        .term(ang, Sin)
        .monomial(-1.0)
        .term(ay, Identity)
        .term(ang, Cos)
}

/// Signed distance of `(x, y)` from the line through `(ax, ay)` at `ang`.
pub fn point_on_line(out: &mut Vec<Polynomial>, params: [ParamId; 5]) {
    out.push(signed_distance_terms(Polynomial::default(), params));
}

/// `|p - c|² - r²`
pub fn point_on_circle(out: &mut Vec<Polynomial>, [x1, y1, x2, y2, r]: [ParamId; 5]) {
    out.push(
        Polynomial::default()
            .monomial(-1.0)
            .term(r, Square)
            .monomial(1.0)
            .term(x1, Square)
            .monomial(1.0)
            .term(x2, Square)
            .monomial(-2.0)
            .term(x1, Identity)
            .term(x2, Identity)
            .monomial(1.0)
            .term(y1, Square)
            .monomial(1.0)
            .term(y2, Square)
            .monomial(-2.0)
            .term(y1, Identity)
            .term(y2, Identity),
    );
}

/// `|a - p|² - |b - p|²` with `a = (x1, y1)`, `p = (x2, y2)`, `b = (x3, y3)`.
pub fn point_in_middle(out: &mut Vec<Polynomial>, [x1, y1, x2, y2, x3, y3]: [ParamId; 6]) {
    out.push(
        Polynomial::default()
            .monomial(1.0)
            .term(x1, Square)
            .monomial(-2.0)
            .term(x1, Identity)
            .term(x2, Identity)
            .monomial(1.0)
            .term(y1, Square)
            .monomial(-2.0)
            .term(y1, Identity)
            .term(y2, Identity)
            .monomial(-1.0)
            .term(x3, Square)
            .monomial(2.0)
            .term(x3, Identity)
            .term(x2, Identity)
            .monomial(-1.0)
            .term(y3, Square)
            .monomial(2.0)
            .term(y3, Identity)
            .term(y2, Identity),
    );
}

/// Equidistance from both end points, plus the point lying on the line
/// through `a` at `ang`.
pub fn symmetry(out: &mut Vec<Polynomial>, [x1, y1, x2, y2, x3, y3, ang]: [ParamId; 7]) {
    point_in_middle(out, [x1, y1, x2, y2, x3, y3]);
    point_on_line(out, [x2, y2, x1, y1, ang]);
}

/// `|p1 - p2|² - d²`
pub fn distance_pp(out: &mut Vec<Polynomial>, [x1, y1, x2, y2]: [ParamId; 4], distance: f64) {
    out.push(
        Polynomial::new(-distance * distance)
            .monomial(1.0)
            .term(x1, Square)
            .monomial(1.0)
            .term(x2, Square)
            .monomial(-2.0)
            .term(x1, Identity)
            .term(x2, Identity)
            .monomial(1.0)
            .term(y1, Square)
            .monomial(1.0)
            .term(y2, Square)
            .monomial(-2.0)
            .term(y1, Identity)
            .term(y2, Identity),
    );
}

/// Signed point/line distance minus `±distance`; the sign is frozen in
/// `inverted`.
pub fn distance_pl(out: &mut Vec<Polynomial>, [x, y, ang, ax, ay]: [ParamId; 5], distance: f64, inverted: bool) {
    let side = if inverted { -1.0 } else { 1.0 };
    out.push(signed_distance_terms(Polynomial::new(-side * distance), [x, y, ax, ay, ang]));
}

/// `px - x`, `py - y`
pub fn lock_point(out: &mut Vec<Polynomial>, [px, py]: [ParamId; 2], x: f64, y: f64) {
    out.push(Polynomial::new(-x).monomial(1.0).term(px, Identity));
    out.push(Polynomial::new(-y).monomial(1.0).term(py, Identity));
}
