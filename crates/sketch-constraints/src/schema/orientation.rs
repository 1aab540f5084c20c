//! Absolute and relative line angles, with the canonical-branch
//! specializations (vertical, horizontal, perpendicular, parallel).
//!
//! Angle constants are entered in degrees and resolved to radians. The
//! specializations freeze one of two canonical targets at creation, the
//! one nearest to the currently measured angle, and never revisit the
//! choice while solving.

use sketch_types::{normalize_degrees, ObjectId, ParamId, Sketch};

use super::{fixed_objects, ConstraintKind, ScopeBuilder};
use crate::constants::{ConstantDef, ConstantType, Value};
use crate::error::ConstraintError;
use crate::polynomial::{Polynomial, TermFn::*};

/// 90 or 270, whichever is nearer to `deg`. Ties go to 270.
pub fn nearest_vertical(deg: f64) -> f64 {
    if (270.0 - deg).abs() > (90.0 - deg).abs() {
        90.0
    } else {
        270.0
    }
}

/// 0 or 180, whichever is nearer to `deg` (360 counts as 0). Ties go to
/// 180.
pub fn nearest_horizontal(deg: f64) -> f64 {
    if (180.0 - deg).abs() > (360.0 - deg).abs().min(deg.abs()) {
        0.0
    } else {
        180.0
    }
}

// ── Constants ───────────────────────────────────────────────────────────────

fn segment_angle(kind: ConstraintKind, sketch: &Sketch, objects: &[ObjectId]) -> Result<f64, ConstraintError> {
    let [seg] = fixed_objects::<1>(kind, objects)?;
    Ok(sketch.segment_angle_deg(seg)?)
}

/// Counter-clockwise angle from the first segment to the second, in
/// degrees within `[0, 360)`.
fn relative_angle(kind: ConstraintKind, sketch: &Sketch, objects: &[ObjectId]) -> Result<f64, ConstraintError> {
    let [s1, s2] = fixed_objects::<2>(kind, objects)?;
    let a1 = sketch.value(sketch.segment(s1)?.ang);
    let a2 = sketch.value(sketch.segment(s2)?.ang);
    Ok(normalize_degrees((a2 - a1).to_degrees()))
}

fn measured_angle(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    segment_angle(ConstraintKind::Angle, sketch, objects).map(Value::Number)
}

fn vertical_angle(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    segment_angle(ConstraintKind::Vertical, sketch, objects).map(|a| Value::Number(nearest_vertical(a)))
}

fn horizontal_angle(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    segment_angle(ConstraintKind::Horizontal, sketch, objects).map(|a| Value::Number(nearest_horizontal(a)))
}

fn measured_between(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    relative_angle(ConstraintKind::AngleBetween, sketch, objects).map(Value::Number)
}

fn perpendicular_angle(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    relative_angle(ConstraintKind::Perpendicular, sketch, objects).map(|a| Value::Number(nearest_vertical(a)))
}

fn parallel_angle(sketch: &Sketch, objects: &[ObjectId]) -> Result<Value, ConstraintError> {
    relative_angle(ConstraintKind::Parallel, sketch, objects).map(|a| Value::Number(nearest_horizontal(a)))
}

fn wrapped_radians(deg: f64) -> f64 {
    (deg % 360.0).to_radians()
}

const fn angle_def(description: &'static str, read_only: bool, initial: crate::constants::Initializer) -> ConstantDef {
    ConstantDef {
        name: "angle",
        ty: ConstantType::Number,
        description,
        read_only,
        initial,
        transform: Some(f64::to_radians),
    }
}

pub(super) const ANGLE: &[ConstantDef] = &[ConstantDef {
    name: "angle",
    ty: ConstantType::Number,
    description: "line angle",
    read_only: false,
    initial: measured_angle,
    transform: Some(wrapped_radians),
}];

pub(super) const VERTICAL: &[ConstantDef] = &[angle_def("line angle", true, vertical_angle)];

pub(super) const HORIZONTAL: &[ConstantDef] = &[angle_def("line angle", true, horizontal_angle)];

pub(super) const ANGLE_BETWEEN: &[ConstantDef] = &[angle_def("angle between the lines", false, measured_between)];

pub(super) const PERPENDICULAR: &[ConstantDef] = &[angle_def("angle between the lines", true, perpendicular_angle)];

pub(super) const PARALLEL: &[ConstantDef] = &[angle_def("angle between the lines", true, parallel_angle)];

// ── Scopes ──────────────────────────────────────────────────────────────────

/// `ang`
pub(super) fn scope_angle(kind: ConstraintKind, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
    let [seg] = fixed_objects::<1>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    scope.visit(s.ang);
    Ok(())
}

/// `ang1 ang2`
pub(super) fn scope_angle_between(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [s1, s2] = fixed_objects::<2>(kind, objects)?;
    let a1 = scope.sketch().segment(s1)?.ang;
    let a2 = scope.sketch().segment(s2)?.ang;
    scope.visit(a1);
    scope.visit(a2);
    Ok(())
}

// ── Residuals ───────────────────────────────────────────────────────────────

/// `ang - angle`
pub fn angle(out: &mut Vec<Polynomial>, [ang]: [ParamId; 1], angle: f64) {
    out.push(Polynomial::new(-angle).monomial(1.0).term(ang, Identity));
}

/// `ang2 - ang1 - angle`
pub fn angle_between(out: &mut Vec<Polynomial>, [ang1, ang2]: [ParamId; 2], angle: f64) {
    out.push(
        Polynomial::new(-angle)
            .monomial(1.0)
            .term(ang2, Identity)
            .monomial(-1.0)
            .term(ang1, Identity),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn vertical_branch_selection() {
        assert_eq!(nearest_vertical(80.0), 90.0);
        assert_eq!(nearest_vertical(175.0), 90.0);
        assert_eq!(nearest_vertical(185.0), 270.0);
        assert_eq!(nearest_vertical(300.0), 270.0);
        assert_eq!(nearest_vertical(0.0), 90.0);
        assert_eq!(nearest_vertical(180.0), 270.0);
    }

    #[test]
    fn horizontal_branch_selection() {
        assert_eq!(nearest_horizontal(10.0), 0.0);
        assert_eq!(nearest_horizontal(350.0), 0.0);
        assert_eq!(nearest_horizontal(170.0), 180.0);
        assert_eq!(nearest_horizontal(260.0), 180.0);
        assert_eq!(nearest_horizontal(90.0), 180.0);
    }

    #[test]
    fn parallel_picks_zero_for_same_direction() {
        let mut sketch = Sketch::new();
        let s1 = sketch.add_segment((0.0, 0.0), (1.0, 0.05));
        let s2 = sketch.add_segment((0.0, 1.0), (1.0, 1.0));
        assert_eq!(parallel_angle(&sketch, &[s1, s2]).unwrap(), Value::Number(0.0));

        let s3 = sketch.add_segment((1.0, 2.0), (0.0, 2.0));
        assert_eq!(parallel_angle(&sketch, &[s1, s3]).unwrap(), Value::Number(180.0));
    }

    #[test]
    fn perpendicular_picks_quarter_turn() {
        let mut sketch = Sketch::new();
        let s1 = sketch.add_segment((0.0, 0.0), (1.0, 0.0));
        let up = sketch.add_segment((0.0, 0.0), (0.1, 1.0));
        let down = sketch.add_segment((0.0, 0.0), (0.1, -1.0));
        assert_eq!(perpendicular_angle(&sketch, &[s1, up]).unwrap(), Value::Number(90.0));
        assert_eq!(perpendicular_angle(&sketch, &[s1, down]).unwrap(), Value::Number(270.0));
    }

    #[test]
    fn angle_constant_wraps_before_converting() {
        assert_abs_diff_eq!(wrapped_radians(450.0), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(wrapped_radians(-90.0), -std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn angle_between_residual() {
        let mut sketch = Sketch::new();
        let a1 = sketch.add_param(sketch_types::Param::new(0.25, "ang"));
        let a2 = sketch.add_param(sketch_types::Param::new(1.0, "ang"));
        let mut out = Vec::new();
        angle_between(&mut out, [a1, a2], 0.75);
        assert_abs_diff_eq!(out[0].evaluate(|id| sketch.value(id)), 0.0, epsilon = 1e-12);
    }
}
