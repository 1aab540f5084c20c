//! Rich assertion helpers with diagnostic output.
//!
//! Every failure includes expected vs actual and the constraint's label.

use sketch_constraints::{AlgConstraint, ConstantValue};
use sketch_types::{ConstraintId, ObjectId, Sketch};

use crate::helpers::{residual_values, HarnessError};
use crate::workflow::SketchBuilder;

/// Assert each residual of a constraint is within `tol` of zero.
pub fn assert_residuals_near_zero(
    constraint: &AlgConstraint,
    sketch: &Sketch,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let values = residual_values(constraint, sketch)?;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() || v.abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!("[{}] {} residual[{}] = {:.6e} (tol={})", ctx, constraint, i, v, tol),
            });
        }
    }
    Ok(())
}

/// Assert residual values match `expected` element-wise within `tol`.
pub fn assert_residuals_eq(
    constraint: &AlgConstraint,
    sketch: &Sketch,
    expected: &[f64],
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual = residual_values(constraint, sketch)?;
    if actual.len() != expected.len() {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] {} expected {} residuals, got {}: {:?}",
                ctx,
                constraint,
                expected.len(),
                actual.len(),
                actual,
            ),
        });
    }
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if (a - e).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] {} residual[{}]: expected {:.6}, got {:.6} (tol={})",
                    ctx, constraint, i, e, a, tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert a raw constant value.
pub fn assert_constant(
    constraint: &AlgConstraint,
    name: &str,
    expected: impl Into<ConstantValue>,
    ctx: &str,
) -> Result<(), HarnessError> {
    let expected = expected.into();
    match constraint.constants().get(name) {
        Some(actual) if *actual == expected => Ok(()),
        actual => Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] {} constant \"{}\": expected {:?}, got {:?}. Constants: {:?}",
                ctx,
                constraint,
                name,
                expected,
                actual,
                constraint.constants(),
            ),
        }),
    }
}

/// Assert which modifier, if any, owns an object.
pub fn assert_managed_by(
    sketch: &Sketch,
    object: ObjectId,
    expected: Option<ConstraintId>,
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual = sketch.managed_by(object)?;
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] object {} owner: expected {:?}, got {:?}",
                ctx, object, expected, actual,
            ),
        })
    }
}

/// Assert the builder's constraint list matches expected (name, typeId)
/// pairs, in order.
pub fn assert_constraint_list(builder: &SketchBuilder, expected: &[(&str, &str)]) -> Result<(), HarnessError> {
    let actual: Vec<(String, String)> = builder
        .constraints()
        .iter()
        .map(|c| (c.name.clone(), c.constraint.kind().id().to_string()))
        .collect();

    if actual.len() != expected.len() {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "constraint list length mismatch: expected {}, got {}.\nActual: {:?}",
                expected.len(),
                actual.len(),
                actual,
            ),
        });
    }

    for (i, ((act_name, act_type), (exp_name, exp_type))) in actual.iter().zip(expected.iter()).enumerate() {
        if act_name != exp_name || act_type != exp_type {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "constraint mismatch at index {}: expected (\"{}\", \"{}\"), got (\"{}\", \"{}\")",
                    i, exp_name, exp_type, act_name, act_type,
                ),
            });
        }
    }

    Ok(())
}
