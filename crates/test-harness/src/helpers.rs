//! Helper functions: error type, residual evaluation, profile builders.

use sketch_constraints::{AlgConstraint, ConstraintError, Polynomial};
use sketch_types::Sketch;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("object not found: {name}")]
    ObjectNotFound { name: String },

    #[error("constraint not found: {name}")]
    ConstraintNotFound { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("geometry error: {0}")]
    Geometry(#[from] sketch_types::GeometryError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

// ── Residual Evaluation ─────────────────────────────────────────────────────

/// Evaluate every polynomial against the sketch's current values.
pub fn evaluate_all(polys: &[Polynomial], sketch: &Sketch) -> Vec<f64> {
    polys.iter().map(|p| p.evaluate(|id| sketch.value(id))).collect()
}

/// The residual values of one constraint, in emission order.
pub fn residual_values(constraint: &AlgConstraint, sketch: &Sketch) -> Result<Vec<f64>, HarnessError> {
    let mut out = Vec::new();
    constraint.collect_polynomials(&mut out)?;
    Ok(evaluate_all(&out, sketch))
}

/// Largest absolute value, NaN if any value is NaN, 0 for an empty slice.
pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| {
        if v.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(v.abs())
        }
    })
}

// ── Profile Builders ────────────────────────────────────────────────────────

/// Corner points of an axis-aligned rectangle, counter-clockwise from
/// `(x, y)`.
pub fn rect_corners(x: f64, y: f64, w: f64, h: f64) -> [(f64, f64); 4] {
    [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
}

/// Vertices of a regular polygon inscribed in a circle, counter-clockwise
/// starting on the positive x axis.
pub fn regular_polygon(cx: f64, cy: f64, radius: f64, sides: usize) -> Vec<(f64, f64)> {
    (0..sides)
        .map(|i| {
            let a = std::f64::consts::TAU * i as f64 / sides as f64;
            (cx + radius * a.cos(), cy + radius * a.sin())
        })
        .collect()
}
