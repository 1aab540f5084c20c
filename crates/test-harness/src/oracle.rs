//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an `OracleVerdict` with diagnostic detail, not panics.
//! This lets agents collect all failures in one pass.

use std::collections::HashMap;

use sketch_constraints::schema::{nearest_horizontal, nearest_vertical};
use sketch_constraints::{AlgConstraint, ConstraintError, ConstraintKind, ConstraintRecord};
use sketch_types::{ObjectId, Sketch};

use crate::helpers::{max_abs, residual_values};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn pass(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: None,
        }
    }

    fn pass_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: true,
            detail,
            value: Some(value),
        }
    }

    fn fail(name: &str, detail: String) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: None,
        }
    }

    fn fail_val(name: &str, detail: String, value: f64) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed: false,
            detail,
            value: Some(value),
        }
    }
}

// ── Residual Oracles ────────────────────────────────────────────────────────

/// Check that every residual of a constraint is within `tol` of zero.
pub fn check_residuals_satisfied(constraint: &AlgConstraint, sketch: &Sketch, tol: f64) -> OracleVerdict {
    let values = match residual_values(constraint, sketch) {
        Ok(v) => v,
        Err(e) => return OracleVerdict::fail("residuals_satisfied", format!("{constraint}: {e}")),
    };
    let worst = max_abs(&values);
    if worst <= tol {
        OracleVerdict::pass_val(
            "residuals_satisfied",
            format!("{constraint}: {} residuals, max |r| = {:.3e}", values.len(), worst),
            worst,
        )
    } else {
        OracleVerdict::fail_val(
            "residuals_satisfied",
            format!(
                "{constraint}: max |r| = {:.3e} exceeds tol {} (values {:?})",
                worst,
                tol,
                &values[..values.len().min(5)]
            ),
            worst,
        )
    }
}

/// Check that no residual evaluates to NaN or infinity.
pub fn check_finite_residuals(constraint: &AlgConstraint, sketch: &Sketch) -> OracleVerdict {
    let values = match residual_values(constraint, sketch) {
        Ok(v) => v,
        Err(e) => return OracleVerdict::fail("finite_residuals", format!("{constraint}: {e}")),
    };
    let bad: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_finite())
        .map(|(i, _)| i)
        .collect();
    if bad.is_empty() {
        OracleVerdict::pass("finite_residuals", format!("{constraint}: all {} residuals finite", values.len()))
    } else {
        OracleVerdict::fail(
            "finite_residuals",
            format!("{constraint}: non-finite residuals at {:?}", bad),
        )
    }
}

/// Check that every residual only references the constraint's own
/// materialized parameters.
pub fn check_params_in_scope(constraint: &AlgConstraint) -> OracleVerdict {
    let mut out = Vec::new();
    if let Err(e) = constraint.collect_polynomials(&mut out) {
        return OracleVerdict::fail("params_in_scope", format!("{constraint}: {e}"));
    }
    let stray = out
        .iter()
        .flat_map(|p| p.params())
        .filter(|p| !constraint.params().contains(p))
        .count();
    if stray == 0 {
        OracleVerdict::pass(
            "params_in_scope",
            format!("{constraint}: {} residuals over {} params", out.len(), constraint.params().len()),
        )
    } else {
        OracleVerdict::fail("params_in_scope", format!("{constraint}: {stray} terms outside the scope"))
    }
}

/// Check that auxiliary parameters sit inside their bounds.
pub fn check_param_bounds(constraint: &AlgConstraint, sketch: &Sketch) -> OracleVerdict {
    let mut outside = Vec::new();
    for &id in constraint.auxiliary_params() {
        match sketch.param(id) {
            Some(p) if p.satisfies_bounds() => {}
            Some(p) => outside.push(format!("{}={}", p.name, p.value)),
            None => outside.push("<removed>".to_string()),
        }
    }
    if outside.is_empty() {
        OracleVerdict::pass(
            "param_bounds",
            format!("{constraint}: {} auxiliary params in bounds", constraint.auxiliary_params().len()),
        )
    } else {
        OracleVerdict::fail("param_bounds", format!("{constraint}: out of bounds: {}", outside.join(", ")))
    }
}

// ── Branch Oracles ──────────────────────────────────────────────────────────

/// Check that a branch-selecting constraint holds a canonical angle, and
/// the one nearest to the angle measured right now. Other kinds pass.
pub fn check_branch_canonical(constraint: &AlgConstraint, sketch: &Sketch) -> OracleVerdict {
    let nearest: fn(f64) -> f64 = match constraint.kind() {
        ConstraintKind::Vertical | ConstraintKind::Perpendicular => nearest_vertical,
        ConstraintKind::Horizontal | ConstraintKind::Parallel => nearest_horizontal,
        _ => return OracleVerdict::pass("branch_canonical", format!("{constraint}: no branch")),
    };
    let held = constraint.resolve_constants().number("angle").to_degrees();
    let measured = match constraint.kind().initial_constants(sketch, constraint.objects()) {
        Ok(values) => values,
        Err(e) => return OracleVerdict::fail("branch_canonical", format!("{constraint}: {e}")),
    };
    let expected = match measured.first() {
        Some((_, sketch_constraints::Value::Number(n))) => nearest(*n),
        _ => return OracleVerdict::fail("branch_canonical", format!("{constraint}: no measured angle")),
    };
    if (held - expected).abs() < 1e-9 {
        OracleVerdict::pass_val("branch_canonical", format!("{constraint}: holds {expected}"), held)
    } else {
        OracleVerdict::fail_val(
            "branch_canonical",
            format!("{constraint}: holds {held:.3}, nearest canonical is {expected}"),
            held,
        )
    }
}

/// Check that constant initialization for `kind` over `objects` gives the
/// same result when repeated on unchanged geometry.
pub fn check_branch_deterministic(kind: ConstraintKind, sketch: &Sketch, objects: &[ObjectId]) -> OracleVerdict {
    let first = kind.initial_constants(sketch, objects);
    let second = kind.initial_constants(sketch, objects);
    match (first, second) {
        (Ok(a), Ok(b)) if a == b => {
            OracleVerdict::pass("branch_deterministic", format!("{kind}: {} constants repeat", a.len()))
        }
        (Ok(a), Ok(b)) => OracleVerdict::fail("branch_deterministic", format!("{kind}: {:?} then {:?}", a, b)),
        (Err(e), _) | (_, Err(e)) => OracleVerdict::fail("branch_deterministic", format!("{kind}: {e}")),
    }
}

// ── Ownership Oracles ───────────────────────────────────────────────────────

/// Check that every managed object is marked as owned by exactly the
/// modifier that lists it.
pub fn check_single_owner(sketch: &Sketch, constraints: &[&AlgConstraint]) -> OracleVerdict {
    let mut claims: HashMap<ObjectId, Vec<String>> = HashMap::new();
    let mut problems = Vec::new();

    for c in constraints.iter().filter(|c| c.is_modifier()) {
        for &obj in c.managed_objects() {
            claims.entry(obj).or_default().push(c.label());
            match sketch.managed_by(obj) {
                Ok(Some(owner)) if owner == c.id() => {}
                Ok(owner) => problems.push(format!("{obj} listed by {c} but owned by {owner:?}")),
                Err(e) => problems.push(format!("{obj}: {e}")),
            }
        }
    }
    for (obj, owners) in &claims {
        if owners.len() > 1 {
            problems.push(format!("{obj} claimed by {}", owners.join(" and ")));
        }
    }

    if problems.is_empty() {
        OracleVerdict::pass(
            "single_owner",
            format!("{} managed objects, one owner each", claims.len()),
        )
    } else {
        problems.sort();
        OracleVerdict::fail("single_owner", problems.join("; "))
    }
}

// ── Persistence Oracles ─────────────────────────────────────────────────────

/// Check that a constraint survives write → JSON → read unchanged.
///
/// Non-modifiers are read back into the sketch and released again.
/// Modifiers are compared at the record level only, and reading one back
/// must be refused while the first instance still owns its targets.
pub fn check_round_trip(constraint: &AlgConstraint, sketch: &mut Sketch) -> OracleVerdict {
    let record = constraint.write();
    let parsed = match record.to_json().and_then(|json| ConstraintRecord::from_json(&json)) {
        Ok(r) => r,
        Err(e) => return OracleVerdict::fail("round_trip", format!("{constraint}: {e}")),
    };
    if parsed != record {
        return OracleVerdict::fail("round_trip", format!("{constraint}: {:?} became {:?}", record, parsed));
    }

    match AlgConstraint::read(&parsed, sketch) {
        Ok(restored) => {
            let same = restored.kind() == constraint.kind()
                && restored.objects() == constraint.objects()
                && restored.constants() == constraint.constants()
                && restored.params().len() == constraint.params().len();
            let modifier = restored.is_modifier();
            restored.release(sketch);
            if modifier {
                OracleVerdict::fail("round_trip", format!("{constraint}: duplicate modifier was accepted"))
            } else if same {
                OracleVerdict::pass("round_trip", format!("{constraint}: record restored"))
            } else {
                OracleVerdict::fail("round_trip", format!("{constraint}: restored instance differs"))
            }
        }
        Err(ConstraintError::AlreadyManaged(_)) if constraint.is_modifier() => {
            OracleVerdict::pass("round_trip", format!("{constraint}: record restored, ownership kept"))
        }
        Err(e) => OracleVerdict::fail("round_trip", format!("{constraint}: {e}")),
    }
}

// ── Composite ───────────────────────────────────────────────────────────────

/// Run every per-constraint oracle.
pub fn run_all_checks(constraint: &AlgConstraint, sketch: &mut Sketch, tol: f64) -> Vec<OracleVerdict> {
    vec![
        check_residuals_satisfied(constraint, sketch, tol),
        check_finite_residuals(constraint, sketch),
        check_params_in_scope(constraint),
        check_param_bounds(constraint, sketch),
        check_branch_canonical(constraint, sketch),
        check_round_trip(constraint, sketch),
    ]
}
