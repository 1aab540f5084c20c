//! SketchBuilder: fluent API for scripting constraint workflows in tests.
//!
//! Drives the real constraint adapter against a real sketch store. All
//! methods accept string names instead of object ids for readability.

use std::collections::HashMap;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use sketch_constraints::{AlgConstraint, ConstantValue, ConstraintKind, ConstraintRecord, Constants, Polynomial};
use sketch_types::{ConstraintId, ObjectId, Sketch};
use tracing::{debug, warn};

use crate::helpers::*;
use crate::oracle;

/// A named constraint owned by a [`SketchBuilder`].
#[derive(Debug)]
pub struct NamedConstraint {
    pub name: String,
    pub constraint: AlgConstraint,
}

/// Saved form of a named constraint: the persisted record plus the
/// builder-side name.
#[derive(Debug, Serialize, Deserialize)]
struct SavedConstraint {
    name: String,
    #[serde(flatten)]
    record: ConstraintRecord,
}

/// A fluent builder for constructing and verifying constrained sketches in
/// tests.
///
/// Wraps a [`Sketch`] and the constraints built on it, and provides
/// named-object access, constraint lifecycle management, and inline
/// assertions.
#[derive(Debug)]
pub struct SketchBuilder {
    sketch: Sketch,
    named_objects: HashMap<String, ObjectId>,
    constraints: Vec<NamedConstraint>,
    history: Vec<(String, String)>,
    auto_check: bool,
}

impl Default for SketchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SketchBuilder {
    pub fn new() -> Self {
        Self {
            sketch: Sketch::new(),
            named_objects: HashMap::new(),
            constraints: Vec::new(),
            history: Vec::new(),
            auto_check: false,
        }
    }

    /// Enable auto-checking: every new constraint must produce finite
    /// residuals.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    // ── Geometry ────────────────────────────────────────────────────────

    pub fn point(&mut self, name: &str, x: f64, y: f64) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.sketch.add_point(x, y);
        Ok(self.register(name, id, "Point"))
    }

    pub fn segment(&mut self, name: &str, from: (f64, f64), to: (f64, f64)) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.sketch.add_segment(from, to);
        Ok(self.register(name, id, "Segment"))
    }

    /// A segment whose end points are existing named points.
    pub fn segment_between(&mut self, name: &str, a: &str, b: &str) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let a = self.object_id(a)?;
        let b = self.object_id(b)?;
        let id = self.sketch.add_segment_between(a, b)?;
        Ok(self.register(name, id, "Segment"))
    }

    pub fn circle(&mut self, name: &str, center: (f64, f64), radius: f64) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.sketch.add_circle(center, radius);
        Ok(self.register(name, id, "Circle"))
    }

    /// A counter-clockwise arc from `ang1` to `ang2` (radians).
    pub fn arc(
        &mut self,
        name: &str,
        center: (f64, f64),
        radius: f64,
        ang1: f64,
        ang2: f64,
    ) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.sketch.add_arc(center, radius, ang1, ang2);
        Ok(self.register(name, id, "Arc"))
    }

    pub fn ellipse(
        &mut self,
        name: &str,
        ep1: (f64, f64),
        ep2: (f64, f64),
        minor_radius: f64,
    ) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.sketch.add_ellipse(ep1, ep2, minor_radius);
        Ok(self.register(name, id, "Ellipse"))
    }

    pub fn bezier(
        &mut self,
        name: &str,
        p0: (f64, f64),
        p1: (f64, f64),
        p2: (f64, f64),
        p3: (f64, f64),
    ) -> Result<ObjectId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.sketch.add_bezier(p0, p1, p2, p3);
        Ok(self.register(name, id, "Bezier"))
    }

    /// A closed rectangle of four segments over four shared corners.
    ///
    /// Corners are named `{prefix}.p0` .. `{prefix}.p3` and sides
    /// `{prefix}.s0` .. `{prefix}.s3`, with side `i` running from corner `i`
    /// to corner `i + 1`.
    pub fn rect(&mut self, prefix: &str, x: f64, y: f64, w: f64, h: f64) -> Result<[ObjectId; 4], HarnessError> {
        for (i, (px, py)) in rect_corners(x, y, w, h).into_iter().enumerate() {
            self.point(&format!("{prefix}.p{i}"), px, py)?;
        }
        let mut sides = [ObjectId(0); 4];
        for (i, side) in sides.iter_mut().enumerate() {
            *side = self.segment_between(
                &format!("{prefix}.s{i}"),
                &format!("{prefix}.p{i}"),
                &format!("{prefix}.p{}", (i + 1) % 4),
            )?;
        }
        Ok(sides)
    }

    /// Give a name to an object created directly on the sketch.
    pub fn name_object(&mut self, name: &str, id: ObjectId) -> Result<&mut Self, HarnessError> {
        self.check_name_available(name)?;
        let kind = self.sketch.kind(id)?;
        self.register(name, id, &format!("{kind:?}"));
        Ok(self)
    }

    /// Move a named point without touching any constraint.
    pub fn move_point(&mut self, name: &str, x: f64, y: f64) -> Result<&mut Self, HarnessError> {
        let id = self.object_id(name)?;
        self.sketch.point(id)?;
        self.sketch.set_position(id, Vector2::new(x, y))?;
        self.history.push((format!("MovePoint({name})"), "Ok".into()));
        Ok(self)
    }

    // ── Constraints ─────────────────────────────────────────────────────

    /// Add a constraint whose constants start from the current geometry.
    pub fn constrain(&mut self, name: &str, kind: ConstraintKind, objects: &[&str]) -> Result<ConstraintId, HarnessError> {
        self.check_name_available(name)?;
        let objects = self.resolve_names(objects)?;
        let constraint = AlgConstraint::create(kind, objects, &mut self.sketch)?;
        self.push_constraint(name, constraint)
    }

    /// Add a constraint with explicit raw constants.
    pub fn constrain_with(
        &mut self,
        name: &str,
        kind: ConstraintKind,
        objects: &[&str],
        constants: &[(&str, ConstantValue)],
    ) -> Result<ConstraintId, HarnessError> {
        self.check_name_available(name)?;
        let objects = self.resolve_names(objects)?;
        let constants: Constants = constants
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let constraint = AlgConstraint::new(kind, objects, constants, &mut self.sketch)?;
        self.push_constraint(name, constraint)
    }

    /// Add the internal consistency constraint of a named segment or arc.
    pub fn consistency(&mut self, name: &str, object: &str) -> Result<ConstraintId, HarnessError> {
        self.check_name_available(name)?;
        let id = self.object_id(object)?;
        let constraint =
            AlgConstraint::consistency_for(&mut self.sketch, id)?.ok_or_else(|| HarnessError::AssertionFailed {
                detail: format!("object \"{object}\" has no consistency constraint"),
            })?;
        self.push_constraint(name, constraint)
    }

    pub fn set_constant(
        &mut self,
        name: &str,
        constant: &str,
        value: impl Into<ConstantValue>,
    ) -> Result<&mut Self, HarnessError> {
        let idx = self.constraint_index(name)?;
        self.constraints[idx].constraint.set_constant(constant, value);
        self.history.push((format!("SetConstant({name}.{constant})"), "Ok".into()));
        Ok(self)
    }

    /// Re-read a constraint's constants from the current geometry.
    pub fn resync(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        let idx = self.constraint_index(name)?;
        self.constraints[idx].constraint.set_constants_from_geometry(&self.sketch)?;
        self.history.push((format!("Resync({name})"), "Ok".into()));
        Ok(self)
    }

    /// Remove a constraint, freeing anything it managed.
    pub fn remove(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        let idx = self.constraint_index(name)?;
        let removed = self.constraints.remove(idx);
        removed.constraint.release(&mut self.sketch);
        self.history.push((format!("Remove({name})"), "Ok".into()));
        Ok(self)
    }

    /// Run every modifier once, in insertion order.
    pub fn apply_modifiers(&mut self) -> Result<&mut Self, HarnessError> {
        let mut count = 0;
        for named in self.constraints.iter().filter(|c| c.constraint.is_modifier()) {
            named.constraint.modify(&mut self.sketch)?;
            count += 1;
        }
        debug!(count, "applied modifiers");
        self.history.push(("ApplyModifiers".into(), format!("{count} modifiers")));
        Ok(self)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn object_id(&self, name: &str) -> Result<ObjectId, HarnessError> {
        self.named_objects
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::ObjectNotFound {
                name: name.to_string(),
            })
    }

    /// Name of an object, if it was registered with this builder.
    pub fn object_name(&self, id: ObjectId) -> Option<&str> {
        self.named_objects
            .iter()
            .find(|(_, &v)| v == id)
            .map(|(k, _)| k.as_str())
    }

    pub fn constraint(&self, name: &str) -> Result<&AlgConstraint, HarnessError> {
        let idx = self.constraint_index(name)?;
        Ok(&self.constraints[idx].constraint)
    }

    pub fn constraints(&self) -> &[NamedConstraint] {
        &self.constraints
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    pub fn sketch_mut(&mut self) -> &mut Sketch {
        &mut self.sketch
    }

    /// Every residual of every non-modifier constraint, in insertion order.
    pub fn residuals(&self) -> Result<Vec<Polynomial>, HarnessError> {
        let mut out = Vec::new();
        for named in &self.constraints {
            named.constraint.collect_polynomials(&mut out)?;
        }
        Ok(out)
    }

    pub fn residual_values(&self) -> Result<Vec<f64>, HarnessError> {
        Ok(evaluate_all(&self.residuals()?, &self.sketch))
    }

    /// Get the operation history as (operation, outcome) pairs.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── Save / Load ─────────────────────────────────────────────────────

    /// Serialize every constraint as a JSON list of named records.
    pub fn save(&self) -> Result<String, HarnessError> {
        let saved: Vec<SavedConstraint> = self
            .constraints
            .iter()
            .map(|c| SavedConstraint {
                name: c.name.clone(),
                record: c.constraint.write(),
            })
            .collect();
        serde_json::to_string_pretty(&saved).map_err(|e| HarnessError::Serialization(e.to_string()))
    }

    /// Replace every constraint with the ones in `json`, read against the
    /// current sketch. All or nothing: if any record fails to read, the
    /// current constraints are left in place.
    pub fn load(&mut self, json: &str) -> Result<&mut Self, HarnessError> {
        let saved: Vec<SavedConstraint> =
            serde_json::from_str(json).map_err(|e| HarnessError::Serialization(e.to_string()))?;

        // Old modifiers step aside so the file may claim the objects they
        // manage; their marks come back if any record fails.
        for named in &self.constraints {
            let c = &named.constraint;
            self.sketch.release(c.managed_objects(), c.id());
        }

        let mut loaded = Vec::with_capacity(saved.len());
        for s in saved {
            match AlgConstraint::read(&s.record, &mut self.sketch) {
                Ok(constraint) => loaded.push(NamedConstraint {
                    name: s.name,
                    constraint,
                }),
                Err(err) => {
                    warn!(constraint = %s.name, error = %err, "load failed, keeping current constraints");
                    for partial in loaded {
                        partial.constraint.release(&mut self.sketch);
                    }
                    for named in &self.constraints {
                        let c = &named.constraint;
                        self.sketch.claim(c.managed_objects(), c.id())?;
                    }
                    return Err(err.into());
                }
            }
        }

        for removed in std::mem::replace(&mut self.constraints, loaded) {
            removed.constraint.release(&mut self.sketch);
        }
        self.history
            .push(("Load".into(), format!("{} constraints", self.constraints.len())));
        Ok(self)
    }

    // ── Inline Assertions ───────────────────────────────────────────────

    /// Assert every residual is within `tol` of zero.
    pub fn assert_satisfied(&self, tol: f64) -> Result<&Self, HarnessError> {
        let mut failing = Vec::new();
        for named in &self.constraints {
            let worst = max_abs(&residual_values(&named.constraint, &self.sketch)?);
            if worst.is_nan() || worst > tol {
                failing.push(format!("{} ({}) = {:.3e}", named.name, named.constraint, worst));
            }
        }
        if failing.is_empty() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("unsatisfied constraints (tol={}): {}", tol, failing.join(", ")),
            })
        }
    }

    /// Assert exactly `expected` constraints exist.
    pub fn assert_constraint_count(&self, expected: usize) -> Result<&Self, HarnessError> {
        let actual = self.constraint_count();
        if actual == expected {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "expected {} constraints, got {}. Constraints: {:?}",
                    expected,
                    actual,
                    self.constraints.iter().map(|c| &c.name).collect::<Vec<_>>()
                ),
            })
        }
    }

    // ── Oracle Integration ──────────────────────────────────────────────

    /// Run every oracle on one named constraint.
    pub fn check(&mut self, name: &str, tol: f64) -> Result<Vec<oracle::OracleVerdict>, HarnessError> {
        let idx = self.constraint_index(name)?;
        Ok(oracle::run_all_checks(&self.constraints[idx].constraint, &mut self.sketch, tol))
    }

    /// Run every oracle on every constraint plus the sketch-wide ownership
    /// check.
    pub fn check_all(&mut self, tol: f64) -> Vec<oracle::OracleVerdict> {
        let mut verdicts = Vec::new();
        for named in &self.constraints {
            verdicts.extend(oracle::run_all_checks(&named.constraint, &mut self.sketch, tol));
        }
        let all: Vec<&AlgConstraint> = self.constraints.iter().map(|c| &c.constraint).collect();
        verdicts.push(oracle::check_single_owner(&self.sketch, &all));
        verdicts
    }

    // ── Internal Helpers ────────────────────────────────────────────────

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.named_objects.contains_key(name) || self.constraints.iter().any(|c| c.name == name) {
            Err(HarnessError::DuplicateName {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn register(&mut self, name: &str, id: ObjectId, kind: &str) -> ObjectId {
        self.named_objects.insert(name.to_string(), id);
        self.history.push((format!("Add{kind}({name})"), id.to_string()));
        id
    }

    fn resolve_names(&self, names: &[&str]) -> Result<Vec<ObjectId>, HarnessError> {
        names.iter().map(|n| self.object_id(n)).collect()
    }

    fn constraint_index(&self, name: &str) -> Result<usize, HarnessError> {
        self.constraints
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| HarnessError::ConstraintNotFound {
                name: name.to_string(),
            })
    }

    fn push_constraint(&mut self, name: &str, constraint: AlgConstraint) -> Result<ConstraintId, HarnessError> {
        let id = constraint.id();
        self.history
            .push((format!("Constrain({name})"), constraint.label()));
        if self.auto_check {
            let verdict = oracle::check_finite_residuals(&constraint, &self.sketch);
            if !verdict.passed {
                let detail = verdict.detail.clone();
                constraint.release(&mut self.sketch);
                return Err(HarnessError::OracleFailure {
                    oracle: verdict.oracle_name,
                    detail,
                });
            }
        }
        self.constraints.push(NamedConstraint {
            name: name.to_string(),
            constraint,
        });
        Ok(id)
    }
}
