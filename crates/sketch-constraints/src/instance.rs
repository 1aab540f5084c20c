//! A live constraint: one kind applied to one tuple of sketch objects.

use std::cell::OnceCell;
use std::fmt;

use sketch_types::{ConstraintId, ObjectId, ObjectKind, ParamId, Sketch};
use tracing::{debug, instrument};

use crate::constants::{ConstantValue, Constants, ResolvedConstants, Value};
use crate::error::ConstraintError;
use crate::polynomial::Polynomial;
use crate::record::{ConstraintRecord, ObjectIndex};
use crate::schema::{ConstraintKind, ScopeBuilder};
use crate::settings::CompileSettings;

/// A constraint bound to sketch objects.
///
/// Creating one may add auxiliary parameters to the sketch and, for
/// modifiers, mark managed objects as owned. Neither is undone on drop:
/// call [`release`](Self::release) when the constraint is removed.
#[derive(Debug)]
pub struct AlgConstraint {
    id: ConstraintId,
    kind: ConstraintKind,
    objects: Vec<ObjectId>,
    constants: Constants,
    resolved: OnceCell<ResolvedConstants>,
    params: Vec<ParamId>,
    auxiliary: Vec<ParamId>,
    reference: Vec<ObjectId>,
    managed: Vec<ObjectId>,
    internal: bool,
    settings: CompileSettings,
}

impl AlgConstraint {
    /// Build a constraint with the given raw constants. The parameter scope
    /// is materialized here; modifiers also claim their managed objects and
    /// fail if any of them already has an owner.
    pub fn new(
        kind: ConstraintKind,
        objects: Vec<ObjectId>,
        constants: Constants,
        sketch: &mut Sketch,
    ) -> Result<Self, ConstraintError> {
        Self::with_settings(kind, objects, constants, CompileSettings::default(), sketch)
    }

    pub fn with_settings(
        kind: ConstraintKind,
        objects: Vec<ObjectId>,
        constants: Constants,
        settings: CompileSettings,
        sketch: &mut Sketch,
    ) -> Result<Self, ConstraintError> {
        let arity = kind.arity();
        if !arity.accepts(objects.len()) {
            return Err(ConstraintError::Arity {
                schema: kind.id(),
                expected: arity.to_string(),
                found: objects.len(),
            });
        }

        let id = ConstraintId::next();
        let mut scope = ScopeBuilder::new(sketch, settings);
        let (params, auxiliary) = match kind.define_params_scope(&mut scope, &objects) {
            Ok(()) => scope.finish(),
            Err(err) => {
                scope.discard();
                return Err(err);
            }
        };

        let (reference, managed) = match kind.split_objects(&objects) {
            Some((reference, managed)) => {
                if let Err(err) = sketch.claim(managed, id) {
                    for p in &auxiliary {
                        sketch.remove_param(*p);
                    }
                    return Err(err.into());
                }
                (reference.to_vec(), managed.to_vec())
            }
            None => (Vec::new(), Vec::new()),
        };

        debug!(
            %kind,
            id = id.value(),
            params = params.len(),
            auxiliary = auxiliary.len(),
            "constraint created"
        );

        Ok(Self {
            id,
            kind,
            objects,
            constants,
            resolved: OnceCell::new(),
            params,
            auxiliary,
            reference,
            managed,
            internal: false,
            settings,
        })
    }

    /// Build a constraint the user just added: constants start from the
    /// current geometry.
    pub fn create(kind: ConstraintKind, objects: Vec<ObjectId>, sketch: &mut Sketch) -> Result<Self, ConstraintError> {
        let mut constraint = Self::new(kind, objects, Constants::new(), sketch)?;
        if let Err(err) = constraint.init_constants(sketch) {
            constraint.release(sketch);
            return Err(err);
        }
        Ok(constraint)
    }

    /// The internal consistency constraint that keeps a segment's or an
    /// arc's end points in line with its own parameters. `None` for other
    /// kinds of objects.
    pub fn consistency_for(sketch: &mut Sketch, object: ObjectId) -> Result<Option<Self>, ConstraintError> {
        let kind = match sketch.kind(object)? {
            ObjectKind::Segment => ConstraintKind::SegmentConsistency,
            ObjectKind::Arc => ConstraintKind::ArcConsistency,
            _ => return Ok(None),
        };
        let constraint = Self::new(kind, vec![object], Constants::new(), sketch)?;
        Ok(Some(constraint.mark_internal()))
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    /// Debug label, `<typeId>:<n>`.
    pub fn label(&self) -> String {
        self.to_string()
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn params(&self) -> &[ParamId] {
        &self.params
    }

    /// Parameters this constraint allocated for itself.
    pub fn auxiliary_params(&self) -> &[ParamId] {
        &self.auxiliary
    }

    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    pub fn is_modifier(&self) -> bool {
        self.kind.is_modifier()
    }

    pub fn reference_objects(&self) -> &[ObjectId] {
        &self.reference
    }

    pub fn managed_objects(&self) -> &[ObjectId] {
        &self.managed
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Mark as a host-generated constraint that is not shown to users.
    pub fn mark_internal(mut self) -> Self {
        self.internal = true;
        self
    }

    // ── Constants ───────────────────────────────────────────────────────

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Resolved constants, parsed on first use after every change to the
    /// raw values.
    pub fn resolve_constants(&self) -> &ResolvedConstants {
        self.resolved
            .get_or_init(|| ResolvedConstants::resolve(self.kind.constant_defs(), &self.constants))
    }

    pub fn set_constant(&mut self, name: &str, value: impl Into<ConstantValue>) {
        self.constants.insert(name.to_string(), value.into());
        self.resolved.take();
    }

    /// Replace all constants with values measured from the current
    /// geometry. Numbers are rounded to the configured precision.
    pub fn init_constants(&mut self, sketch: &Sketch) -> Result<(), ConstraintError> {
        if self.kind.constant_defs().is_empty() {
            return Ok(());
        }
        let precision = self.settings.constant_precision;
        self.constants = self
            .kind
            .initial_constants(sketch, &self.objects)?
            .into_iter()
            .map(|(name, value)| {
                let raw = match value {
                    Value::Number(n) => ConstantValue::Text(format!("{n:.precision$}")),
                    Value::Flag(b) => ConstantValue::Flag(b),
                };
                (name.to_string(), raw)
            })
            .collect();
        self.resolved.take();
        debug!(constraint = %self, constants = ?self.constants, "constants initialized");
        Ok(())
    }

    /// Re-read constants from the current geometry at full precision, for
    /// kinds that support it. Other kinds are left untouched.
    pub fn set_constants_from_geometry(&mut self, sketch: &Sketch) -> Result<(), ConstraintError> {
        if !self.kind.resyncs_constants() {
            return Ok(());
        }
        for (name, value) in self.kind.initial_constants(sketch, &self.objects)? {
            let raw = match value {
                Value::Number(n) => ConstantValue::Text(n.to_string()),
                Value::Flag(b) => ConstantValue::Flag(b),
            };
            self.constants.insert(name.to_string(), raw);
        }
        self.resolved.take();
        debug!(constraint = %self, "constants synced from geometry");
        Ok(())
    }

    /// Whether the constants can be edited by a user: there are some and
    /// none is read-only.
    pub fn editable(&self) -> bool {
        let defs = self.kind.constant_defs();
        !defs.is_empty() && defs.iter().all(|d| !d.read_only)
    }

    // ── Solving ─────────────────────────────────────────────────────────

    /// Append this constraint's residuals to `out`.
    pub fn collect_polynomials(&self, out: &mut Vec<Polynomial>) -> Result<(), ConstraintError> {
        self.kind.collect_polynomials(out, &self.params, self.resolve_constants())
    }

    /// Recompute managed geometry. Only modifiers support this.
    #[instrument(skip_all, fields(type_id = self.kind.id()))]
    pub fn modify(&self, sketch: &mut Sketch) -> Result<(), ConstraintError> {
        if !self.is_modifier() {
            return Err(ConstraintError::NotAModifier(self.kind.id()));
        }
        self.kind
            .modify(sketch, &self.reference, &self.managed, self.resolve_constants())
    }

    /// Give up ownership of managed objects and free auxiliary parameters.
    pub fn release(self, sketch: &mut Sketch) {
        if !self.managed.is_empty() {
            sketch.release(&self.managed, self.id);
        }
        for p in &self.auxiliary {
            sketch.remove_param(*p);
        }
        debug!(constraint = %self, "constraint released");
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn write(&self) -> ConstraintRecord {
        ConstraintRecord {
            type_id: self.kind.id().to_string(),
            objects: self.objects.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Rebuild a constraint from a record whose object ids refer to objects
    /// of `sketch`.
    pub fn read(record: &ConstraintRecord, sketch: &mut Sketch) -> Result<Self, ConstraintError> {
        let objects = Self::resolve_objects(record, &*sketch)?;
        Self::from_record(record, objects, sketch)
    }

    /// Rebuild a constraint from a record, mapping its object ids through
    /// `index`.
    pub fn read_with_index(
        record: &ConstraintRecord,
        index: &impl ObjectIndex,
        sketch: &mut Sketch,
    ) -> Result<Self, ConstraintError> {
        let objects = Self::resolve_objects(record, index)?;
        Self::from_record(record, objects, sketch)
    }

    fn resolve_objects(record: &ConstraintRecord, index: &impl ObjectIndex) -> Result<Vec<ObjectId>, ConstraintError> {
        record
            .objects
            .iter()
            .map(|&id| index.resolve(id).ok_or(ConstraintError::UnknownObject(id)))
            .collect()
    }

    #[instrument(skip_all, fields(type_id = %record.type_id))]
    fn from_record(record: &ConstraintRecord, objects: Vec<ObjectId>, sketch: &mut Sketch) -> Result<Self, ConstraintError> {
        let kind = ConstraintKind::from_id(&record.type_id)?;
        Self::new(kind, objects, record.constants.clone(), sketch)
    }
}

impl fmt::Display for AlgConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.id(), self.id.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn residuals(c: &AlgConstraint, sketch: &Sketch) -> Vec<f64> {
        let mut out = Vec::new();
        c.collect_polynomials(&mut out).unwrap();
        out.iter().map(|p| p.evaluate(|id| sketch.value(id))).collect()
    }

    #[test]
    fn create_initializes_rounded_constants() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(1.0, 1.0);
        let c = AlgConstraint::create(ConstraintKind::DistancePP, vec![p1, p2], &mut sketch).unwrap();
        assert_eq!(c.constants()["distance"], ConstantValue::from("1.41"));
        assert!(c.editable());
    }

    #[test]
    fn precision_follows_settings() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(1.0, 1.0);
        let settings = CompileSettings::default().with_constant_precision(4);
        let mut c =
            AlgConstraint::with_settings(ConstraintKind::DistancePP, vec![p1, p2], Constants::new(), settings, &mut sketch)
                .unwrap();
        c.init_constants(&sketch).unwrap();
        assert_eq!(c.constants()["distance"], ConstantValue::from("1.4142"));
    }

    #[test]
    fn set_constant_invalidates_resolution() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (3.0, 4.0));
        let mut c = AlgConstraint::create(ConstraintKind::SegmentLength, vec![seg], &mut sketch).unwrap();
        assert_abs_diff_eq!(residuals(&c, &sketch)[0], 0.0, epsilon = 1e-12);

        c.set_constant("length", "7");
        assert_abs_diff_eq!(c.resolve_constants().number("length"), 7.0);
        assert_abs_diff_eq!(residuals(&c, &sketch)[0], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn read_only_constants_are_not_editable() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (0.1, 3.0));
        let c = AlgConstraint::create(ConstraintKind::Vertical, vec![seg], &mut sketch).unwrap();
        assert!(!c.editable());
        assert_eq!(c.constants()["angle"], ConstantValue::from("90.00"));

        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(0.0, 0.0);
        let c = AlgConstraint::create(ConstraintKind::PCoincident, vec![p1, p2], &mut sketch).unwrap();
        assert!(!c.editable());
        assert!(c.constants().is_empty());
    }

    #[test]
    fn resync_uses_full_precision() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(1.23456, -2.5);
        let mut c = AlgConstraint::create(ConstraintKind::LockPoint, vec![p], &mut sketch).unwrap();
        assert_eq!(c.constants()["x"], ConstantValue::from("1.23"));
        c.set_constants_from_geometry(&sketch).unwrap();
        assert_eq!(c.constants()["x"], ConstantValue::from("1.23456"));
        assert_eq!(c.constants()["y"], ConstantValue::from("-2.5"));
        for r in residuals(&c, &sketch) {
            assert_abs_diff_eq!(r, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn resync_is_a_no_op_for_plain_distances() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0);
        let p2 = sketch.add_point(3.0, 4.0);
        let mut c = AlgConstraint::create(ConstraintKind::DistancePP, vec![p1, p2], &mut sketch).unwrap();
        c.set_constant("distance", "9");
        c.set_constants_from_geometry(&sketch).unwrap();
        assert_eq!(c.constants()["distance"], ConstantValue::from("9"));
    }

    #[test]
    fn wrong_arity_is_rejected_before_touching_the_sketch() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(0.0, 0.0);
        let before = sketch.param_count();
        let err = AlgConstraint::new(ConstraintKind::PCoincident, vec![p], Constants::new(), &mut sketch).unwrap_err();
        assert!(matches!(err, ConstraintError::Arity { found: 1, .. }));
        assert_eq!(sketch.param_count(), before);
    }

    #[test]
    fn failed_scope_frees_auxiliary_params() {
        let mut sketch = Sketch::new();
        let curve = sketch.add_bezier((0.0, 0.0), (1.0, 1.0), (2.0, 1.0), (3.0, 0.0));
        let not_a_point = sketch.add_circle((0.0, 0.0), 1.0);
        let before = sketch.param_count();
        let err = AlgConstraint::new(ConstraintKind::PointOnBezier, vec![not_a_point, curve], Constants::new(), &mut sketch)
            .unwrap_err();
        assert!(matches!(err, ConstraintError::Geometry(_)));
        assert_eq!(sketch.param_count(), before);
    }

    #[test]
    fn release_frees_auxiliary_params() {
        let mut sketch = Sketch::new();
        let curve = sketch.add_bezier((0.0, 0.0), (1.0, 1.0), (2.0, 1.0), (3.0, 0.0));
        let pt = sketch.add_point(1.5, 0.75);
        let before = sketch.param_count();
        let c = AlgConstraint::create(ConstraintKind::PointOnBezier, vec![pt, curve], &mut sketch).unwrap();
        assert_eq!(sketch.param_count(), before + 1);
        assert_eq!(c.params().len(), 11);
        c.release(&mut sketch);
        assert_eq!(sketch.param_count(), before);
    }

    #[test]
    fn consistency_constraints_are_internal() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (1.0, 0.0));
        let arc = sketch.add_arc((0.0, 0.0), 1.0, 0.0, 1.0);
        let pt = sketch.add_point(0.0, 0.0);

        let s = AlgConstraint::consistency_for(&mut sketch, seg).unwrap().unwrap();
        assert!(s.is_internal());
        assert_eq!(s.kind(), ConstraintKind::SegmentConsistency);
        let a = AlgConstraint::consistency_for(&mut sketch, arc).unwrap().unwrap();
        assert_eq!(a.kind(), ConstraintKind::ArcConsistency);
        assert!(AlgConstraint::consistency_for(&mut sketch, pt).unwrap().is_none());
    }

    #[test]
    fn label_carries_type_id() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 0.0), (1.0, 0.0));
        let c = AlgConstraint::create(ConstraintKind::Angle, vec![seg], &mut sketch).unwrap();
        assert_eq!(c.label(), format!("Angle:{}", c.id().value()));
    }
}
