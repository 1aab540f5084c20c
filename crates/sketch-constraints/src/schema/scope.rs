use sketch_types::{Bound, ObjectId, Param, ParamId, Sketch};

use crate::error::ConstraintError;
use crate::settings::CompileSettings;

/// Collects the ordered parameter list a constraint's residuals are built
/// over. Auxiliary parameters allocated here are owned by the constraint
/// and are also tracked separately so they can be freed with it.
pub struct ScopeBuilder<'s> {
    sketch: &'s mut Sketch,
    settings: CompileSettings,
    params: Vec<ParamId>,
    auxiliary: Vec<ParamId>,
}

impl<'s> ScopeBuilder<'s> {
    pub fn new(sketch: &'s mut Sketch, settings: CompileSettings) -> Self {
        Self {
            sketch,
            settings,
            params: Vec::new(),
            auxiliary: Vec::new(),
        }
    }

    pub fn sketch(&self) -> &Sketch {
        self.sketch
    }

    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    pub fn visit(&mut self, param: ParamId) {
        self.params.push(param);
    }

    /// Append all of an object's parameters in its visit order.
    pub fn visit_object(&mut self, id: ObjectId) -> Result<(), ConstraintError> {
        let params = &mut self.params;
        self.sketch.visit_params(id, &mut |p| params.push(p))?;
        Ok(())
    }

    /// Allocate a constraint-owned parameter and append it to the scope.
    pub fn auxiliary(&mut self, param: Param) -> ParamId {
        let id = self.sketch.add_param(param);
        self.auxiliary.push(id);
        self.params.push(id);
        id
    }

    /// Allocate an auxiliary curve parameter with the configured start value
    /// and open-interval bounds.
    pub fn curve_param(&mut self, name: &'static str) -> ParamId {
        let c = self.settings.curve;
        self.auxiliary(
            Param::new(c.initial, name).with_bounds(vec![Bound::GreaterThan(c.lower), Bound::LessThan(c.upper)]),
        )
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// `(scope, auxiliary)`.
    pub fn finish(self) -> (Vec<ParamId>, Vec<ParamId>) {
        (self.params, self.auxiliary)
    }

    /// Drop the scope, removing any auxiliary parameters it allocated.
    pub fn discard(self) {
        for id in self.auxiliary {
            self.sketch.remove_param(id);
        }
    }
}
