use slotmap::new_key_type;

new_key_type! {
    /// Stable identity of a scalar parameter cell.
    pub struct ParamId;
}

/// An inequality the external solver enforces on a parameter, separately
/// from the residual system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// value > limit
    GreaterThan(f64),
    /// value < limit
    LessThan(f64),
}

impl Bound {
    pub fn is_satisfied_by(&self, value: f64) -> bool {
        match *self {
            Bound::GreaterThan(limit) => value > limit,
            Bound::LessThan(limit) => value < limit,
        }
    }
}

/// A mutable numeric cell. Only the solver (or the host applying a solve
/// result) changes `value`; constraint code reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: f64,
    /// Short debug label ("x", "t", "ang", ...).
    pub name: &'static str,
    pub bounds: Vec<Bound>,
}

impl Param {
    pub fn new(value: f64, name: &'static str) -> Self {
        Self {
            value,
            name,
            bounds: Vec::new(),
        }
    }

    pub fn with_bounds(mut self, bounds: Vec<Bound>) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn satisfies_bounds(&self) -> bool {
        self.bounds.iter().all(|b| b.is_satisfied_by(self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_interval_bounds() {
        let p = Param::new(0.5, "t").with_bounds(vec![Bound::GreaterThan(0.0), Bound::LessThan(1.0)]);
        assert!(p.satisfies_bounds());

        let mut edge = p.clone();
        edge.value = 1.0;
        assert!(!edge.satisfies_bounds());
        edge.value = 0.0;
        assert!(!edge.satisfies_bounds());
    }

    #[test]
    fn unbounded_param_always_satisfied() {
        assert!(Param::new(-1e9, "x").satisfies_bounds());
    }
}
