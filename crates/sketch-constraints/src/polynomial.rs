//! Symbolic residual expressions.
//!
//! A [`Polynomial`] is a constant offset plus a sum of [`Monomial`]s, each a
//! coefficient times a product of `(parameter, function)` terms. The
//! expression stands for one residual equation `= 0`. Nothing here
//! simplifies, folds or validates: the external solver owns the algebra.

use std::fmt;

use sketch_types::ParamId;

// ── Term functions ──────────────────────────────────────────────────────────

/// The closed vocabulary of scalar functions a term may apply to its
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermFn {
    Identity,
    Square,
    Cube,
    Sin,
    Cos,
}

impl TermFn {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            TermFn::Identity => x,
            TermFn::Square => x * x,
            TermFn::Cube => x * x * x,
            TermFn::Sin => x.sin(),
            TermFn::Cos => x.cos(),
        }
    }

    /// First derivative with respect to the parameter.
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            TermFn::Identity => 1.0,
            TermFn::Square => 2.0 * x,
            TermFn::Cube => 3.0 * x * x,
            TermFn::Sin => x.cos(),
            TermFn::Cos => -x.sin(),
        }
    }

    fn render(self, p: &str) -> String {
        match self {
            TermFn::Identity => p.to_string(),
            TermFn::Square => format!("{p}^2"),
            TermFn::Cube => format!("{p}^3"),
            TermFn::Sin => format!("sin({p})"),
            TermFn::Cos => format!("cos({p})"),
        }
    }
}

// ── Expression tree ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub param: ParamId,
    pub func: TermFn,
}

impl Term {
    pub fn evaluate(&self, value: &impl Fn(ParamId) -> f64) -> f64 {
        self.func.apply(value(self.param))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monomial {
    pub coefficient: f64,
    pub terms: Vec<Term>,
}

impl Monomial {
    pub fn evaluate(&self, value: &impl Fn(ParamId) -> f64) -> f64 {
        self.terms
            .iter()
            .fold(self.coefficient, |acc, t| acc * t.evaluate(value))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polynomial {
    pub constant: f64,
    pub monomials: Vec<Monomial>,
}

impl Polynomial {
    pub fn new(constant: f64) -> Self {
        Self {
            constant,
            monomials: Vec::new(),
        }
    }

    /// Start a new monomial.
    pub fn monomial(mut self, coefficient: f64) -> Self {
        self.monomials.push(Monomial {
            coefficient,
            terms: Vec::new(),
        });
        self
    }

    /// Multiply the current monomial by `func(param)`. A term added before
    /// any monomial opens one with coefficient 1.
    pub fn term(mut self, param: ParamId, func: TermFn) -> Self {
        let term = Term { param, func };
        match self.monomials.last_mut() {
            Some(m) => m.terms.push(term),
            None => self.monomials.push(Monomial {
                coefficient: 1.0,
                terms: vec![term],
            }),
        }
        self
    }

    /// Value of the residual for the given parameter values.
    pub fn evaluate(&self, value: impl Fn(ParamId) -> f64) -> f64 {
        self.monomials
            .iter()
            .fold(self.constant, |acc, m| acc + m.evaluate(&value))
    }

    /// Parameters referenced by the expression, in order of first use.
    pub fn params(&self) -> Vec<ParamId> {
        let mut out: Vec<ParamId> = Vec::new();
        for t in self.monomials.iter().flat_map(|m| m.terms.iter()) {
            if !out.contains(&t.param) {
                out.push(t.param);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.monomials.is_empty()
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constant)?;
        for m in &self.monomials {
            let sign = if m.coefficient < 0.0 { '-' } else { '+' };
            write!(f, " {sign} {}", m.coefficient.abs())?;
            for t in &m.terms {
                let name = format!("{:?}", t.param);
                write!(f, "·{}", t.func.render(&name))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sketch_types::{Param, Sketch};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn builder_groups_terms_into_monomials() {
        let mut sketch = Sketch::new();
        let x = sketch.add_param(Param::new(2.0, "x"));
        let y = sketch.add_param(Param::new(3.0, "y"));

        // 1 + 2·x·y - x^2
        let p = Polynomial::new(1.0)
            .monomial(2.0)
            .term(x, TermFn::Identity)
            .term(y, TermFn::Identity)
            .monomial(-1.0)
            .term(x, TermFn::Square);

        assert_eq!(p.monomials.len(), 2);
        assert_eq!(p.monomials[0].terms.len(), 2);
        assert_abs_diff_eq!(p.evaluate(|id| sketch.value(id)), 9.0, epsilon = 1e-12);
        assert_eq!(p.params(), vec![x, y]);
    }

    #[test]
    fn leading_term_opens_unit_monomial() {
        let mut sketch = Sketch::new();
        let x = sketch.add_param(Param::new(4.0, "x"));
        let p = Polynomial::default().term(x, TermFn::Identity);
        assert_eq!(p.monomials[0].coefficient, 1.0);
        assert_abs_diff_eq!(p.evaluate(|id| sketch.value(id)), 4.0);
    }

    #[test]
    fn empty_monomial_is_its_coefficient() {
        let p = Polynomial::new(0.5).monomial(2.0);
        assert_abs_diff_eq!(p.evaluate(|_| f64::NAN), 2.5);
    }

    #[test]
    fn term_functions_and_derivatives() {
        assert_eq!(TermFn::Cube.apply(2.0), 8.0);
        assert_eq!(TermFn::Cube.derivative(2.0), 12.0);
        assert_eq!(TermFn::Square.derivative(-1.5), -3.0);
        assert_abs_diff_eq!(TermFn::Sin.apply(FRAC_PI_2), 1.0);
        assert_abs_diff_eq!(TermFn::Cos.derivative(FRAC_PI_2), -1.0);
        assert_eq!(TermFn::Identity.derivative(123.0), 1.0);
    }

    #[test]
    fn display_renders_signed_monomials() {
        let mut sketch = Sketch::new();
        let x = sketch.add_param(Param::new(0.0, "x"));
        let p = Polynomial::new(-4.0).monomial(-2.0).term(x, TermFn::Sin);
        let text = p.to_string();
        assert!(text.starts_with("-4 - 2·sin("), "{text}");
    }
}
