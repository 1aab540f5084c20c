//! Compiles named 2D sketch constraints into polynomial residuals for an
//! external nonlinear solver, and runs modifier constraints (mirroring)
//! that rewrite managed geometry directly.
//!
//! Each residual is a [`Polynomial`]: a sum of monomials over sketch
//! parameters passed through a small function table (identity, square,
//! cube, sine, cosine). A solver drives a set of [`AlgConstraint`]s by
//! asking each to append its residuals on every iteration.

pub mod constants;
pub mod error;
pub mod instance;
pub mod polynomial;
pub mod record;
pub mod schema;
pub mod settings;

pub use constants::{ConstantDef, ConstantType, ConstantValue, Constants, ResolvedConstants, Value};
pub use error::ConstraintError;
pub use instance::AlgConstraint;
pub use polynomial::{Monomial, Polynomial, Term, TermFn};
pub use record::{ConstraintRecord, ObjectIndex};
pub use schema::{Arity, ConstraintKind, ScopeBuilder};
pub use settings::{CompileSettings, CurveParamSettings};
