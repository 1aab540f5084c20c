//! Test harness for sketch constraint development.
//!
//! Provides programmatic tools for scripting constraint workflows on a
//! sketch, verifying correctness at every step, and generating diagnostic
//! output.
//!
//! # Key Components
//!
//! - [`SketchBuilder`]: Fluent API for building and verifying constrained sketches
//! - [`oracle`]: Verification functions returning pass/fail verdicts
//! - [`report`]: Structured text sketch descriptions
//! - [`helpers`]: Error type, residual evaluation, profile builders
//! - [`assertions`]: Rich assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::SketchReport;
pub use workflow::SketchBuilder;
