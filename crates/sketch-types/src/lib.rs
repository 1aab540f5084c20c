//! Geometry and parameter model for 2D sketches.
//!
//! Every numeric degree of freedom in a sketch is a [`Param`] stored in an
//! arena and addressed by a stable [`ParamId`]. Geometric objects (points,
//! segments, circles, arcs, ellipses, cubic Bezier curves) only hold
//! parameter handles and references to their child points, so an external
//! solver can mutate values without touching object structure.

pub mod error;
pub mod geometry;
pub mod mirror;
pub mod param;
pub mod sketch;

pub use error::GeometryError;
pub use geometry::*;
pub use mirror::Reflection;
pub use param::*;
pub use sketch::*;
