//! The fixed catalog of constraint kinds.
//!
//! Every kind knows how to enumerate the parameters its residuals are
//! built over, how to build those residuals (or, for modifiers, how to
//! rewrite managed geometry), and which named constants it takes.
//! Composite kinds reuse the residual helpers of the kinds they are made
//! of, so the helpers are public.

mod consistency;
mod curves;
mod measures;
mod mirror;
mod orientation;
mod points;
mod scope;
mod tangency;

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use sketch_types::{ObjectId, ParamId, Sketch};

use crate::constants::{ConstantDef, ResolvedConstants, Value};
use crate::error::ConstraintError;
use crate::polynomial::Polynomial;

pub use consistency::{arc_consistency, polar};
pub use curves::{bezier3, bezier3_d1, bezier3_d2, point_on_ellipse};
pub use measures::{equal, fixed_value};
pub use orientation::{angle, angle_between, nearest_horizontal, nearest_vertical};
pub use points::{coincident, distance_pl, distance_pp, lock_point, point_in_middle, point_on_circle, point_on_line, symmetry};
pub use scope::ScopeBuilder;
pub use tangency::tangent_lc;

/// Id under which RadiusLength was persisted by older writers.
pub const LEGACY_RADIUS_LENGTH_ID: &str = "RaduisLength";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    PCoincident,
    TangentLC,
    PointOnLine,
    PointOnCircle,
    PointOnBezier,
    TangentLineBezier,
    PointOnEllipse,
    PointInMiddle,
    Symmetry,
    DistancePP,
    DistancePL,
    Angle,
    Vertical,
    Horizontal,
    AngleBetween,
    Perpendicular,
    Parallel,
    SegmentLength,
    RadiusLength,
    Polar,
    EqualRadius,
    EqualLength,
    LockPoint,
    ArcConsistency,
    SegmentConsistency,
    Fillet,
    Mirror,
}

/// How many objects a kind takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// A mirror line followed by equally many sources and targets.
    Mirror,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Mirror => count >= 3 && count % 2 == 1,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Mirror => write!(f, "an odd number (at least 3) of"),
        }
    }
}

static REGISTRY: LazyLock<HashMap<&'static str, ConstraintKind>> = LazyLock::new(|| {
    let mut table: HashMap<_, _> = ConstraintKind::ALL.iter().map(|k| (k.id(), *k)).collect();
    table.insert(LEGACY_RADIUS_LENGTH_ID, ConstraintKind::RadiusLength);
    table
});

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 27] = [
        ConstraintKind::PCoincident,
        ConstraintKind::TangentLC,
        ConstraintKind::PointOnLine,
        ConstraintKind::PointOnCircle,
        ConstraintKind::PointOnBezier,
        ConstraintKind::TangentLineBezier,
        ConstraintKind::PointOnEllipse,
        ConstraintKind::PointInMiddle,
        ConstraintKind::Symmetry,
        ConstraintKind::DistancePP,
        ConstraintKind::DistancePL,
        ConstraintKind::Angle,
        ConstraintKind::Vertical,
        ConstraintKind::Horizontal,
        ConstraintKind::AngleBetween,
        ConstraintKind::Perpendicular,
        ConstraintKind::Parallel,
        ConstraintKind::SegmentLength,
        ConstraintKind::RadiusLength,
        ConstraintKind::Polar,
        ConstraintKind::EqualRadius,
        ConstraintKind::EqualLength,
        ConstraintKind::LockPoint,
        ConstraintKind::ArcConsistency,
        ConstraintKind::SegmentConsistency,
        ConstraintKind::Fillet,
        ConstraintKind::Mirror,
    ];

    /// Look a kind up by its persisted id.
    pub fn from_id(id: &str) -> Result<Self, ConstraintError> {
        REGISTRY
            .get(id)
            .copied()
            .ok_or_else(|| ConstraintError::UnknownSchema(id.to_string()))
    }

    /// Persisted identifier.
    pub fn id(self) -> &'static str {
        match self {
            ConstraintKind::PCoincident => "PCoincident",
            ConstraintKind::TangentLC => "TangentLC",
            ConstraintKind::PointOnLine => "PointOnLine",
            ConstraintKind::PointOnCircle => "PointOnCircle",
            ConstraintKind::PointOnBezier => "PointOnBezier",
            ConstraintKind::TangentLineBezier => "TangentLineBezier",
            ConstraintKind::PointOnEllipse => "PointOnEllipse",
            ConstraintKind::PointInMiddle => "PointInMiddle",
            ConstraintKind::Symmetry => "Symmetry",
            ConstraintKind::DistancePP => "DistancePP",
            ConstraintKind::DistancePL => "DistancePL",
            ConstraintKind::Angle => "Angle",
            ConstraintKind::Vertical => "Vertical",
            ConstraintKind::Horizontal => "Horizontal",
            ConstraintKind::AngleBetween => "AngleBetween",
            ConstraintKind::Perpendicular => "Perpendicular",
            ConstraintKind::Parallel => "Parallel",
            ConstraintKind::SegmentLength => "SegmentLength",
            ConstraintKind::RadiusLength => "RadiusLength",
            ConstraintKind::Polar => "Polar",
            ConstraintKind::EqualRadius => "EqualRadius",
            ConstraintKind::EqualLength => "EqualLength",
            ConstraintKind::LockPoint => "LockPoint",
            ConstraintKind::ArcConsistency => "ArcConsistency",
            ConstraintKind::SegmentConsistency => "SegmentConsistency",
            ConstraintKind::Fillet => "Fillet",
            ConstraintKind::Mirror => "Mirror",
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ConstraintKind::PCoincident => "Two Points Coincidence",
            ConstraintKind::TangentLC => "Line & Circle Tangency",
            ConstraintKind::PointOnLine => "Point On Line",
            ConstraintKind::PointOnCircle => "Point On Circle",
            ConstraintKind::PointOnBezier => "Point On Bezier Curve",
            ConstraintKind::TangentLineBezier => "Line & Bezier Tangency",
            ConstraintKind::PointOnEllipse => "Point On Ellipse",
            ConstraintKind::PointInMiddle => "Middle Point",
            ConstraintKind::Symmetry => "Symmetry",
            ConstraintKind::DistancePP => "Distance Between Two Points",
            ConstraintKind::DistancePL => "Distance Between Point And Line",
            ConstraintKind::Angle => "Absolute Line Angle",
            ConstraintKind::Vertical => "Line Verticality",
            ConstraintKind::Horizontal => "Line Horizontality",
            ConstraintKind::AngleBetween => "Angle Between Two Lines",
            ConstraintKind::Perpendicular => "Perpendicular",
            ConstraintKind::Parallel => "Parallel",
            ConstraintKind::SegmentLength => "Segment Length",
            ConstraintKind::RadiusLength => "Radius Length",
            ConstraintKind::Polar => "Polar Coordinate",
            ConstraintKind::EqualRadius => "Equal Radius",
            ConstraintKind::EqualLength => "Equal Length",
            ConstraintKind::LockPoint => "Lock Point",
            ConstraintKind::ArcConsistency => "Arc Consistency",
            ConstraintKind::SegmentConsistency => "Segment Consistency",
            ConstraintKind::Fillet => "Fillet Between Two Lines",
            ConstraintKind::Mirror => "Mirror Objects",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            ConstraintKind::Angle
            | ConstraintKind::Vertical
            | ConstraintKind::Horizontal
            | ConstraintKind::SegmentLength
            | ConstraintKind::RadiusLength
            | ConstraintKind::LockPoint
            | ConstraintKind::ArcConsistency
            | ConstraintKind::SegmentConsistency => Arity::Exact(1),
            ConstraintKind::Polar | ConstraintKind::Fillet => Arity::Exact(3),
            ConstraintKind::Mirror => Arity::Mirror,
            _ => Arity::Exact(2),
        }
    }

    pub fn is_modifier(self) -> bool {
        matches!(self, ConstraintKind::Mirror)
    }

    /// Whether the kind can re-read its constants from current geometry.
    pub fn resyncs_constants(self) -> bool {
        matches!(
            self,
            ConstraintKind::Angle
                | ConstraintKind::Vertical
                | ConstraintKind::Horizontal
                | ConstraintKind::Perpendicular
                | ConstraintKind::Parallel
                | ConstraintKind::SegmentLength
                | ConstraintKind::LockPoint
        )
    }

    pub fn constant_defs(self) -> &'static [ConstantDef] {
        match self {
            ConstraintKind::TangentLC => tangency::TANGENT_LC,
            ConstraintKind::Fillet => tangency::FILLET,
            ConstraintKind::DistancePP => points::DISTANCE_PP,
            ConstraintKind::DistancePL => points::DISTANCE_PL,
            ConstraintKind::LockPoint => points::LOCK_POINT,
            ConstraintKind::Angle => orientation::ANGLE,
            ConstraintKind::Vertical => orientation::VERTICAL,
            ConstraintKind::Horizontal => orientation::HORIZONTAL,
            ConstraintKind::AngleBetween => orientation::ANGLE_BETWEEN,
            ConstraintKind::Perpendicular => orientation::PERPENDICULAR,
            ConstraintKind::Parallel => orientation::PARALLEL,
            ConstraintKind::SegmentLength => measures::SEGMENT_LENGTH,
            ConstraintKind::RadiusLength => measures::RADIUS_LENGTH,
            _ => &[],
        }
    }

    /// Append the parameters the residuals are built over, in the order
    /// [`collect_polynomials`](Self::collect_polynomials) expects them.
    pub fn define_params_scope(self, scope: &mut ScopeBuilder<'_>, objects: &[ObjectId]) -> Result<(), ConstraintError> {
        match self {
            ConstraintKind::PCoincident => points::scope_pp(self, scope, objects),
            ConstraintKind::DistancePP => points::scope_pp(self, scope, objects),
            ConstraintKind::PointOnLine => points::scope_point_on_line(self, scope, objects),
            ConstraintKind::PointOnCircle => points::scope_point_on_circle(self, scope, objects),
            ConstraintKind::PointInMiddle => points::scope_point_in_middle(self, scope, objects, false),
            ConstraintKind::Symmetry => points::scope_point_in_middle(self, scope, objects, true),
            ConstraintKind::DistancePL => points::scope_distance_pl(self, scope, objects),
            ConstraintKind::LockPoint => points::scope_lock_point(self, scope, objects),
            ConstraintKind::TangentLC => tangency::scope_tangent_lc(self, scope, objects),
            ConstraintKind::Fillet => tangency::scope_fillet(self, scope, objects),
            ConstraintKind::PointOnBezier => curves::scope_point_on_bezier(self, scope, objects),
            ConstraintKind::TangentLineBezier => curves::scope_tangent_line_bezier(self, scope, objects),
            ConstraintKind::PointOnEllipse => curves::scope_point_on_ellipse(self, scope, objects),
            ConstraintKind::Angle | ConstraintKind::Vertical | ConstraintKind::Horizontal => {
                orientation::scope_angle(self, scope, objects)
            }
            ConstraintKind::AngleBetween | ConstraintKind::Perpendicular | ConstraintKind::Parallel => {
                orientation::scope_angle_between(self, scope, objects)
            }
            ConstraintKind::SegmentLength => measures::scope_segment_length(self, scope, objects),
            ConstraintKind::RadiusLength => measures::scope_radius_length(self, scope, objects),
            ConstraintKind::EqualRadius => measures::scope_equal_radius(self, scope, objects),
            ConstraintKind::EqualLength => measures::scope_equal_length(self, scope, objects),
            ConstraintKind::Polar => consistency::scope_polar(self, scope, objects),
            ConstraintKind::ArcConsistency => consistency::scope_arc(self, scope, objects),
            ConstraintKind::SegmentConsistency => consistency::scope_segment(self, scope, objects),
            ConstraintKind::Mirror => Ok(()),
        }
    }

    /// Append this kind's residuals over `params` to `out`. Modifiers build
    /// no residuals.
    pub fn collect_polynomials(
        self,
        out: &mut Vec<Polynomial>,
        params: &[ParamId],
        constants: &ResolvedConstants,
    ) -> Result<(), ConstraintError> {
        match self {
            ConstraintKind::PCoincident => coincident(out, fixed_params(self, params)?),
            ConstraintKind::PointOnLine => point_on_line(out, fixed_params(self, params)?),
            ConstraintKind::PointOnCircle => point_on_circle(out, fixed_params(self, params)?),
            ConstraintKind::PointInMiddle => point_in_middle(out, fixed_params(self, params)?),
            ConstraintKind::Symmetry => symmetry(out, fixed_params(self, params)?),
            ConstraintKind::DistancePP => distance_pp(out, fixed_params(self, params)?, constants.number("distance")),
            ConstraintKind::DistancePL => distance_pl(
                out,
                fixed_params(self, params)?,
                constants.number("distance"),
                constants.flag("inverted"),
            ),
            ConstraintKind::LockPoint => {
                lock_point(out, fixed_params(self, params)?, constants.number("x"), constants.number("y"))
            }
            ConstraintKind::TangentLC => {
                let [ang, ax, ay, cx, cy, r] = fixed_params::<6>(self, params)?;
                out.push(tangent_lc([ang, ax, ay, cx, cy, r], constants.flag("inverted")));
            }
            ConstraintKind::Fillet => {
                let [ang1, ax1, ay1, ang2, ax2, ay2, cx, cy, r] = fixed_params::<9>(self, params)?;
                out.push(tangent_lc([ang1, ax1, ay1, cx, cy, r], constants.flag("inverted1")));
                out.push(tangent_lc([ang2, ax2, ay2, cx, cy, r], constants.flag("inverted2")));
            }
            ConstraintKind::PointOnBezier => curves::point_on_bezier(out, fixed_params(self, params)?),
            ConstraintKind::TangentLineBezier => curves::tangent_line_bezier(out, fixed_params(self, params)?),
            ConstraintKind::PointOnEllipse => point_on_ellipse(out, fixed_params(self, params)?),
            ConstraintKind::Angle | ConstraintKind::Vertical | ConstraintKind::Horizontal => {
                angle(out, fixed_params(self, params)?, constants.number("angle"))
            }
            ConstraintKind::AngleBetween | ConstraintKind::Perpendicular | ConstraintKind::Parallel => {
                angle_between(out, fixed_params(self, params)?, constants.number("angle"))
            }
            ConstraintKind::SegmentLength | ConstraintKind::RadiusLength => {
                fixed_value(out, fixed_params(self, params)?, constants.number("length"))
            }
            ConstraintKind::EqualRadius | ConstraintKind::EqualLength => equal(out, fixed_params(self, params)?),
            ConstraintKind::Polar | ConstraintKind::SegmentConsistency => polar(out, fixed_params(self, params)?),
            ConstraintKind::ArcConsistency => arc_consistency(out, fixed_params(self, params)?),
            ConstraintKind::Mirror => {}
        }
        Ok(())
    }

    /// Split a modifier's objects into `(reference, managed)`. `None` for
    /// kinds that are not modifiers.
    pub fn split_objects(self, objects: &[ObjectId]) -> Option<(&[ObjectId], &[ObjectId])> {
        match self {
            ConstraintKind::Mirror => Some(mirror::split(objects)),
            _ => None,
        }
    }

    /// Recompute managed geometry from reference geometry.
    pub fn modify(
        self,
        sketch: &mut Sketch,
        reference: &[ObjectId],
        managed: &[ObjectId],
        _constants: &ResolvedConstants,
    ) -> Result<(), ConstraintError> {
        match self {
            ConstraintKind::Mirror => mirror::modify(sketch, reference, managed),
            _ => Err(ConstraintError::NotAModifier(self.id())),
        }
    }

    /// Every constant's initial value computed from current geometry.
    pub fn initial_constants(self, sketch: &Sketch, objects: &[ObjectId]) -> Result<Vec<(&'static str, Value)>, ConstraintError> {
        self.constant_defs()
            .iter()
            .map(|def| Ok((def.name, (def.initial)(sketch, objects)?)))
            .collect()
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────────

fn fixed_params<const N: usize>(kind: ConstraintKind, params: &[ParamId]) -> Result<[ParamId; N], ConstraintError> {
    params.try_into().map_err(|_| ConstraintError::ScopeMismatch {
        schema: kind.id(),
        expected: N,
        found: params.len(),
    })
}

pub(crate) fn fixed_objects<const N: usize>(
    kind: ConstraintKind,
    objects: &[ObjectId],
) -> Result<[ObjectId; N], ConstraintError> {
    objects.try_into().map_err(|_| ConstraintError::Arity {
        schema: kind.id(),
        expected: kind.arity().to_string(),
        found: objects.len(),
    })
}
