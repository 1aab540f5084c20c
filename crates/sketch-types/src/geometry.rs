use std::f64::consts::TAU;

use crate::param::ParamId;
use crate::sketch::ObjectId;

// ── Primitives ──────────────────────────────────────────────────────────────

/// A free point. Visits `x, y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: ParamId,
    pub y: ParamId,
}

/// A bounded line segment parametrized by its anchor `a`, direction angle
/// `ang` (radians) and length `t`. `b` is kept consistent with
/// `a + t·(cos ang, sin ang)` by an internal consistency constraint.
///
/// Visits `a.x, a.y, b.x, b.y, ang, t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: ObjectId,
    pub b: ObjectId,
    pub ang: ParamId,
    pub t: ParamId,
}

/// A full circle. Visits `c.x, c.y, r`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub c: ObjectId,
    pub r: ParamId,
}

/// A counter-clockwise circular arc from `a` to `b` around `c`.
///
/// Visits `r, ang1, ang2, a.x, a.y, b.x, b.y, c.x, c.y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub a: ObjectId,
    pub b: ObjectId,
    pub c: ObjectId,
    pub r: ParamId,
    pub ang1: ParamId,
    pub ang2: ParamId,
}

/// An ellipse given by the endpoints of its major axis and its minor
/// radius. Visits `ep1.x, ep1.y, ep2.x, ep2.y, r`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub ep1: ObjectId,
    pub ep2: ObjectId,
    pub r: ParamId,
}

/// A cubic Bezier curve. Visits `p0, p3, p1, p2` (end points first, then
/// the inner control points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub p0: ObjectId,
    pub p1: ObjectId,
    pub p2: ObjectId,
    pub p3: ObjectId,
}

/// Anything with a center and a radius parameter (circles and arcs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Round {
    pub c: ObjectId,
    pub r: ParamId,
}

// ── Tagged geometry ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Point(Point),
    Segment(Segment),
    Circle(Circle),
    Arc(Arc),
    Ellipse(Ellipse),
    Bezier(BezierCurve),
}

/// Classification of geometry for dispatch and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Point,
    Segment,
    Circle,
    Arc,
    Ellipse,
    Bezier,
}

impl Geometry {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Geometry::Point(_) => ObjectKind::Point,
            Geometry::Segment(_) => ObjectKind::Segment,
            Geometry::Circle(_) => ObjectKind::Circle,
            Geometry::Arc(_) => ObjectKind::Arc,
            Geometry::Ellipse(_) => ObjectKind::Ellipse,
            Geometry::Bezier(_) => ObjectKind::Bezier,
        }
    }
}

// ── Derived line quantities ─────────────────────────────────────────────────

/// Unit normal and signed offset of a line, derived from its angle and
/// anchor: `nx = -sin(ang)`, `ny = cos(ang)`, `w = nx·a.x + ny·a.y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFrame {
    pub ang: f64,
    pub nx: f64,
    pub ny: f64,
    pub w: f64,
}

impl LineFrame {
    pub fn new(ang: f64, ax: f64, ay: f64) -> Self {
        let nx = -ang.sin();
        let ny = ang.cos();
        Self {
            ang,
            nx,
            ny,
            w: nx * ax + ny * ay,
        }
    }

    /// Signed distance of `(x, y)` from the line; positive on the side the
    /// normal points to.
    pub fn signed_distance(&self, x: f64, y: f64) -> f64 {
        self.nx * x + self.ny * y - self.w
    }
}

/// Wrap an angle in radians into `[0, 2π)`.
pub fn normalize_radians(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
