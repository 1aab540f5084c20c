//! Incidence and tangency on curves that need auxiliary parameters.
//!
//! Bezier constraints add a curve parameter `t` bounded to `(0, 1)` and
//! expand the cubic position and derivatives symbolically. The ellipse
//! constraint adds the point's eccentric anomaly, the major axis
//! direction and the semi-major length.

use nalgebra::Vector2;
use sketch_types::{Bound, ObjectId, Param, ParamId, Sketch};

use super::points::point_on_line;
use super::{fixed_objects, ConstraintKind, ScopeBuilder};
use crate::error::ConstraintError;
use crate::polynomial::{Polynomial, TermFn::*};

// ── Numeric evaluation ──────────────────────────────────────────────────────

fn control_points(sketch: &Sketch, curve: ObjectId) -> Result<[Vector2<f64>; 4], ConstraintError> {
    let b = sketch.bezier(curve)?;
    Ok([
        sketch.position(b.p0)?,
        sketch.position(b.p1)?,
        sketch.position(b.p2)?,
        sketch.position(b.p3)?,
    ])
}

fn bezier_point([p0, p1, p2, p3]: &[Vector2<f64>; 4], t: f64) -> Vector2<f64> {
    let s = 1.0 - t;
    p0 * (s * s * s) + p1 * (3.0 * s * s * t) + p2 * (3.0 * s * t * t) + p3 * (t * t * t)
}

fn bezier_tangent([p0, p1, p2, p3]: &[Vector2<f64>; 4], t: f64) -> Vector2<f64> {
    let s = 1.0 - t;
    (p1 - p0) * (3.0 * s * s) + (p2 - p1) * (6.0 * s * t) + (p3 - p2) * (3.0 * t * t)
}

// ── Scopes ──────────────────────────────────────────────────────────────────

/// `p0x p0y p3x p3y p1x p1y p2x p2y t px py`
pub(super) fn scope_point_on_bezier(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [pt, curve] = fixed_objects::<2>(kind, objects)?;
    scope.sketch().point(pt)?;
    scope.sketch().bezier(curve)?;
    scope.visit_object(curve)?;
    scope.curve_param("t");
    scope.visit_object(pt)
}

/// `p0x p0y p3x p3y p1x p1y p2x p2y t px py nx ny ang ax ay`
///
/// `(px, py)` is the touching point and `(nx, ny)` the curve tangent
/// there; both start from the curve evaluated at the initial `t`.
pub(super) fn scope_tangent_line_bezier(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [seg, curve] = fixed_objects::<2>(kind, objects)?;
    let s = scope.sketch().segment(seg)?;
    let cps = control_points(scope.sketch(), curve)?;
    let t0 = scope.settings().curve.initial;
    let p = bezier_point(&cps, t0);
    let n = bezier_tangent(&cps, t0);

    scope.visit_object(curve)?;
    scope.curve_param("t");
    scope.auxiliary(Param::new(p.x, "px"));
    scope.auxiliary(Param::new(p.y, "py"));
    scope.auxiliary(Param::new(n.x, "nx"));
    scope.auxiliary(Param::new(n.y, "ny"));
    scope.visit(s.ang);
    scope.visit_object(s.a)
}

/// `e1x e1y e2x e2y r theta psi l px py`
pub(super) fn scope_point_on_ellipse(
    kind: ConstraintKind,
    scope: &mut ScopeBuilder<'_>,
    objects: &[ObjectId],
) -> Result<(), ConstraintError> {
    let [pt, ellipse] = fixed_objects::<2>(kind, objects)?;
    let e = scope.sketch().ellipse(ellipse)?;
    let ep1 = scope.sketch().position(e.ep1)?;
    let ep2 = scope.sketch().position(e.ep2)?;
    let minor = scope.sketch().value(e.r);
    let p = scope.sketch().position(pt)?;

    let axis = ep2 - ep1;
    let half = axis.norm() / 2.0;
    let psi = axis.y.atan2(axis.x);
    let local = p - (ep1 + ep2) / 2.0;
    let u = local.x * psi.cos() + local.y * psi.sin();
    let v = -local.x * psi.sin() + local.y * psi.cos();
    let theta = if half > 0.0 && minor != 0.0 {
        (v / minor).atan2(u / half)
    } else {
        0.0
    };

    scope.visit_object(ellipse)?;
    scope.auxiliary(Param::new(theta, "theta"));
    scope.auxiliary(Param::new(psi, "psi"));
    scope.auxiliary(Param::new(half, "l").with_bounds(vec![Bound::GreaterThan(0.0)]));
    scope.visit_object(pt)
}

// ── Residuals ───────────────────────────────────────────────────────────────

/// One coordinate of a cubic Bezier at `t`, minus `p`:
/// `(1-t)³p0 + 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³p3 - p`.
pub fn bezier3(p: ParamId, t: ParamId, [p0, p1, p2, p3]: [ParamId; 4]) -> Polynomial {
    Polynomial::default()
        .monomial(-1.0)
        .term(t, Cube)
        .term(p0, Identity)
        .monomial(3.0)
        .term(t, Square)
        .term(p0, Identity)
        .monomial(-3.0)
        .term(t, Identity)
        .term(p0, Identity)
        .monomial(1.0)
        .term(p0, Identity)
        .monomial(3.0)
        .term(t, Cube)
        .term(p1, Identity)
        .monomial(-6.0)
        .term(t, Square)
        .term(p1, Identity)
        .monomial(3.0)
        .term(t, Identity)
        .term(p1, Identity)
        .monomial(-3.0)
        .term(t, Cube)
        .term(p2, Identity)
        .monomial(3.0)
        .term(t, Square)
        .term(p2, Identity)
        .monomial(1.0)
        .term(t, Cube)
        .term(p3, Identity)
        .monomial(-1.0)
        .term(p, Identity)
}

/// First derivative of one Bezier coordinate at `t`, minus `p`.
pub fn bezier3_d1(p: ParamId, t: ParamId, [p0, p1, p2, p3]: [ParamId; 4]) -> Polynomial {
    Polynomial::default()
        .monomial(-3.0)
        .term(p0, Identity)
        .term(t, Square)
        .monomial(6.0)
        .term(p0, Identity)
        .term(t, Identity)
        .monomial(-3.0)
        .term(p0, Identity)
        .monomial(9.0)
        .term(p1, Identity)
        .term(t, Square)
        .monomial(-12.0)
        .term(p1, Identity)
        .term(t, Identity)
        .monomial(3.0)
        .term(p1, Identity)
        .monomial(-9.0)
        .term(p2, Identity)
        .term(t, Square)
        .monomial(6.0)
        .term(p2, Identity)
        .term(t, Identity)
        .monomial(3.0)
        .term(p3, Identity)
        .term(t, Square)
        .monomial(-1.0)
        .term(p, Identity)
}

/// Second derivative of one Bezier coordinate at `t`, minus `p`.
pub fn bezier3_d2(p: ParamId, t: ParamId, [p0, p1, p2, p3]: [ParamId; 4]) -> Polynomial {
    Polynomial::default()
        .monomial(-6.0)
        .term(p0, Identity)
        .term(t, Identity)
        .monomial(6.0)
        .term(p0, Identity)
        .monomial(18.0)
        .term(p1, Identity)
        .term(t, Identity)
        .monomial(-12.0)
        .term(p1, Identity)
        .monomial(-18.0)
        .term(p2, Identity)
        .term(t, Identity)
        .monomial(6.0)
        .term(p2, Identity)
        .monomial(6.0)
        .term(p3, Identity)
        .term(t, Identity)
        .monomial(-1.0)
        .term(p, Identity)
}

pub(super) fn point_on_bezier(
    out: &mut Vec<Polynomial>,
    [p0x, p0y, p3x, p3y, p1x, p1y, p2x, p2y, t, px, py]: [ParamId; 11],
) {
    out.push(bezier3(px, t, [p0x, p1x, p2x, p3x]));
    out.push(bezier3(py, t, [p0y, p1y, p2y, p3y]));
}

pub(super) fn tangent_line_bezier(
    out: &mut Vec<Polynomial>,
    [p0x, p0y, p3x, p3y, p1x, p1y, p2x, p2y, t, px, py, nx, ny, ang, ax, ay]: [ParamId; 16],
) {
    out.push(bezier3(px, t, [p0x, p1x, p2x, p3x]));
    out.push(bezier3(py, t, [p0y, p1y, p2y, p3y]));
    out.push(bezier3_d1(nx, t, [p0x, p1x, p2x, p3x]));
    out.push(bezier3_d1(ny, t, [p0y, p1y, p2y, p3y]));
    // tangent parallel to the line direction
    out.push(
        Polynomial::default()
            .monomial(-1.0)
            .term(ny, Identity)
            .term(ang, Cos)
            .monomial(1.0)
            .term(nx, Identity)
            .term(ang, Sin),
    );
    point_on_line(out, [px, py, ax, ay, ang]);
}

/// Ellipse with major axis `e1 → e2` and minor radius `r`, parametrized by
/// eccentric anomaly `theta`, axis angle `psi` and semi-major length `l`.
pub fn point_on_ellipse(
    out: &mut Vec<Polynomial>,
    [e1x, e1y, e2x, e2y, r, theta, psi, l, px, py]: [ParamId; 10],
) {
    out.push(
        Polynomial::default()
            .monomial(1.0)
            .term(e2x, Identity)
            .monomial(-1.0)
            .term(e1x, Identity)
            .monomial(-2.0)
            .term(l, Identity)
            .term(psi, Cos),
    );
    out.push(
        Polynomial::default()
            .monomial(1.0)
            .term(e2y, Identity)
            .monomial(-1.0)
            .term(e1y, Identity)
            .monomial(-2.0)
            .term(l, Identity)
            .term(psi, Sin),
    );
    out.push(
        Polynomial::default()
            .monomial(0.5)
            .term(e1x, Identity)
            .monomial(0.5)
            .term(e2x, Identity)
            .monomial(1.0)
            .term(l, Identity)
            .term(theta, Cos)
            .term(psi, Cos)
            .monomial(-1.0)
            .term(r, Identity)
            .term(theta, Sin)
            .term(psi, Sin)
            .monomial(-1.0)
            .term(px, Identity),
    );
    out.push(
        Polynomial::default()
            .monomial(0.5)
            .term(e1y, Identity)
            .monomial(0.5)
            .term(e2y, Identity)
            .monomial(1.0)
            .term(l, Identity)
            .term(theta, Cos)
            .term(psi, Sin)
            .monomial(1.0)
            .term(r, Identity)
            .term(theta, Sin)
            .term(psi, Cos)
            .monomial(-1.0)
            .term(py, Identity),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CompileSettings;
    use approx::assert_abs_diff_eq;

    fn cps() -> [Vector2<f64>; 4] {
        [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 2.0),
            Vector2::new(3.0, 2.0),
            Vector2::new(4.0, 0.0),
        ]
    }

    #[test]
    fn symbolic_expansions_match_numeric_curve() {
        let mut sketch = Sketch::new();
        let c = cps();
        let xs = c.map(|p| sketch.add_param(Param::new(p.x, "x")));
        for t_val in [0.0, 0.3, 0.5, 0.9, 1.0] {
            let t = sketch.add_param(Param::new(t_val, "t"));
            let zero = sketch.add_param(Param::new(0.0, "p"));
            let value = |id: ParamId| sketch.value(id);

            assert_abs_diff_eq!(
                bezier3(zero, t, xs).evaluate(value),
                bezier_point(&c, t_val).x,
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(
                bezier3_d1(zero, t, xs).evaluate(value),
                bezier_tangent(&c, t_val).x,
                epsilon = 1e-12
            );
            // B'' = 6(1-t)(p2 - 2p1 + p0) + 6t(p3 - 2p2 + p1)
            let d2 = 6.0 * (1.0 - t_val) * (c[2].x - 2.0 * c[1].x + c[0].x) + 6.0 * t_val * (c[3].x - 2.0 * c[2].x + c[1].x);
            assert_abs_diff_eq!(bezier3_d2(zero, t, xs).evaluate(value), d2, epsilon = 1e-12);
        }
    }

    #[test]
    fn tangent_aux_starts_on_the_curve() {
        let mut sketch = Sketch::new();
        let seg = sketch.add_segment((0.0, 1.5), (4.0, 1.5));
        let curve = sketch.add_bezier((0.0, 0.0), (1.0, 2.0), (3.0, 2.0), (4.0, 0.0));

        let mut scope = ScopeBuilder::new(&mut sketch, CompileSettings::default());
        scope_tangent_line_bezier(ConstraintKind::TangentLineBezier, &mut scope, &[seg, curve]).unwrap();
        let (params, aux) = scope.finish();
        assert_eq!(params.len(), 16);
        assert_eq!(aux.len(), 5);

        let mut out = Vec::new();
        tangent_line_bezier(&mut out, params.as_slice().try_into().unwrap());
        let r: Vec<f64> = out.iter().map(|p| p.evaluate(|id| sketch.value(id))).collect();
        // apex of the symmetric curve is (2, 1.5) with a horizontal tangent
        for v in r {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
        let t = sketch.param(aux[0]).unwrap();
        assert!(t.satisfies_bounds());
    }

    #[test]
    fn ellipse_aux_places_point_exactly() {
        let mut sketch = Sketch::new();
        let ellipse = sketch.add_ellipse((-2.0, 1.0), (4.0, 1.0), 1.5);
        // a point on the ellipse centered at (1, 1) with semi axes 3 and 1.5
        let angle: f64 = 0.7;
        let pt = sketch.add_point(1.0 + 3.0 * angle.cos(), 1.0 + 1.5 * angle.sin());

        let mut scope = ScopeBuilder::new(&mut sketch, CompileSettings::default());
        scope_point_on_ellipse(ConstraintKind::PointOnEllipse, &mut scope, &[pt, ellipse]).unwrap();
        let (params, _) = scope.finish();

        let mut out = Vec::new();
        point_on_ellipse(&mut out, params.as_slice().try_into().unwrap());
        assert_eq!(out.len(), 4);
        for p in &out {
            assert_abs_diff_eq!(p.evaluate(|id| sketch.value(id)), 0.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(sketch.value(params[5]), angle, epsilon = 1e-9);
    }
}
