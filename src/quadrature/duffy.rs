//! Rules for integrands that are singular at a point of the reference cell.
//!
//! Both rules cluster their points around the singular point so that the
//! integrand times the Jacobian of the transformation is smooth.
use crate::quadrature::gauss::gauss_legendre_points_weights;
use crate::quadrature::types::{NumericalQuadratureDefinition, RuleFamily};
use itertools::Itertools;

/// Grading exponent used on intervals
pub const GRADING: i32 = 3;

/// Apply a callable to each tuple chunk (single point) of an array.
///
/// Each 2-tuple in `points` represents a 2d point. The callable is applied to
/// each point and transforms it to a new point.
pub(crate) fn transform_coords(points: &mut [f64], fun: &impl Fn((f64, f64)) -> (f64, f64)) {
    for (first, second) in points.iter_mut().tuples() {
        (*first, *second) = fun((*first, *second));
    }
}

/// A graded rule on \[0, 1\] split at `split`.
///
/// Each side of the split point uses `npoints` Gauss points in a variable `s`
/// with `|t - split| = length * s^GRADING`, so the points accumulate at the split.
pub fn graded_interval_rule(split: f64, npoints: usize) -> NumericalQuadratureDefinition {
    let (gp, gw) = gauss_legendre_points_weights(npoints);
    let p = GRADING as f64;
    let mut points = Vec::with_capacity(2 * npoints);
    let mut weights = Vec::with_capacity(2 * npoints);
    for (sign, length) in [(-1.0, split), (1.0, 1.0 - split)] {
        if length <= 0.0 {
            continue;
        }
        for (s, w) in gp.iter().zip(&gw) {
            points.push(split + sign * length * s.powi(GRADING));
            weights.push(w * length * p * s.powi(GRADING - 1));
        }
    }
    NumericalQuadratureDefinition {
        dim: 1,
        order: 2 * npoints - 1,
        npoints: points.len(),
        family: RuleFamily::Transformed,
        weights,
        points,
    }
}

/// A rule on the reference triangle for an integrand singular at `point`.
///
/// The triangle is split into three sub-triangles with a common vertex at
/// `point`. Each is the image of the unit square under the Duffy map
/// `y = P + u (A - P) + u v (B - A)`, whose Jacobian vanishes like `u` at the
/// singular point. The radial variable is graded as `u = s^GRADING` so that
/// targets close to but off the element are resolved as well. Sub-triangles of
/// zero area are skipped.
pub fn triangle_point_rule(point: [f64; 2], npoints: usize) -> NumericalQuadratureDefinition {
    let (gp, gw) = gauss_legendre_points_weights(npoints);
    let p = GRADING as f64;
    let vertices = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
    let mut points = Vec::with_capacity(6 * npoints * npoints);
    let mut weights = Vec::with_capacity(3 * npoints * npoints);
    for k in 0..3 {
        let a = vertices[k];
        let b = vertices[(k + 1) % 3];
        let ap = (a.0 - point[0], a.1 - point[1]);
        let ba = (b.0 - a.0, b.1 - a.1);
        let det = (ap.0 * ba.1 - ap.1 * ba.0).abs();
        if det <= 1e-14 {
            continue;
        }
        let start = points.len();
        for (s, ws) in gp.iter().zip(&gw) {
            let u = s.powi(GRADING);
            let wu = ws * p * s.powi(GRADING - 1);
            for (v, wv) in gp.iter().zip(&gw) {
                points.push(u);
                points.push(*v);
                weights.push(wu * wv * u * det);
            }
        }
        transform_coords(&mut points[start..], &|(u, v)| {
            (
                point[0] + u * ap.0 + u * v * ba.0,
                point[1] + u * ap.1 + u * v * ba.1,
            )
        });
    }
    NumericalQuadratureDefinition {
        dim: 2,
        order: 2 * npoints - 2,
        npoints: weights.len(),
        family: RuleFamily::Transformed,
        weights,
        points,
    }
}
