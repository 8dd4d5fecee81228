//! Boundary elements and geometric helpers
mod circular_arc;
mod flat_triangle;
mod segment;

pub use circular_arc::CircularArc;
pub use flat_triangle::FlatTriangle;
pub use segment::Segment;

use crate::traits::Element;
use crate::types::{RealScalar, ReferenceCellType};
use num::{Float, Zero};

/// Compute the unit normal and the integration element from a Jacobian.
///
/// For curves in 2D the tangent is rotated clockwise, so a curve traversed
/// counter-clockwise gets outward normals. For surfaces in 3D the normal is
/// the normalised cross product of the two columns of the Jacobian.
///
/// Returns the integration element `|det J|`.
pub fn normal_from_jacobian<T: RealScalar>(
    gdim: usize,
    tdim: usize,
    jacobian: &[T],
    normal: &mut [T],
) -> T {
    match (gdim, tdim) {
        (2, 1) => {
            let jdet = Float::sqrt(jacobian[0] * jacobian[0] + jacobian[1] * jacobian[1]);
            if jdet > T::zero() {
                normal[0] = jacobian[1] / jdet;
                normal[1] = -jacobian[0] / jdet;
            }
            jdet
        }
        (3, 2) => {
            let n = [
                jacobian[1] * jacobian[5] - jacobian[2] * jacobian[4],
                jacobian[2] * jacobian[3] - jacobian[0] * jacobian[5],
                jacobian[0] * jacobian[4] - jacobian[1] * jacobian[3],
            ];
            let jdet = Float::sqrt(n[0] * n[0] + n[1] * n[1] + n[2] * n[2]);
            if jdet > T::zero() {
                for (i, j) in normal.iter_mut().zip(n) {
                    *i = j / jdet;
                }
            }
            jdet
        }
        _ => {
            for n in normal.iter_mut() {
                *n = T::zero();
            }
            T::zero()
        }
    }
}

/// Euclidean distance between two points
pub fn distance<T: RealScalar>(a: &[T], b: &[T]) -> T {
    Float::sqrt(
        a.iter()
            .zip(b)
            .fold(T::zero(), |acc, (x, y)| acc + (*x - *y) * (*x - *y)),
    )
}

/// Project a reference point back into the reference cell
pub(crate) fn clamp_to_cell<T: RealScalar>(cell: ReferenceCellType, point: &mut [T]) {
    match cell {
        ReferenceCellType::Interval => {
            point[0] = Float::min(Float::max(point[0], T::zero()), T::one());
        }
        ReferenceCellType::Triangle => {
            point[0] = Float::max(point[0], T::zero());
            point[1] = Float::max(point[1], T::zero());
            let s = point[0] + point[1];
            if s > T::one() {
                point[0] = point[0] / s;
                point[1] = point[1] / s;
            }
        }
    }
}

/// Points of a regular lattice on a reference cell, stored point by point.
pub(crate) fn reference_lattice<T: RealScalar>(cell: ReferenceCellType, n: usize) -> Vec<T> {
    let nt = num::cast::<usize, T>(n).unwrap();
    match cell {
        ReferenceCellType::Interval => (0..=n)
            .map(|i| num::cast::<usize, T>(i).unwrap() / nt)
            .collect(),
        ReferenceCellType::Triangle => {
            let mut points = Vec::with_capacity((n + 1) * (n + 2));
            for i in 0..=n {
                for j in 0..=n - i {
                    points.push(num::cast::<usize, T>(i).unwrap() / nt);
                    points.push(num::cast::<usize, T>(j).unwrap() / nt);
                }
            }
            points
        }
    }
}

/// Find the point of an element closest to a physical point.
///
/// The element is sampled on a reference lattice and the best sample is
/// refined by projected Gauss-Newton steps. Returns the reference coordinates
/// of the closest point and its distance.
pub fn closest_point<E: Element>(element: &E, point: &[E::T]) -> (Vec<E::T>, E::T) {
    let cell = element.reference_cell();
    let tdim = cell.dim();
    let gdim = element.geometry_dim();
    let lattice = reference_lattice::<E::T>(cell, 8);

    let mut physical = vec![E::T::zero(); gdim];
    let mut best = vec![E::T::zero(); tdim];
    let mut best_dist = <E::T as Float>::infinity();
    for r in lattice.chunks_exact(tdim) {
        element.reference_to_physical(r, &mut physical);
        let d = distance(&physical, point);
        if d < best_dist {
            best_dist = d;
            best.copy_from_slice(r);
        }
    }

    let mut jac = vec![E::T::zero(); gdim * tdim];
    let mut candidate = vec![E::T::zero(); tdim];
    for _ in 0..64 {
        element.reference_to_physical(&best, &mut physical);
        element.jacobian(&best, &mut jac);
        let residual = point
            .iter()
            .zip(&physical)
            .map(|(p, q)| *p - *q)
            .collect::<Vec<_>>();

        // Normal equations J^T J d = J^T r
        let mut jtj = [E::T::zero(); 4];
        let mut jtr = [E::T::zero(); 2];
        for a in 0..tdim {
            for i in 0..gdim {
                jtr[a] = jtr[a] + jac[i + gdim * a] * residual[i];
            }
            for b in 0..tdim {
                for i in 0..gdim {
                    jtj[a * tdim + b] = jtj[a * tdim + b] + jac[i + gdim * a] * jac[i + gdim * b];
                }
            }
        }
        let step = if tdim == 1 {
            if jtj[0] == E::T::zero() {
                break;
            }
            [jtr[0] / jtj[0], E::T::zero()]
        } else {
            let det = jtj[0] * jtj[3] - jtj[1] * jtj[2];
            if det == E::T::zero() {
                break;
            }
            [
                (jtj[3] * jtr[0] - jtj[1] * jtr[1]) / det,
                (jtj[0] * jtr[1] - jtj[2] * jtr[0]) / det,
            ]
        };
        for (c, (b, s)) in candidate.iter_mut().zip(best.iter().zip(step)) {
            *c = *b + s;
        }
        clamp_to_cell(cell, &mut candidate);
        element.reference_to_physical(&candidate, &mut physical);
        let d = distance(&physical, point);
        if d < best_dist {
            let moved = distance(&candidate, &best);
            best_dist = d;
            best.copy_from_slice(&candidate);
            if moved < num::cast::<f64, E::T>(1e-14).unwrap() {
                break;
            }
        } else {
            break;
        }
    }
    (best, best_dist)
}

/// Centre and radius of a ball containing the element.
///
/// The ball is estimated from points sampled on the element.
pub fn bounding_ball<E: Element>(element: &E) -> (Vec<E::T>, E::T) {
    let cell = element.reference_cell();
    let tdim = cell.dim();
    let gdim = element.geometry_dim();
    let lattice = reference_lattice::<E::T>(cell, 6);
    let npts = lattice.len() / tdim;
    let mut physical = vec![E::T::zero(); gdim * npts];
    for (r, p) in lattice
        .chunks_exact(tdim)
        .zip(physical.chunks_exact_mut(gdim))
    {
        element.reference_to_physical(r, p);
    }
    let mut centre = vec![E::T::zero(); gdim];
    for p in physical.chunks_exact(gdim) {
        for (c, x) in centre.iter_mut().zip(p) {
            *c = *c + *x;
        }
    }
    let scale = num::cast::<usize, E::T>(npts).unwrap();
    for c in centre.iter_mut() {
        *c = *c / scale;
    }
    let radius = physical
        .chunks_exact(gdim)
        .map(|p| distance(p, &centre))
        .fold(E::T::zero(), Float::max);
    (centre, radius)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_of_counter_clockwise_segment_points_outward() {
        // Bottom edge of the unit square, traversed left to right
        let seg = Segment::new([0.0, 0.0], [1.0, 0.0]);
        let mut jac = [0.0; 2];
        let mut normal = [0.0; 2];
        seg.jacobian(&[0.5], &mut jac);
        let jdet = normal_from_jacobian(2, 1, &jac, &mut normal);
        assert_relative_eq!(jdet, 1.0);
        assert_relative_eq!(normal[0], 0.0);
        assert_relative_eq!(normal[1], -1.0);
    }

    #[test]
    fn test_closest_point_on_segment() {
        let seg = Segment::new([0.0, 0.0], [2.0, 0.0]);
        let (r, d) = closest_point(&seg, &[0.5, 0.3]);
        assert_relative_eq!(r[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(d, 0.3, epsilon = 1e-12);

        let (r, d) = closest_point(&seg, &[-1.0, 0.0]);
        assert_relative_eq!(r[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(d, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_closest_point_on_arc() {
        let arc = CircularArc::new([0.0, 0.0], 1.0, 0.0, 1.0);
        let (r, d) = closest_point(&arc, &[0.5 * f64::cos(0.3), 0.5 * f64::sin(0.3)]);
        assert_relative_eq!(r[0], 0.3, epsilon = 1e-8);
        assert_relative_eq!(d, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_closest_point_on_triangle() {
        let tri = FlatTriangle::new([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let (r, d) = closest_point(&tri, &[0.2, 0.3, 0.5]);
        assert_relative_eq!(r[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(r[1], 0.3, epsilon = 1e-12);
        assert_relative_eq!(d, 0.5, epsilon = 1e-12);

        let (_, d) = closest_point(&tri, &[1.0, 1.0, 0.0]);
        assert_relative_eq!(d, f64::sqrt(0.5), epsilon = 1e-10);
    }

    #[test]
    fn test_bounding_ball_contains_vertices() {
        let tri = FlatTriangle::new([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let (centre, radius) = bounding_ball(&tri);
        for v in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            assert!(distance(&centre, &v) <= radius + 1e-14);
        }
    }
}
