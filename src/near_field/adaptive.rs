//! Adaptive subdivision of source elements for near targets
use crate::near_field::singular::{relative_change, Divergence, ElementIntegrator};
use crate::quadrature::gauss::gauss_legendre;
use crate::quadrature::simplex_rules::collapsed_gauss_triangle;
use crate::quadrature::types::NumericalQuadratureDefinition;
use crate::traits::{Element, LayerKernel};
use crate::types::ReferenceCellType;
use num::{Float, Zero};
use rlst::RlstScalar;

/// A piece of the reference cell, given by its vertices
#[derive(Debug, Clone)]
struct Piece {
    vertices: Vec<f64>,
    depth: usize,
}

impl Piece {
    fn new(cell: ReferenceCellType) -> Self {
        Self {
            vertices: cell.vertices().to_vec(),
            depth: 0,
        }
    }

    /// Map a reference rule onto the piece
    fn map(&self, cell: ReferenceCellType, rule: &NumericalQuadratureDefinition) -> (Vec<f64>, Vec<f64>) {
        let v = &self.vertices;
        match cell {
            ReferenceCellType::Interval => {
                let length = v[1] - v[0];
                (
                    rule.points.iter().map(|t| v[0] + t * length).collect(),
                    rule.weights.iter().map(|w| w * length).collect(),
                )
            }
            ReferenceCellType::Triangle => {
                let e1 = [v[2] - v[0], v[3] - v[1]];
                let e2 = [v[4] - v[0], v[5] - v[1]];
                let det = f64::abs(e1[0] * e2[1] - e1[1] * e2[0]);
                let mut points = Vec::with_capacity(rule.points.len());
                for p in rule.points.chunks_exact(2) {
                    points.push(v[0] + p[0] * e1[0] + p[1] * e2[0]);
                    points.push(v[1] + p[0] * e1[1] + p[1] * e2[1]);
                }
                (points, rule.weights.iter().map(|w| w * det).collect())
            }
        }
    }

    /// Split into two halves (intervals) or four similar triangles
    fn split(&self, cell: ReferenceCellType) -> Vec<Piece> {
        let v = &self.vertices;
        let depth = self.depth + 1;
        match cell {
            ReferenceCellType::Interval => {
                let mid = 0.5 * (v[0] + v[1]);
                vec![
                    Piece {
                        vertices: vec![v[0], mid],
                        depth,
                    },
                    Piece {
                        vertices: vec![mid, v[1]],
                        depth,
                    },
                ]
            }
            ReferenceCellType::Triangle => {
                let mid = |a: usize, b: usize| [0.5 * (v[2 * a] + v[2 * b]), 0.5 * (v[2 * a + 1] + v[2 * b + 1])];
                let m01 = mid(0, 1);
                let m12 = mid(1, 2);
                let m20 = mid(2, 0);
                [
                    [[v[0], v[1]], m01, m20],
                    [m01, [v[2], v[3]], m12],
                    [m20, m12, [v[4], v[5]]],
                    [m12, m20, m01],
                ]
                .into_iter()
                .map(|t| Piece {
                    vertices: t.into_iter().flatten().collect(),
                    depth,
                })
                .collect()
            }
        }
    }
}

/// Integrate over an element by recursive subdivision.
///
/// A piece is accepted when its value differs from the sum over its children
/// by less than `tolerance` times the size of the whole integral, and split
/// further otherwise. Pieces may be split at most `max_depth` times.
pub(crate) fn integrate_adaptively<K: LayerKernel, E: Element<T = K::Real>>(
    integrator: &ElementIntegrator<'_, K, E>,
    order: usize,
    tolerance: f64,
    max_depth: usize,
) -> Result<Vec<K::T>, Divergence> {
    let cell = integrator.cell();
    let rule = match cell {
        ReferenceCellType::Interval => gauss_legendre(order),
        ReferenceCellType::Triangle => collapsed_gauss_triangle(order),
    };
    let evaluate = |piece: &Piece| {
        let (points, weights) = piece.map(cell, &rule);
        let mut result = vec![K::T::zero(); integrator.result_size()];
        integrator.accumulate(&points, &weights, &mut result);
        result
    };

    let root = Piece::new(cell);
    let whole = evaluate(&root);
    let scale = whole
        .iter()
        .fold(<K::Real as Zero>::zero(), |acc, v| Float::max(acc, RlstScalar::abs(*v)));
    let tol = num::cast::<f64, K::Real>(tolerance).unwrap()
        * if scale > <K::Real as Zero>::zero() {
            scale
        } else {
            <K::Real as num::One>::one()
        };

    let mut total = vec![K::T::zero(); integrator.result_size()];
    let mut stack = vec![(root, whole)];
    while let Some((piece, value)) = stack.pop() {
        let children = piece
            .split(cell)
            .into_iter()
            .map(|child| {
                let v = evaluate(&child);
                (child, v)
            })
            .collect::<Vec<_>>();
        let mut sum = vec![K::T::zero(); value.len()];
        for (_, v) in &children {
            for (s, c) in sum.iter_mut().zip(v) {
                *s += *c;
            }
        }
        let error = sum
            .iter()
            .zip(&value)
            .fold(<K::Real as Zero>::zero(), |acc, (a, b)| {
                Float::max(acc, RlstScalar::abs(*a - *b))
            });
        if error <= tol {
            for (t, s) in total.iter_mut().zip(&sum) {
                *t += *s;
            }
        } else if piece.depth >= max_depth {
            return Err(Divergence {
                levels: piece.depth,
                estimate: num::cast::<K::Real, f64>(relative_change(&sum, &value))
                    .unwrap_or(f64::INFINITY),
            });
        } else {
            stack.extend(children);
        }
    }
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{FlatTriangle, Segment};
    use crate::kernel::{Laplace2dKernel, Laplace3dKernel, SingleLayer};
    use crate::near_field::interpolation::NodalInterpolant;
    use crate::quadrature::simplex_rules::simplex_rule;
    use approx::assert_relative_eq;

    #[test]
    fn test_split_triangle_preserves_area() {
        let root = Piece::new(ReferenceCellType::Triangle);
        let rule = collapsed_gauss_triangle(2);
        let area = root
            .split(ReferenceCellType::Triangle)
            .iter()
            .map(|p| p.map(ReferenceCellType::Triangle, &rule).1.iter().sum::<f64>())
            .sum::<f64>();
        assert_relative_eq!(area, 0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_adaptive_near_segment() {
        // -1/2π ∫ ln sqrt((t - 1/2)² + d²) dt over [0, 1]
        let d: f64 = 1e-3;
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let element = Segment::new([0.0, 0.0], [1.0, 0.0]);
        let rule = simplex_rule(ReferenceCellType::Interval, 2).unwrap();
        let interpolant = NodalInterpolant::new(&rule).unwrap();
        let target = [0.5, d];
        let integrator = ElementIntegrator::new(&kernel, &element, &interpolant, &target, &[0.0, 1.0]);
        let values = integrate_adaptively(&integrator, 6, 1e-10, 30).unwrap();
        let antiderivative = |t: f64| t * (t * t + d * d).ln() / 2.0 - t + d * (t / d).atan();
        let exact = -(antiderivative(0.5) - antiderivative(-0.5)) / (2.0 * std::f64::consts::PI);
        assert_relative_eq!(values.iter().sum::<f64>(), exact, max_relative = 1e-8);
    }

    #[test]
    fn test_adaptive_gives_up_at_depth_limit() {
        let kernel = SingleLayer::new(Laplace3dKernel::<f64>::new());
        let element = FlatTriangle::new([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let rule = simplex_rule(ReferenceCellType::Triangle, 1).unwrap();
        let interpolant = NodalInterpolant::new(&rule).unwrap();
        let target = [0.3, 0.3, 1e-8];
        let integrator =
            ElementIntegrator::new(&kernel, &element, &interpolant, &target, &[0.0, 0.0, 1.0]);
        let result = integrate_adaptively(&integrator, 2, 1e-12, 1);
        assert!(matches!(result, Err(Divergence { levels: 1, .. })));
    }
}
