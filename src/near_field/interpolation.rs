//! Interpolation of densities through the quadrature nodes of an element
use crate::quadrature::gauss::gauss_legendre_points_weights;
use crate::quadrature::types::{NumericalQuadratureDefinition, RuleFamily};
use crate::types::{BieError, Result, RlstArray};
use rlst::{rlst_dynamic_array2, RandomAccessByRef, RandomAccessMut};

/// Values of the Lagrange polynomials through `nodes` at `t`
fn lagrange(nodes: &[f64], t: f64, values: &mut [f64]) {
    for (j, v) in values.iter_mut().enumerate() {
        *v = nodes
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != j)
            .fold(1.0, |acc, (_, x)| acc * (t - x) / (nodes[j] - x));
    }
}

/// Monomials of total degree at most `degree` in two variables
fn monomials(degree: usize, point: &[f64], values: &mut [f64]) {
    let mut index = 0;
    for total in 0..=degree {
        for a in 0..=total {
            values[index] = point[0].powi((total - a) as i32) * point[1].powi(a as i32);
            index += 1;
        }
    }
}

enum Interpolant {
    Interval { nodes: Vec<f64> },
    Collapsed { nodes: Vec<f64> },
    Monomial {
        degree: usize,
        coefficients: RlstArray<f64, 2>,
    },
}

/// The nodal basis of a reference rule.
///
/// Basis function `j` is one at node `j` of the rule and zero at all other
/// nodes, so the density on an element is represented by its values at the
/// quadrature points.
pub struct NodalInterpolant {
    npoints: usize,
    interpolant: Interpolant,
}

impl NodalInterpolant {
    /// Create the nodal basis of a rule
    pub fn new(rule: &NumericalQuadratureDefinition) -> Result<Self> {
        let npoints = rule.npoints;
        let interpolant = match rule.family {
            RuleFamily::GaussLegendre => Interpolant::Interval {
                nodes: rule.points.clone(),
            },
            RuleFamily::CollapsedGauss(n) => Interpolant::Collapsed {
                nodes: gauss_legendre_points_weights(n).0,
            },
            RuleFamily::Symmetric => {
                // Complete polynomial spaces have 1, 3, 6, ... members
                let degree = (0..)
                    .find(|d| (d + 1) * (d + 2) / 2 >= npoints)
                    .unwrap_or(0);
                if (degree + 1) * (degree + 2) / 2 != npoints {
                    return Err(BieError::UnsupportedElement(format!(
                        "no interpolant through {npoints} points"
                    )));
                }
                // Basis function j has coefficients in column j of the inverse Vandermonde matrix
                let mut coefficients = rlst_dynamic_array2!(f64, [npoints, npoints]);
                let mut row = vec![0.0; npoints];
                for (i, point) in rule.points.chunks_exact(2).enumerate() {
                    monomials(degree, point, &mut row);
                    for (m, value) in row.iter().enumerate() {
                        *coefficients.get_mut([i, m]).unwrap() = *value;
                    }
                }
                coefficients.view_mut().into_inverse_alloc().map_err(|_| {
                    BieError::UnsupportedElement("quadrature nodes are not unisolvent".to_string())
                })?;
                Interpolant::Monomial {
                    degree,
                    coefficients,
                }
            }
            RuleFamily::Transformed => {
                return Err(BieError::UnsupportedElement(
                    "transformed rules have no nodal basis".to_string(),
                ))
            }
        };
        Ok(Self {
            npoints,
            interpolant,
        })
    }

    /// Number of basis functions
    pub fn npoints(&self) -> usize {
        self.npoints
    }

    /// Values of all basis functions at a reference point
    pub fn evaluate(&self, point: &[f64], values: &mut [f64]) {
        match &self.interpolant {
            Interpolant::Interval { nodes } => lagrange(nodes, point[0], values),
            Interpolant::Collapsed { nodes } => {
                let n = nodes.len();
                let u = point[0];
                let v = if u < 1.0 { point[1] / (1.0 - u) } else { 0.0 };
                let mut lu = vec![0.0; n];
                let mut lv = vec![0.0; n];
                lagrange(nodes, u, &mut lu);
                lagrange(nodes, v, &mut lv);
                for (a, la) in lu.iter().enumerate() {
                    for (b, lb) in lv.iter().enumerate() {
                        values[a * n + b] = la * lb;
                    }
                }
            }
            Interpolant::Monomial {
                degree,
                coefficients,
            } => {
                let n = self.npoints;
                let mut basis = vec![0.0; n];
                monomials(*degree, point, &mut basis);
                for (j, v) in values.iter_mut().enumerate().take(n) {
                    *v = basis
                        .iter()
                        .enumerate()
                        .fold(0.0, |acc, (m, b)| acc + b * *coefficients.get([m, j]).unwrap());
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quadrature::simplex_rules::simplex_rule;
    use crate::types::ReferenceCellType;
    use approx::assert_relative_eq;
    use paste::paste;

    macro_rules! test_nodal {
        ($(($cell:ident, $npoints:literal)),+) => {
        $(
            paste! {
                #[test]
                fn [<test_nodal_basis_ $cell:lower _ $npoints>]() {
                    let rule = simplex_rule(ReferenceCellType::$cell, $npoints).unwrap();
                    let interpolant = NodalInterpolant::new(&rule).unwrap();
                    let tdim = rule.dim;
                    let mut values = vec![0.0; $npoints];
                    for (i, p) in rule.points.chunks_exact(tdim).enumerate() {
                        interpolant.evaluate(p, &mut values);
                        for (j, v) in values.iter().enumerate() {
                            assert_relative_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-10);
                        }
                    }
                    // The basis reproduces constants
                    let point = if tdim == 1 { vec![0.37] } else { vec![0.21, 0.43] };
                    interpolant.evaluate(&point, &mut values);
                    assert_relative_eq!(values.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
                }
            }
        )*
        };
    }

    test_nodal!(
        (Interval, 1),
        (Interval, 4),
        (Interval, 7),
        (Triangle, 1),
        (Triangle, 3),
        (Triangle, 6),
        (Triangle, 4),
        (Triangle, 9)
    );

    #[test]
    fn test_repeated_nodes_are_rejected() {
        let rule = NumericalQuadratureDefinition {
            dim: 2,
            order: 1,
            npoints: 3,
            weights: vec![1.0 / 6.0; 3],
            points: vec![0.2, 0.2, 0.2, 0.2, 0.6, 0.2],
            family: RuleFamily::Symmetric,
        };
        assert!(matches!(
            NodalInterpolant::new(&rule),
            Err(BieError::UnsupportedElement(_))
        ));
    }

    #[test]
    fn test_reproduces_linear_function() {
        let rule = simplex_rule(ReferenceCellType::Triangle, 3).unwrap();
        let interpolant = NodalInterpolant::new(&rule).unwrap();
        let f = |p: &[f64]| 2.0 - p[0] + 3.0 * p[1];
        let mut values = vec![0.0; 3];
        let point = [0.6, 0.1];
        interpolant.evaluate(&point, &mut values);
        let approx = rule
            .points
            .chunks_exact(2)
            .zip(&values)
            .map(|(p, v)| f(p) * v)
            .sum::<f64>();
        assert_relative_eq!(approx, f(&point), epsilon = 1e-13);
    }
}
