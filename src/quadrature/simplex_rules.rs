//! Get rules on simplices.

use std::collections::HashMap;

use crate::quadrature::gauss::{gauss_legendre, gauss_legendre_points_weights};
use crate::quadrature::types::{NumericalQuadratureDefinition, RuleFamily};
use crate::types::{BieError, ReferenceCellType, Result};

lazy_static! {
    /// Symmetric triangle rules: number of points to (order, points, weights).
    static ref TRIANGLE_RULE_DEFINITIONS: HashMap<usize, (usize, Vec<f64>, Vec<f64>)> = {
        let mut rules = HashMap::new();
        rules.insert(1, (1, vec![1.0 / 3.0, 1.0 / 3.0], vec![0.5]));
        rules.insert(
            3,
            (
                2,
                vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
                vec![1.0 / 6.0; 3],
            ),
        );
        let a = 0.445_948_490_915_965;
        let b = 0.091_576_213_509_771;
        let wa = 0.5 * 0.223_381_589_678_011;
        let wb = 0.5 * 0.109_951_743_655_322;
        rules.insert(
            6,
            (
                4,
                vec![
                    a,
                    a,
                    1.0 - 2.0 * a,
                    a,
                    a,
                    1.0 - 2.0 * a,
                    b,
                    b,
                    1.0 - 2.0 * b,
                    b,
                    b,
                    1.0 - 2.0 * b,
                ],
                vec![wa, wa, wa, wb, wb, wb],
            ),
        );
        rules
    };
}

/// Return a simplex rule for a given number of points.
///
/// Intervals use Gauss-Legendre rules of any size. Triangles use a tabulated
/// symmetric rule if one exists with `npoints` points, and otherwise a
/// collapsed Gauss rule if `npoints` is a square.
pub fn simplex_rule(
    cell_type: ReferenceCellType,
    npoints: usize,
) -> Result<NumericalQuadratureDefinition> {
    if npoints == 0 {
        return Err(BieError::InvalidOptions(
            "a quadrature rule needs at least one point".to_string(),
        ));
    }
    match cell_type {
        ReferenceCellType::Interval => Ok(gauss_legendre(npoints)),
        ReferenceCellType::Triangle => {
            if let Some((order, points, weights)) = TRIANGLE_RULE_DEFINITIONS.get(&npoints) {
                Ok(NumericalQuadratureDefinition {
                    dim: 2,
                    order: *order,
                    npoints,
                    family: RuleFamily::Symmetric,
                    weights: weights.to_vec(),
                    points: points.to_vec(),
                })
            } else {
                let n = (npoints as f64).sqrt().round() as usize;
                if n * n == npoints {
                    Ok(collapsed_gauss_triangle(n))
                } else {
                    Err(BieError::UnsupportedElement(format!(
                        "no triangle rule with {npoints} points"
                    )))
                }
            }
        }
    }
}

/// A tensor Gauss rule with `n * n` points collapsed onto the triangle.
///
/// The square point (u, v) is mapped to (u, v (1 - u)). Point `a * n + b`
/// uses the `a`-th Gauss point in u and the `b`-th in v.
pub fn collapsed_gauss_triangle(n: usize) -> NumericalQuadratureDefinition {
    let (gp, gw) = gauss_legendre_points_weights(n);
    let mut points = Vec::with_capacity(2 * n * n);
    let mut weights = Vec::with_capacity(n * n);
    for (u, wu) in gp.iter().zip(&gw) {
        for (v, wv) in gp.iter().zip(&gw) {
            points.push(*u);
            points.push(v * (1.0 - u));
            weights.push(wu * wv * (1.0 - u));
        }
    }
    NumericalQuadratureDefinition {
        dim: 2,
        order: 2 * n - 2,
        npoints: n * n,
        family: RuleFamily::CollapsedGauss(n),
        weights,
        points,
    }
}

/// For a given cell type return a vector with the numbers of points for which tabulated rules are available.
pub fn available_rules(cell_type: ReferenceCellType) -> Vec<usize> {
    match cell_type {
        ReferenceCellType::Interval => vec![],
        ReferenceCellType::Triangle => {
            let mut rules = TRIANGLE_RULE_DEFINITIONS
                .keys()
                .copied()
                .collect::<Vec<_>>();
            rules.sort();
            rules
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use paste::paste;

    use approx::*;

    /// Integral of x^a y^b over the reference triangle
    fn monomial_integral(a: i32, b: i32) -> f64 {
        let fact = |n: i32| (1..=n).map(|i| i as f64).product::<f64>();
        fact(a) * fact(b) / fact(a + b + 2)
    }

    macro_rules! test_triangle {
        ($($npoints:literal),+) => {
        $(
            paste! {
                #[test]
                fn [<test_triangle_rule_ $npoints>]() {
                    let rule = simplex_rule(ReferenceCellType::Triangle, $npoints).unwrap();
                    let volume_actual: f64 = rule.weights.iter().sum();
                    assert_relative_eq!(volume_actual, 0.5, max_relative=1E-14);
                    for degree in 0..=rule.order as i32 {
                        for a in 0..=degree {
                            let b = degree - a;
                            let actual = rule
                                .points
                                .chunks_exact(2)
                                .zip(&rule.weights)
                                .map(|(p, w)| w * p[0].powi(a) * p[1].powi(b))
                                .sum::<f64>();
                            assert_relative_eq!(actual, monomial_integral(a, b), max_relative=1E-12);
                        }
                    }
                }
            }
        )*
        };
    }

    test_triangle!(1, 3, 6, 4, 9, 16);

    #[test]
    fn test_available_rules() {
        assert_eq!(available_rules(ReferenceCellType::Triangle), vec![1, 3, 6]);
    }

    #[test]
    fn test_missing_rule() {
        assert!(simplex_rule(ReferenceCellType::Triangle, 5).is_err());
        assert!(simplex_rule(ReferenceCellType::Interval, 0).is_err());
    }
}
