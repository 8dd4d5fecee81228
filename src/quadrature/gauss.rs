//! Gauss-Legendre rules on the interval \[0, 1\].
use crate::quadrature::types::{NumericalQuadratureDefinition, RuleFamily};
use std::f64::consts::PI;

/// Compute the points and weights of the `npoints` Gauss-Legendre rule on \[0, 1\].
///
/// The points are in increasing order. The roots of the Legendre polynomial
/// are found by Newton iteration.
pub fn gauss_legendre_points_weights(npoints: usize) -> (Vec<f64>, Vec<f64>) {
    let n = npoints;
    let mut points = vec![0.0; n];
    let mut weights = vec![0.0; n];
    for i in 0..n {
        let mut x = f64::cos(PI * (i as f64 + 0.75) / (n as f64 + 0.5));
        let mut dp = 1.0;
        for _ in 0..100 {
            let (p, d) = legendre(n, x);
            dp = d;
            let dx = p / d;
            x -= dx;
            if dx.abs() < 1e-16 {
                break;
            }
        }
        let (_, d) = legendre(n, x);
        if d.is_finite() {
            dp = d;
        }
        // Roots come in decreasing order
        points[i] = 0.5 * (1.0 - x);
        weights[i] = 1.0 / ((1.0 - x * x) * dp * dp);
    }
    (points, weights)
}

/// Value and derivative of the Legendre polynomial of degree n
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 1..n {
        let p2 = ((2 * k + 1) as f64 * x * p1 - k as f64 * p0) / (k + 1) as f64;
        p0 = p1;
        p1 = p2;
    }
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// The Gauss-Legendre rule with `npoints` points on \[0, 1\]
pub fn gauss_legendre(npoints: usize) -> NumericalQuadratureDefinition {
    let (points, weights) = gauss_legendre_points_weights(npoints);
    NumericalQuadratureDefinition {
        dim: 1,
        order: 2 * npoints - 1,
        npoints,
        family: RuleFamily::GaussLegendre,
        weights,
        points,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use paste::paste;

    macro_rules! test_gauss_exactness {
        ($($n:literal),+) => {
        $(
            paste! {
                #[test]
                fn [<test_gauss_exactness_ $n>]() {
                    let rule = gauss_legendre($n);
                    assert_eq!(rule.points.len(), $n);
                    for degree in 0..2 * $n {
                        let actual = rule
                            .points
                            .iter()
                            .zip(&rule.weights)
                            .map(|(x, w)| w * x.powi(degree as i32))
                            .sum::<f64>();
                        assert_relative_eq!(actual, 1.0 / (degree as f64 + 1.0), max_relative = 1e-13);
                    }
                }
            }
        )*
        };
    }

    test_gauss_exactness!(1, 2, 3, 5, 8, 13, 20);

    #[test]
    fn test_points_are_sorted_and_inside() {
        let (points, _) = gauss_legendre_points_weights(17);
        for pair in points.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(points[0] > 0.0);
        assert!(points[16] < 1.0);
    }
}
