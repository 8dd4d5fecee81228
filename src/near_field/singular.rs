//! Integration of kernels against the nodal basis of one element
use crate::geometry::normal_from_jacobian;
use crate::near_field::interpolation::NodalInterpolant;
use crate::quadrature::duffy::{graded_interval_rule, triangle_point_rule, GRADING};
use crate::quadrature::types::NumericalQuadratureDefinition;
use crate::traits::{Element, LayerKernel};
use crate::types::ReferenceCellType;
use num::{Float, Zero};
use rlst::RlstScalar;

/// A refinement loop that stopped before its values settled
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Divergence {
    pub levels: usize,
    pub estimate: f64,
}

/// Largest change between two sets of values relative to the largest new value
pub(crate) fn relative_change<T: RlstScalar>(new: &[T], old: &[T]) -> T::Real {
    let zero = <T::Real as Zero>::zero();
    let change = new
        .iter()
        .zip(old)
        .fold(zero, |acc, (a, b)| Float::max(acc, RlstScalar::abs(*a - *b)));
    let size = new.iter().fold(zero, |acc, a| Float::max(acc, RlstScalar::abs(*a)));
    if change == zero {
        zero
    } else if size == zero {
        <T::Real as Float>::infinity()
    } else {
        change / size
    }
}

/// Largest number of Gauss points per direction of a singular rule
pub(crate) const MAX_RULE_POINTS: usize = 512;

/// Points per direction at refinement `level`, or `None` if the rule would be too large
fn points_at_level(order: usize, level: usize) -> Option<usize> {
    1usize
        .checked_shl(u32::try_from(level).ok()?)
        .and_then(|scale| order.checked_mul(scale))
        .filter(|n| *n <= MAX_RULE_POINTS)
}

/// Integrates `K(x, y) L_j(y)` over a source element for a fixed target `x`.
///
/// Results hold one `c x c` block per basis function: entry `(a, b)` of the
/// block of basis function `j` is stored at `j * c * c + a * c + b`.
pub(crate) struct ElementIntegrator<'a, K: LayerKernel, E: Element<T = K::Real>> {
    kernel: &'a K,
    element: &'a E,
    interpolant: &'a NodalInterpolant,
    target: &'a [K::Real],
    target_normal: &'a [K::Real],
}

impl<'a, K: LayerKernel, E: Element<T = K::Real>> ElementIntegrator<'a, K, E> {
    pub fn new(
        kernel: &'a K,
        element: &'a E,
        interpolant: &'a NodalInterpolant,
        target: &'a [K::Real],
        target_normal: &'a [K::Real],
    ) -> Self {
        Self {
            kernel,
            element,
            interpolant,
            target,
            target_normal,
        }
    }

    /// Number of values in a result
    pub fn result_size(&self) -> usize {
        self.interpolant.npoints() * self.kernel.value_shape().size()
    }

    pub fn cell(&self) -> ReferenceCellType {
        self.element.reference_cell()
    }

    /// Add the rule given by reference `points` and `weights` to `result`.
    ///
    /// Quadrature points that coincide with the target are skipped.
    pub fn accumulate(&self, points: &[f64], weights: &[f64], result: &mut [K::T]) {
        let tdim = self.element.topology_dim();
        let gdim = self.element.geometry_dim();
        let size = self.kernel.value_shape().size();
        let mut reference = vec![K::Real::zero(); tdim];
        let mut physical = vec![K::Real::zero(); gdim];
        let mut normal = vec![K::Real::zero(); gdim];
        let mut jac = vec![K::Real::zero(); gdim * tdim];
        let mut values = vec![K::T::zero(); size];
        let mut basis = vec![0.0; self.interpolant.npoints()];

        for (xi, w) in points.chunks_exact(tdim).zip(weights) {
            for (r, x) in reference.iter_mut().zip(xi) {
                *r = num::cast::<f64, K::Real>(*x).unwrap();
            }
            self.element.reference_to_physical(&reference, &mut physical);
            self.element.jacobian(&reference, &mut jac);
            let jdet = normal_from_jacobian(gdim, tdim, &jac, &mut normal);
            if self
                .kernel
                .evaluate(self.target, self.target_normal, &physical, &normal, &mut values)
                .is_err()
            {
                continue;
            }
            self.interpolant.evaluate(xi, &mut basis);
            let scale = jdet * num::cast::<f64, K::Real>(*w).unwrap();
            for (block, l) in result.chunks_exact_mut(size).zip(&basis) {
                let factor = scale * num::cast::<f64, K::Real>(*l).unwrap();
                for (r, v) in block.iter_mut().zip(&values) {
                    *r += v.mul_real(factor);
                }
            }
        }
    }

    /// Integrate with a single rule
    pub fn integrate(&self, rule: &NumericalQuadratureDefinition) -> Vec<K::T> {
        let mut result = vec![K::T::zero(); self.result_size()];
        self.accumulate(&rule.points, &rule.weights, &mut result);
        result
    }

    /// Integrate with the rule that is singular at a reference point, using `npoints` Gauss points per direction
    pub fn integrate_singular(&self, point: &[f64], npoints: usize) -> Vec<K::T> {
        self.integrate(&singular_rule(self.cell(), point, npoints))
    }

    /// Integrate for a target on the element, at reference coordinates `point`.
    ///
    /// Level `l` uses `order * 2^l` Gauss points per direction. Successive
    /// levels are combined by Richardson extrapolation of the given order and
    /// the result is accepted once the extrapolated values change by less than
    /// `tolerance` relative to their size. Refinement stops early once a rule
    /// would need more than [MAX_RULE_POINTS] points per direction.
    pub fn on_element(
        &self,
        point: &[f64],
        order: usize,
        max_levels: usize,
        richardson_order: usize,
        tolerance: f64,
    ) -> Result<Vec<K::T>, Divergence> {
        let tol = num::cast::<f64, K::Real>(tolerance).unwrap();
        let factor = num::cast::<f64, K::Real>(1.0 / (2f64.powi(richardson_order as i32) - 1.0))
            .unwrap();
        let mut estimate = <K::Real as Float>::infinity();
        let diverged = |levels: usize, estimate: K::Real| Divergence {
            levels,
            estimate: num::cast::<K::Real, f64>(estimate).unwrap_or(f64::INFINITY),
        };
        let Some(npoints) = points_at_level(order, 0) else {
            return Err(diverged(0, estimate));
        };
        let mut previous = self.integrate_singular(point, npoints);
        let mut extrapolated = previous.clone();
        for level in 1..=max_levels {
            let Some(npoints) = points_at_level(order, level) else {
                return Err(diverged(level - 1, estimate));
            };
            let current = self.integrate_singular(point, npoints);
            let next = current
                .iter()
                .zip(&previous)
                .map(|(a, b)| *a + (*a - *b).mul_real(factor))
                .collect::<Vec<_>>();
            estimate = relative_change(&next, &extrapolated);
            previous = current;
            extrapolated = next;
            if estimate <= tol {
                return Ok(extrapolated);
            }
        }
        Err(diverged(max_levels, estimate))
    }

    /// Integrate for a target at `distance` from the element, whose closest point has reference coordinates `point`.
    ///
    /// The rule is graded towards the closest point. The first level is chosen
    /// so that the grading resolves the distance on an element of size `size`;
    /// refinement stops once two levels agree.
    #[allow(clippy::too_many_arguments)]
    pub fn near_element(
        &self,
        point: &[f64],
        distance: f64,
        size: f64,
        order: usize,
        max_levels: usize,
        tolerance: f64,
    ) -> Result<Vec<K::T>, Divergence> {
        let tol = num::cast::<f64, K::Real>(tolerance).unwrap();
        let first = start_level(size, distance, max_levels);
        let mut estimate = <K::Real as Float>::infinity();
        let diverged = |levels: usize, estimate: K::Real| Divergence {
            levels,
            estimate: num::cast::<K::Real, f64>(estimate).unwrap_or(f64::INFINITY),
        };
        let Some(npoints) = points_at_level(order, first) else {
            return Err(diverged(first, estimate));
        };
        let mut previous = self.integrate_singular(point, npoints);
        for level in first + 1..=first + max_levels {
            let Some(npoints) = points_at_level(order, level) else {
                return Err(diverged(level - 1, estimate));
            };
            let current = self.integrate_singular(point, npoints);
            estimate = relative_change(&current, &previous);
            previous = current;
            if estimate <= tol {
                return Ok(previous);
            }
        }
        Err(diverged(first + max_levels, estimate))
    }
}

/// First refinement level for a target at `distance` from an element of size `size`
pub(crate) fn start_level(size: f64, distance: f64, max_levels: usize) -> usize {
    if distance <= 0.0 || size <= distance {
        return 0;
    }
    let level = ((size / distance).log2() / GRADING as f64).ceil() as usize;
    level.min(max_levels)
}

/// A rule on a reference cell whose points accumulate at `point`
pub(crate) fn singular_rule(
    cell: ReferenceCellType,
    point: &[f64],
    npoints: usize,
) -> NumericalQuadratureDefinition {
    match cell {
        ReferenceCellType::Interval => graded_interval_rule(point[0], npoints),
        ReferenceCellType::Triangle => triangle_point_rule([point[0], point[1]], npoints),
    }
}
