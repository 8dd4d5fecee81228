//! Tensor Chebyshev interpolation of kernels on pairs of clusters
use std::sync::{Arc, OnceLock};

use crate::far_field::tree::BoundingBox;
use crate::quadrature::Quadrature;
use crate::traits::{Element, LayerKernel};
use crate::types::{RealScalar, RlstArray};
use num::{Float, Zero};
use rlst::{rlst_dynamic_array2, RandomAccessMut, RlstScalar, Shape};

/// Chebyshev points of the first kind on \[-1, 1\] and their barycentric weights
pub fn chebyshev_nodes<T: RealScalar>(order: usize) -> (Vec<T>, Vec<T>) {
    (0..order)
        .map(|m| {
            let theta = (2 * m + 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
            let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
            (
                num::cast::<f64, T>(theta.cos()).unwrap(),
                num::cast::<f64, T>(sign * theta.sin()).unwrap(),
            )
        })
        .unzip()
}

/// Values of the Lagrange polynomials through `nodes` at `t`
fn lagrange_1d<T: RealScalar>(nodes: &[T], weights: &[T], t: T, values: &mut [T]) {
    if let Some(m) = nodes.iter().position(|x| *x == t) {
        values.fill(T::zero());
        values[m] = T::one();
        return;
    }
    let mut sum = T::zero();
    for ((v, x), w) in values.iter_mut().zip(nodes).zip(weights) {
        *v = *w / (t - *x);
        sum = sum + *v;
    }
    for v in values.iter_mut() {
        *v = *v / sum;
    }
}

/// The box a cluster is interpolated on
#[derive(Debug, Clone)]
pub struct InterpolationBox<T: RealScalar> {
    centre: Vec<T>,
    half_width: Vec<T>,
}

impl<T: RealScalar> InterpolationBox<T> {
    /// Box around a cluster, widened in flat directions
    pub fn new(bbox: &BoundingBox<T>) -> Self {
        let half = num::cast::<f64, T>(0.5).unwrap();
        let diameter = bbox.diameter();
        let min_width = if diameter > T::zero() {
            num::cast::<f64, T>(0.01).unwrap() * diameter
        } else {
            T::one()
        };
        Self {
            centre: bbox.centre(),
            half_width: bbox
                .min()
                .iter()
                .zip(bbox.max())
                .map(|(a, b)| Float::max(half * (*b - *a), min_width))
                .collect(),
        }
    }

    /// Dimension of the box
    pub fn dim(&self) -> usize {
        self.centre.len()
    }

    /// Number of interpolation nodes
    pub fn nnodes(&self, order: usize) -> usize {
        order.pow(self.dim() as u32)
    }

    /// Tensor Chebyshev nodes, point by point.
    ///
    /// Node `P` has the 1D index `(P / order^d) % order` in direction `d`.
    pub fn nodes(&self, order: usize) -> Vec<T> {
        let dim = self.dim();
        let (x, _) = chebyshev_nodes::<T>(order);
        let mut nodes = Vec::with_capacity(dim * self.nnodes(order));
        for index in 0..self.nnodes(order) {
            let mut rem = index;
            for d in 0..dim {
                nodes.push(self.centre[d] + self.half_width[d] * x[rem % order]);
                rem /= order;
            }
        }
        nodes
    }

    /// Values of all tensor Lagrange polynomials at a point
    pub fn basis(&self, order: usize, point: &[T], values: &mut [T]) {
        let dim = self.dim();
        let (x, w) = chebyshev_nodes::<T>(order);
        let mut values_1d = vec![T::zero(); dim * order];
        for (d, v) in values_1d.chunks_exact_mut(order).enumerate() {
            let t = (point[d] - self.centre[d]) / self.half_width[d];
            lagrange_1d(&x, &w, t, v);
        }
        for (index, value) in values.iter_mut().enumerate().take(self.nnodes(order)) {
            let mut rem = index;
            *value = T::one();
            for d in 0..dim {
                *value = *value * values_1d[d * order + rem % order];
                rem /= order;
            }
        }
    }
}

/// Interpolation factors of the clusters of one tree.
///
/// Entry `(cluster, k)` holds the factor for the `k`-th expansion order. The
/// cache is filled lazily while blocks are compressed; blocks keep shared
/// handles to the factors they use.
pub struct ExpansionCache<T: RlstScalar> {
    factors: Vec<Vec<OnceLock<Arc<RlstArray<T, 2>>>>>,
}

impl<T: RlstScalar> ExpansionCache<T> {
    /// Create an empty cache
    pub fn new(nclusters: usize, norders: usize) -> Self {
        Self {
            factors: (0..nclusters)
                .map(|_| (0..norders).map(|_| OnceLock::new()).collect())
                .collect(),
        }
    }

    /// Get a factor, computing it if it is not yet cached
    pub fn get_or_init(
        &self,
        cluster: usize,
        order_index: usize,
        init: impl FnOnce() -> RlstArray<T, 2>,
    ) -> Arc<RlstArray<T, 2>> {
        self.factors[cluster][order_index]
            .get_or_init(|| Arc::new(init()))
            .clone()
    }

    /// Number of scalars stored in all computed factors
    pub fn storage(&self) -> usize {
        self.factors
            .iter()
            .flatten()
            .filter_map(|f| f.get())
            .map(|f| f.shape().iter().product::<usize>())
            .sum()
    }
}

/// Target factor `U[(x, i), (P, r)] = L(n_x)[i, r] S_P(x)` of a cluster
pub(crate) fn target_factor<K: LayerKernel, F: Element<T = K::Real>>(
    kernel: &K,
    targets: &Quadrature<'_, F>,
    indices: &[usize],
    ibox: &InterpolationBox<K::Real>,
    order: usize,
) -> RlstArray<K::T, 2> {
    let c = kernel.value_shape().components();
    let rows = kernel.expansion_shape()[0];
    let n = ibox.nnodes(order);
    let mut factor = rlst_dynamic_array2!(K::T, [indices.len() * c, n * rows]);
    let mut left = vec![K::T::zero(); c * rows];
    let mut basis = vec![K::Real::zero(); n];
    for (a, i) in indices.iter().enumerate() {
        kernel.expansion_left(targets.normal(*i), &mut left);
        ibox.basis(order, targets.point(*i), &mut basis);
        for comp in 0..c {
            for (p, s) in basis.iter().enumerate() {
                for r in 0..rows {
                    *factor.get_mut([a * c + comp, p * rows + r]).unwrap() =
                        left[comp * rows + r].mul_real(*s);
                }
            }
        }
    }
    factor
}

/// Source factor `V[(Q, s), (y, j)] = S_Q(y) R(n_y)[s, j] w_y` of a cluster
pub(crate) fn source_factor<K: LayerKernel, E: Element<T = K::Real>>(
    kernel: &K,
    sources: &Quadrature<'_, E>,
    indices: &[usize],
    ibox: &InterpolationBox<K::Real>,
    order: usize,
) -> RlstArray<K::T, 2> {
    let c = kernel.value_shape().components();
    let cols = kernel.expansion_shape()[1];
    let n = ibox.nnodes(order);
    let mut factor = rlst_dynamic_array2!(K::T, [n * cols, indices.len() * c]);
    let mut right = vec![K::T::zero(); cols * c];
    let mut basis = vec![K::Real::zero(); n];
    for (b, j) in indices.iter().enumerate() {
        kernel.expansion_right(sources.normal(*j), &mut right);
        ibox.basis(order, sources.point(*j), &mut basis);
        let w = sources.weight(*j);
        for (q, s) in basis.iter().enumerate() {
            for col in 0..cols {
                for comp in 0..c {
                    *factor.get_mut([q * cols + col, b * c + comp]).unwrap() =
                        right[col * c + comp].mul_real(*s * w);
                }
            }
        }
    }
    factor
}

/// Kernel values `M[(P, r), (Q, s)] = H(X_P, Y_Q)[r, s]` between the nodes of two boxes
pub(crate) fn kernel_factor<K: LayerKernel>(
    kernel: &K,
    target_box: &InterpolationBox<K::Real>,
    source_box: &InterpolationBox<K::Real>,
    order: usize,
) -> RlstArray<K::T, 2> {
    let [rows, cols] = kernel.expansion_shape();
    let dim = target_box.dim();
    let target_nodes = target_box.nodes(order);
    let source_nodes = source_box.nodes(order);
    let n = target_box.nnodes(order);
    let mut factor = rlst_dynamic_array2!(K::T, [n * rows, n * cols]);
    let mut values = vec![K::T::zero(); rows * cols];
    for (p, x) in target_nodes.chunks_exact(dim).enumerate() {
        for (q, y) in source_nodes.chunks_exact(dim).enumerate() {
            if kernel.evaluate_expansion(x, y, &mut values).is_err() {
                values.fill(K::T::zero());
            }
            for r in 0..rows {
                for s in 0..cols {
                    *factor.get_mut([p * rows + r, q * cols + s]).unwrap() = values[r * cols + s];
                }
            }
        }
    }
    factor
}
