//! Direct evaluation of the naive quadrature entries
use crate::quadrature::Quadrature;
use crate::traits::{Element, LayerKernel};
use crate::types::RlstArray;
use num::Zero;
use rayon::prelude::*;
use rlst::{RandomAccessMut, RlstScalar};

/// Evaluates entries `K(x_i, y_j) w_j` of the naive Nyström matrix.
///
/// Row `i * c + a` belongs to component `a` of target point `i` and column
/// `j * c + b` to component `b` of source point `j`, where `c` is the number
/// of components of the kernel. Pairs at which the kernel is singular give zero.
pub struct DirectEvaluator<'k, 'q, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> {
    kernel: &'k K,
    targets: &'q Quadrature<'q, F>,
    sources: &'q Quadrature<'q, E>,
    components: usize,
}

impl<'k, 'q, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>>
    DirectEvaluator<'k, 'q, K, E, F>
{
    /// Create new
    pub fn new(kernel: &'k K, targets: &'q Quadrature<'q, F>, sources: &'q Quadrature<'q, E>) -> Self {
        Self {
            kernel,
            targets,
            sources,
            components: kernel.value_shape().components(),
        }
    }

    /// The kernel
    pub fn kernel(&self) -> &'k K {
        self.kernel
    }

    /// Target points
    pub fn targets(&self) -> &'q Quadrature<'q, F> {
        self.targets
    }

    /// Source points
    pub fn sources(&self) -> &'q Quadrature<'q, E> {
        self.sources
    }

    /// Number of components per point
    pub fn components(&self) -> usize {
        self.components
    }

    /// Shape of the full matrix
    pub fn shape(&self) -> [usize; 2] {
        [
            self.targets.len() * self.components,
            self.sources.len() * self.components,
        ]
    }

    /// Kernel value without the weight; zero where the kernel is singular
    pub fn kernel_block(&self, target: usize, source: usize, result: &mut [K::T]) {
        if self
            .kernel
            .evaluate(
                self.targets.point(target),
                self.targets.normal(target),
                self.sources.point(source),
                self.sources.normal(source),
                result,
            )
            .is_err()
        {
            result.fill(K::T::zero());
        }
    }

    /// The `c x c` block of a pair of points, stored row-major
    pub fn point_block(&self, target: usize, source: usize, result: &mut [K::T]) {
        self.kernel_block(target, source, result);
        let w = self.sources.weight(source);
        for r in result.iter_mut() {
            *r = r.mul_real(w);
        }
    }

    /// A single scalar entry
    pub fn entry(&self, row: usize, col: usize) -> K::T {
        let c = self.components;
        let mut block = [K::T::zero(); 9];
        self.point_block(row / c, col / c, &mut block[..c * c]);
        block[(row % c) * c + col % c]
    }

    /// Entries of one row restricted to the components of some source points
    pub fn row(&self, row: usize, sources: &[usize], result: &mut [K::T]) {
        let c = self.components;
        let (i, a) = (row / c, row % c);
        let mut block = [K::T::zero(); 9];
        for (j, r) in sources.iter().zip(result.chunks_exact_mut(c)) {
            self.point_block(i, *j, &mut block[..c * c]);
            r.copy_from_slice(&block[a * c..(a + 1) * c]);
        }
    }

    /// Entries of one column restricted to the components of some target points
    pub fn column(&self, col: usize, targets: &[usize], result: &mut [K::T]) {
        let c = self.components;
        let (j, b) = (col / c, col % c);
        let mut block = [K::T::zero(); 9];
        for (i, r) in targets.iter().zip(result.chunks_exact_mut(c)) {
            self.point_block(*i, j, &mut block[..c * c]);
            for (a, v) in r.iter_mut().enumerate() {
                *v = block[a * c + b];
            }
        }
    }

    /// The dense block of some target points and source points
    pub fn dense_block(&self, targets: &[usize], sources: &[usize]) -> RlstArray<K::T, 2> {
        let c = self.components;
        let mut block = rlst::rlst_dynamic_array2!(K::T, [targets.len() * c, sources.len() * c]);
        let mut values = [K::T::zero(); 9];
        for (ti, i) in targets.iter().enumerate() {
            for (sj, j) in sources.iter().enumerate() {
                self.point_block(*i, *j, &mut values[..c * c]);
                for a in 0..c {
                    for b in 0..c {
                        *block.get_mut([ti * c + a, sj * c + b]).unwrap() = values[a * c + b];
                    }
                }
            }
        }
        block
    }

    /// `y += A x` without storing the matrix, in parallel over target points
    pub fn apply(&self, x: &[K::T], y: &mut [K::T]) {
        let c = self.components;
        let nsources = self.sources.len();
        y.par_chunks_mut(c).enumerate().for_each(|(i, yi)| {
            let mut block = [K::T::zero(); 9];
            for j in 0..nsources {
                self.point_block(i, j, &mut block[..c * c]);
                for (a, ya) in yi.iter_mut().enumerate() {
                    for b in 0..c {
                        *ya += block[a * c + b] * x[j * c + b];
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kernel::{DoubleLayer, Laplace2dKernel, SingleLayer};
    use crate::shapes::circle;
    use approx::assert_relative_eq;
    use rlst::{RandomAccessByRef, Shape};

    #[test]
    fn test_double_layer_of_constant() {
        // On a circle the double layer kernel is the constant -1/(4 pi R)
        let arcs = circle::<f64>(16, 1.0);
        let q = Quadrature::from_elements(&arcs, 4).unwrap();
        let kernel = DoubleLayer::new(Laplace2dKernel::<f64>::new());
        let evaluator = DirectEvaluator::new(&kernel, &q, &q);
        let x = vec![1.0; q.len()];
        let mut y = vec![0.0; q.len()];
        evaluator.apply(&x, &mut y);
        let total = q.total_weight();
        for (i, v) in y.iter().enumerate() {
            let expected = -(total - q.weight(i)) / (4.0 * std::f64::consts::PI);
            assert_relative_eq!(*v, expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_blocks_agree_with_entries() {
        let arcs = circle::<f64>(6, 1.0);
        let q = Quadrature::from_elements(&arcs, 2).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let evaluator = DirectEvaluator::new(&kernel, &q, &q);
        let block = evaluator.dense_block(&[0, 3, 5], &[1, 2, 3]);
        assert_eq!(block.shape(), [3, 3]);
        for (a, i) in [0, 3, 5].iter().enumerate() {
            for (b, j) in [1, 2, 3].iter().enumerate() {
                assert_eq!(*block.get([a, b]).unwrap(), evaluator.entry(*i, *j));
            }
        }
        assert_eq!(evaluator.entry(3, 3), 0.0);

        let mut row = vec![0.0; 3];
        evaluator.row(5, &[1, 2, 3], &mut row);
        for (b, j) in [1, 2, 3].iter().enumerate() {
            assert_eq!(row[b], evaluator.entry(5, *j));
        }
    }
}
