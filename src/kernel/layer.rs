//! Layer operators and their combinations
use crate::traits::{Kernel, LayerKernel};
use crate::types::{SingularEvaluation, Singularity, ValueShape};
use num::{One, Zero};
use rlst::RlstScalar;

/// Write a `n x n` identity matrix
fn identity<T: RlstScalar>(n: usize, result: &mut [T]) {
    for (i, r) in result[..n * n].iter_mut().enumerate() {
        *r = if i % (n + 1) == 0 { T::one() } else { T::zero() };
    }
}

/// The single layer operator of a kernel, `G(x, y)`
#[derive(Clone, Debug)]
pub struct SingleLayer<K: Kernel> {
    kernel: K,
}

impl<K: Kernel> SingleLayer<K> {
    /// Create new
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    /// The kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

impl<K: Kernel> LayerKernel for SingleLayer<K> {
    type T = K::T;
    type Real = K::Real;

    fn space_dimension(&self) -> usize {
        self.kernel.space_dimension()
    }

    fn value_shape(&self) -> ValueShape {
        self.kernel.value_shape()
    }

    fn singularity(&self) -> Singularity {
        self.kernel.singularity()
    }

    fn uses_target_normal(&self) -> bool {
        false
    }

    fn evaluate(
        &self,
        target: &[K::Real],
        _target_normal: &[K::Real],
        source: &[K::Real],
        _source_normal: &[K::Real],
        result: &mut [K::T],
    ) -> Result<(), SingularEvaluation> {
        self.kernel.evaluate(target, source, result)
    }

    fn supports_expansion(&self) -> bool {
        self.kernel.supports_expansion()
    }

    fn expansion_shape(&self) -> [usize; 2] {
        let c = self.kernel.value_shape().components();
        [c, c]
    }

    fn evaluate_expansion(
        &self,
        target: &[K::Real],
        source: &[K::Real],
        result: &mut [K::T],
    ) -> Result<(), SingularEvaluation> {
        self.kernel.evaluate(target, source, result)
    }

    fn expansion_left(&self, _target_normal: &[K::Real], result: &mut [K::T]) {
        identity(self.kernel.value_shape().components(), result);
    }

    fn expansion_right(&self, _source_normal: &[K::Real], result: &mut [K::T]) {
        identity(self.kernel.value_shape().components(), result);
    }
}

/// The double layer operator of a kernel, the flux at the source contracted with `n_y`
#[derive(Clone, Debug)]
pub struct DoubleLayer<K: Kernel> {
    kernel: K,
}

impl<K: Kernel> DoubleLayer<K> {
    /// Create new
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    /// The kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

impl<K: Kernel> LayerKernel for DoubleLayer<K> {
    type T = K::T;
    type Real = K::Real;

    fn space_dimension(&self) -> usize {
        self.kernel.space_dimension()
    }

    fn value_shape(&self) -> ValueShape {
        self.kernel.value_shape()
    }

    fn singularity(&self) -> Singularity {
        self.kernel.singularity()
    }

    fn uses_target_normal(&self) -> bool {
        false
    }

    fn evaluate(
        &self,
        target: &[K::Real],
        _target_normal: &[K::Real],
        source: &[K::Real],
        source_normal: &[K::Real],
        result: &mut [K::T],
    ) -> Result<(), SingularEvaluation> {
        self.kernel
            .evaluate_source_normal_derivative(target, source, source_normal, result)
    }

    fn double_layer_identity(&self) -> Option<K::T> {
        self.kernel.double_layer_identity()
    }

    fn supports_expansion(&self) -> bool {
        self.kernel.supports_expansion()
    }

    fn expansion_shape(&self) -> [usize; 2] {
        let c = self.kernel.value_shape().components();
        [c, c * self.kernel.space_dimension()]
    }

    fn evaluate_expansion(
        &self,
        target: &[K::Real],
        source: &[K::Real],
        result: &mut [K::T],
    ) -> Result<(), SingularEvaluation> {
        // H[i, j * dim + k] is the flux entry ((i, j), k)
        self.kernel.evaluate_source_flux(target, source, result)
    }

    fn expansion_left(&self, _target_normal: &[K::Real], result: &mut [K::T]) {
        identity(self.kernel.value_shape().components(), result);
    }

    fn expansion_right(&self, source_normal: &[K::Real], result: &mut [K::T]) {
        let c = self.kernel.value_shape().components();
        let dim = self.kernel.space_dimension();
        for j in 0..c {
            for k in 0..dim {
                for jj in 0..c {
                    result[(j * dim + k) * c + jj] = if j == jj {
                        K::T::from_real(source_normal[k])
                    } else {
                        K::T::zero()
                    };
                }
            }
        }
    }
}

/// The adjoint double layer operator of a kernel, the flux at the target contracted with `n_x`
#[derive(Clone, Debug)]
pub struct AdjointDoubleLayer<K: Kernel> {
    kernel: K,
}

impl<K: Kernel> AdjointDoubleLayer<K> {
    /// Create new
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    /// The kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

impl<K: Kernel> LayerKernel for AdjointDoubleLayer<K> {
    type T = K::T;
    type Real = K::Real;

    fn space_dimension(&self) -> usize {
        self.kernel.space_dimension()
    }

    fn value_shape(&self) -> ValueShape {
        self.kernel.value_shape()
    }

    fn singularity(&self) -> Singularity {
        self.kernel.singularity()
    }

    fn uses_target_normal(&self) -> bool {
        true
    }

    fn evaluate(
        &self,
        target: &[K::Real],
        target_normal: &[K::Real],
        source: &[K::Real],
        _source_normal: &[K::Real],
        result: &mut [K::T],
    ) -> Result<(), SingularEvaluation> {
        self.kernel
            .evaluate_target_normal_derivative(target, source, target_normal, result)
    }

    fn supports_expansion(&self) -> bool {
        self.kernel.supports_expansion()
    }

    fn expansion_shape(&self) -> [usize; 2] {
        let c = self.kernel.value_shape().components();
        [c * self.kernel.space_dimension(), c]
    }

    fn evaluate_expansion(
        &self,
        target: &[K::Real],
        source: &[K::Real],
        result: &mut [K::T],
    ) -> Result<(), SingularEvaluation> {
        let c = self.kernel.value_shape().components();
        let dim = self.kernel.space_dimension();
        let mut flux = [K::T::zero(); 27];
        self.kernel
            .evaluate_target_flux(target, source, &mut flux[..c * c * dim])?;
        // H[i * dim + k, j] is the flux entry ((i, j), k)
        for i in 0..c {
            for j in 0..c {
                for k in 0..dim {
                    result[(i * dim + k) * c + j] = flux[(i * c + j) * dim + k];
                }
            }
        }
        Ok(())
    }

    fn expansion_left(&self, target_normal: &[K::Real], result: &mut [K::T]) {
        let c = self.kernel.value_shape().components();
        let dim = self.kernel.space_dimension();
        for ii in 0..c {
            for i in 0..c {
                for k in 0..dim {
                    result[ii * c * dim + i * dim + k] = if i == ii {
                        K::T::from_real(target_normal[k])
                    } else {
                        K::T::zero()
                    };
                }
            }
        }
    }

    fn expansion_right(&self, _source_normal: &[K::Real], result: &mut [K::T]) {
        identity(self.kernel.value_shape().components(), result);
    }
}

/// The sum of two layer operators
#[derive(Clone, Debug)]
pub struct LayerKernelSum<A: LayerKernel, B: LayerKernel<T = A::T, Real = A::Real>> {
    first: A,
    second: B,
}

impl<A: LayerKernel, B: LayerKernel<T = A::T, Real = A::Real>> LayerKernelSum<A, B> {
    /// Create new
    pub fn new(first: A, second: B) -> Self {
        debug_assert_eq!(first.value_shape(), second.value_shape());
        debug_assert_eq!(first.space_dimension(), second.space_dimension());
        Self { first, second }
    }
}

impl<A: LayerKernel, B: LayerKernel<T = A::T, Real = A::Real>> LayerKernel
    for LayerKernelSum<A, B>
{
    type T = A::T;
    type Real = A::Real;

    fn space_dimension(&self) -> usize {
        self.first.space_dimension()
    }

    fn value_shape(&self) -> ValueShape {
        self.first.value_shape()
    }

    fn singularity(&self) -> Singularity {
        std::cmp::max(self.first.singularity(), self.second.singularity())
    }

    fn uses_target_normal(&self) -> bool {
        self.first.uses_target_normal() || self.second.uses_target_normal()
    }

    fn evaluate(
        &self,
        target: &[A::Real],
        target_normal: &[A::Real],
        source: &[A::Real],
        source_normal: &[A::Real],
        result: &mut [A::T],
    ) -> Result<(), SingularEvaluation> {
        let size = self.value_shape().size();
        let mut other = [A::T::zero(); 9];
        self.first
            .evaluate(target, target_normal, source, source_normal, result)?;
        self.second.evaluate(
            target,
            target_normal,
            source,
            source_normal,
            &mut other[..size],
        )?;
        for (r, o) in result.iter_mut().zip(&other[..size]) {
            *r += *o;
        }
        Ok(())
    }

    fn double_layer_identity(&self) -> Option<A::T> {
        match (
            self.first.double_layer_identity(),
            self.second.double_layer_identity(),
        ) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        }
    }

    fn supports_expansion(&self) -> bool {
        self.first.supports_expansion() && self.second.supports_expansion()
    }

    fn expansion_shape(&self) -> [usize; 2] {
        let [r0, c0] = self.first.expansion_shape();
        let [r1, c1] = self.second.expansion_shape();
        [r0 + r1, c0 + c1]
    }

    fn evaluate_expansion(
        &self,
        target: &[A::Real],
        source: &[A::Real],
        result: &mut [A::T],
    ) -> Result<(), SingularEvaluation> {
        // Block diagonal
        let [r0, c0] = self.first.expansion_shape();
        let [r1, c1] = self.second.expansion_shape();
        let cols = c0 + c1;
        let mut h0 = vec![A::T::zero(); r0 * c0];
        let mut h1 = vec![A::T::zero(); r1 * c1];
        self.first.evaluate_expansion(target, source, &mut h0)?;
        self.second.evaluate_expansion(target, source, &mut h1)?;
        for r in result[..(r0 + r1) * cols].iter_mut() {
            *r = A::T::zero();
        }
        for i in 0..r0 {
            result[i * cols..i * cols + c0].copy_from_slice(&h0[i * c0..(i + 1) * c0]);
        }
        for i in 0..r1 {
            let row = (r0 + i) * cols + c0;
            result[row..row + c1].copy_from_slice(&h1[i * c1..(i + 1) * c1]);
        }
        Ok(())
    }

    fn expansion_left(&self, target_normal: &[A::Real], result: &mut [A::T]) {
        let c = self.value_shape().components();
        let [r0, _] = self.first.expansion_shape();
        let [r1, _] = self.second.expansion_shape();
        let mut l0 = vec![A::T::zero(); c * r0];
        let mut l1 = vec![A::T::zero(); c * r1];
        self.first.expansion_left(target_normal, &mut l0);
        self.second.expansion_left(target_normal, &mut l1);
        for i in 0..c {
            let row = i * (r0 + r1);
            result[row..row + r0].copy_from_slice(&l0[i * r0..(i + 1) * r0]);
            result[row + r0..row + r0 + r1].copy_from_slice(&l1[i * r1..(i + 1) * r1]);
        }
    }

    fn expansion_right(&self, source_normal: &[A::Real], result: &mut [A::T]) {
        let c = self.value_shape().components();
        let [_, c0] = self.first.expansion_shape();
        let [_, c1] = self.second.expansion_shape();
        self.first
            .expansion_right(source_normal, &mut result[..c0 * c]);
        self.second
            .expansion_right(source_normal, &mut result[c0 * c..(c0 + c1) * c]);
    }
}

/// A layer operator multiplied by a scalar
#[derive(Clone, Debug)]
pub struct LayerKernelTimesScalar<A: LayerKernel> {
    scalar: A::T,
    kernel: A,
}

impl<A: LayerKernel> LayerKernelTimesScalar<A> {
    /// Create new
    pub fn new(scalar: A::T, kernel: A) -> Self {
        Self { scalar, kernel }
    }
}

impl<A: LayerKernel> LayerKernel for LayerKernelTimesScalar<A> {
    type T = A::T;
    type Real = A::Real;

    fn space_dimension(&self) -> usize {
        self.kernel.space_dimension()
    }

    fn value_shape(&self) -> ValueShape {
        self.kernel.value_shape()
    }

    fn singularity(&self) -> Singularity {
        if self.scalar == A::T::zero() {
            Singularity::Bounded
        } else {
            self.kernel.singularity()
        }
    }

    fn uses_target_normal(&self) -> bool {
        self.kernel.uses_target_normal()
    }

    fn evaluate(
        &self,
        target: &[A::Real],
        target_normal: &[A::Real],
        source: &[A::Real],
        source_normal: &[A::Real],
        result: &mut [A::T],
    ) -> Result<(), SingularEvaluation> {
        self.kernel
            .evaluate(target, target_normal, source, source_normal, result)?;
        let size = self.value_shape().size();
        for r in result[..size].iter_mut() {
            *r *= self.scalar;
        }
        Ok(())
    }

    fn double_layer_identity(&self) -> Option<A::T> {
        self.kernel.double_layer_identity().map(|c| c * self.scalar)
    }

    fn supports_expansion(&self) -> bool {
        self.kernel.supports_expansion()
    }

    fn expansion_shape(&self) -> [usize; 2] {
        self.kernel.expansion_shape()
    }

    fn evaluate_expansion(
        &self,
        target: &[A::Real],
        source: &[A::Real],
        result: &mut [A::T],
    ) -> Result<(), SingularEvaluation> {
        self.kernel.evaluate_expansion(target, source, result)
    }

    fn expansion_left(&self, target_normal: &[A::Real], result: &mut [A::T]) {
        self.kernel.expansion_left(target_normal, result);
        let n = self.value_shape().components() * self.kernel.expansion_shape()[0];
        for r in result[..n].iter_mut() {
            *r *= self.scalar;
        }
    }

    fn expansion_right(&self, source_normal: &[A::Real], result: &mut [A::T]) {
        self.kernel.expansion_right(source_normal, result);
    }
}

/// Evaluate a layer kernel through its expansion factors `L H R`
#[cfg(test)]
pub(crate) fn evaluate_through_expansion<K: LayerKernel>(
    kernel: &K,
    target: &[K::Real],
    target_normal: &[K::Real],
    source: &[K::Real],
    source_normal: &[K::Real],
) -> Vec<K::T> {
    let c = kernel.value_shape().components();
    let [rows, cols] = kernel.expansion_shape();
    let mut h = vec![K::T::zero(); rows * cols];
    let mut l = vec![K::T::zero(); c * rows];
    let mut r = vec![K::T::zero(); cols * c];
    kernel
        .evaluate_expansion(target, source, &mut h)
        .unwrap();
    kernel.expansion_left(target_normal, &mut l);
    kernel.expansion_right(source_normal, &mut r);
    let mut result = vec![K::T::zero(); c * c];
    for i in 0..c {
        for j in 0..c {
            let mut sum = K::T::zero();
            for a in 0..rows {
                for b in 0..cols {
                    sum += l[i * rows + a] * h[a * cols + b] * r[b * c + j];
                }
            }
            result[i * c + j] = sum;
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kernel::{Laplace3dKernel, Stokes2dKernel, Stokes3dKernel};
    use approx::assert_relative_eq;

    fn check_factorisation<K: LayerKernel<T = f64, Real = f64>>(kernel: &K) {
        let dim = kernel.space_dimension();
        let target = [0.3, -0.2, 0.7];
        let source = [-0.4, 0.5, 0.1];
        let nx = [0.0, 0.6, 0.8];
        let ny = [0.48, 0.6, 0.64];
        let size = kernel.value_shape().size();
        let mut direct = vec![0.0; size];
        kernel
            .evaluate(&target[..dim], &nx[..dim], &source[..dim], &ny[..dim], &mut direct)
            .unwrap();
        let factored =
            evaluate_through_expansion(kernel, &target[..dim], &nx[..dim], &source[..dim], &ny[..dim]);
        for (a, b) in direct.iter().zip(&factored) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_factorisations() {
        check_factorisation(&SingleLayer::new(Laplace3dKernel::<f64>::new()));
        check_factorisation(&DoubleLayer::new(Laplace3dKernel::<f64>::new()));
        check_factorisation(&AdjointDoubleLayer::new(Laplace3dKernel::<f64>::new()));
        check_factorisation(&DoubleLayer::new(Stokes3dKernel::<f64>::new(1.3)));
        check_factorisation(&AdjointDoubleLayer::new(Stokes2dKernel::<f64>::new(1.3)));
        check_factorisation(&LayerKernelSum::new(
            DoubleLayer::new(Laplace3dKernel::<f64>::new()),
            LayerKernelTimesScalar::new(-2.5, SingleLayer::new(Laplace3dKernel::<f64>::new())),
        ));
    }

    #[test]
    fn test_combined_field_value() {
        let dl = DoubleLayer::new(Laplace3dKernel::<f64>::new());
        let sl = SingleLayer::new(Laplace3dKernel::<f64>::new());
        let combined = LayerKernelSum::new(dl.clone(), LayerKernelTimesScalar::new(2.0, sl.clone()));
        let (x, y, n) = ([0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let mut a = [0.0];
        let mut b = [0.0];
        let mut c = [0.0];
        dl.evaluate(&x, &n, &y, &n, &mut a).unwrap();
        sl.evaluate(&x, &n, &y, &n, &mut b).unwrap();
        combined.evaluate(&x, &n, &y, &n, &mut c).unwrap();
        assert_relative_eq!(c[0], a[0] + 2.0 * b[0]);
        assert_eq!(combined.double_layer_identity(), None);
        assert_eq!(dl.double_layer_identity(), Some(-0.5));
        assert_eq!(
            LayerKernelTimesScalar::new(2.0, dl).double_layer_identity(),
            Some(-1.0)
        );
    }
}
