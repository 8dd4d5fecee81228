//! Fundamental solutions and layer operators built from them
mod helmholtz_3d;
mod laplace_2d;
mod laplace_3d;
mod layer;
mod stokes_2d;
mod stokes_3d;

pub use helmholtz_3d::Helmholtz3dKernel;
pub use laplace_2d::Laplace2dKernel;
pub use laplace_3d::Laplace3dKernel;
pub use layer::{AdjointDoubleLayer, DoubleLayer, LayerKernelSum, LayerKernelTimesScalar, SingleLayer};
pub use stokes_2d::Stokes2dKernel;
pub use stokes_3d::Stokes3dKernel;

use crate::types::{RealScalar, SingularEvaluation};

/// Difference `target - source` and its length
#[inline]
pub(crate) fn difference<T: RealScalar, const D: usize>(
    target: &[T],
    source: &[T],
) -> Result<([T; D], T), SingularEvaluation> {
    let mut diff = [T::zero(); D];
    for (d, (x, y)) in diff.iter_mut().zip(target.iter().zip(source)) {
        *d = *x - *y;
    }
    let r = num::Float::sqrt(diff.iter().fold(T::zero(), |acc, d| acc + *d * *d));
    if r == T::zero() {
        Err(SingularEvaluation)
    } else {
        Ok((diff, r))
    }
}
