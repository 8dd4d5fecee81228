//! Implementation of the Laplace kernel in 3D
use std::marker::PhantomData;

use super::difference;
use crate::traits::Kernel;
use crate::types::{RealScalar, SingularEvaluation, Singularity, ValueShape};
use num::traits::FloatConst;
use rlst::RlstScalar;

/// Kernel for Laplace in 3D, `G(x, y) = 1 / 4π|x - y|`
#[derive(Clone, Debug, Default)]
pub struct Laplace3dKernel<T: RlstScalar> {
    _phantom_t: PhantomData<T>,
}

impl<T: RlstScalar> Laplace3dKernel<T> {
    /// Create new
    pub fn new() -> Self {
        Self {
            _phantom_t: PhantomData,
        }
    }
}

impl<T: RlstScalar + Send + Sync> Kernel for Laplace3dKernel<T>
where
    T::Real: RealScalar,
{
    type T = T;
    type Real = T::Real;

    fn space_dimension(&self) -> usize {
        3
    }

    fn value_shape(&self) -> ValueShape {
        ValueShape::Scalar
    }

    fn singularity(&self) -> Singularity {
        Singularity::InverseDistance
    }

    fn evaluate(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_4pi = num::cast::<f64, T::Real>(0.25 * f64::FRAC_1_PI()).unwrap();
        let (_, r) = difference::<T::Real, 3>(target, source)?;
        result[0] = T::from_real(m_inv_4pi / r);
        Ok(())
    }

    fn evaluate_source_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_4pi = num::cast::<f64, T::Real>(0.25 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let scale = m_inv_4pi / (r * r * r);
        for (res, d) in result.iter_mut().zip(diff) {
            *res = T::from_real(scale * d);
        }
        Ok(())
    }

    fn evaluate_target_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_4pi = num::cast::<f64, T::Real>(0.25 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let scale = -m_inv_4pi / (r * r * r);
        for (res, d) in result.iter_mut().zip(diff) {
            *res = T::from_real(scale * d);
        }
        Ok(())
    }

    fn double_layer_identity(&self) -> Option<T> {
        Some(T::from_real(num::cast::<f64, T::Real>(-0.5).unwrap()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_value() {
        let kernel = Laplace3dKernel::<f64>::new();
        let mut result = [0.0];
        kernel
            .evaluate(&[1.0, 0.0, 0.0], &[0.0, 2.0, 2.0], &mut result)
            .unwrap();
        assert_relative_eq!(result[0], 1.0 / (12.0 * std::f64::consts::PI));
    }
}
