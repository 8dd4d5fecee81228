//! Implementation of the Laplace kernel in 2D
use std::marker::PhantomData;

use super::difference;
use crate::traits::Kernel;
use crate::types::{RealScalar, SingularEvaluation, Singularity, ValueShape};
use num::traits::FloatConst;
use num::Float;
use rlst::RlstScalar;

/// Kernel for Laplace in 2D, `G(x, y) = -ln|x - y| / 2π`
#[derive(Clone, Debug, Default)]
pub struct Laplace2dKernel<T: RlstScalar> {
    _phantom_t: PhantomData<T>,
}

impl<T: RlstScalar> Laplace2dKernel<T> {
    /// Create new
    pub fn new() -> Self {
        Self {
            _phantom_t: PhantomData,
        }
    }
}

impl<T: RlstScalar + Send + Sync> Kernel for Laplace2dKernel<T>
where
    T::Real: RealScalar,
{
    type T = T;
    type Real = T::Real;

    fn space_dimension(&self) -> usize {
        2
    }

    fn value_shape(&self) -> ValueShape {
        ValueShape::Scalar
    }

    fn singularity(&self) -> Singularity {
        Singularity::Logarithmic
    }

    fn evaluate(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_2pi = num::cast::<f64, T::Real>(0.5 * f64::FRAC_1_PI()).unwrap();
        let (_, r) = difference::<T::Real, 2>(target, source)?;
        result[0] = T::from_real(-m_inv_2pi * Float::ln(r));
        Ok(())
    }

    fn evaluate_source_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_2pi = num::cast::<f64, T::Real>(0.5 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 2>(target, source)?;
        let scale = m_inv_2pi / (r * r);
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
        let m_inv_2pi = num::cast::<f64, T::Real>(0.5 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 2>(target, source)?;
        let scale = -m_inv_2pi / (r * r);
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
        let kernel = Laplace2dKernel::<f64>::new();
        let mut result = [0.0];
        kernel
            .evaluate(&[0.0, 0.0], &[0.0, 2.0], &mut result)
            .unwrap();
        assert_relative_eq!(result[0], -f64::ln(2.0) / (2.0 * std::f64::consts::PI));
    }
}
