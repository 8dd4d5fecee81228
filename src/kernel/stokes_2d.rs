//! Implementation of the Stokes kernel in 2D
use std::marker::PhantomData;

use super::difference;
use crate::traits::Kernel;
use crate::types::{RealScalar, SingularEvaluation, Singularity, ValueShape};
use num::traits::FloatConst;
use num::Float;
use rlst::RlstScalar;

/// Stokeslet in 2D with viscosity μ.
///
/// `G_ij(x, y) = (-ln r δ_ij + r_i r_j / r^2) / 4πμ` with `r = x - y`. The
/// source flux is the stresslet `T_ijk = r_i r_j r_k / π r^4`.
#[derive(Clone, Debug)]
pub struct Stokes2dKernel<T: RlstScalar> {
    viscosity: T::Real,
    _phantom_t: PhantomData<T>,
}

impl<T: RlstScalar> Stokes2dKernel<T> {
    /// Create new
    pub fn new(viscosity: T::Real) -> Self {
        Self {
            viscosity,
            _phantom_t: PhantomData,
        }
    }

    /// The viscosity
    pub fn viscosity(&self) -> T::Real {
        self.viscosity
    }
}

fn stresslet<T: RlstScalar>(diff: &[T::Real; 2], scale: T::Real, result: &mut [T]) {
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                result[(i * 2 + j) * 2 + k] = T::from_real(scale * diff[i] * diff[j] * diff[k]);
            }
        }
    }
}

impl<T: RlstScalar + Send + Sync> Kernel for Stokes2dKernel<T>
where
    T::Real: RealScalar,
{
    type T = T;
    type Real = T::Real;

    fn space_dimension(&self) -> usize {
        2
    }

    fn value_shape(&self) -> ValueShape {
        ValueShape::Tensor(2)
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
        let m_inv_4pi = num::cast::<f64, T::Real>(0.25 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 2>(target, source)?;
        let scale = m_inv_4pi / self.viscosity;
        let log_r = Float::ln(r);
        let inv_r2 = <T::Real as num::One>::one() / (r * r);
        for i in 0..2 {
            for j in 0..2 {
                let delta = if i == j { -log_r } else { num::Zero::zero() };
                result[i * 2 + j] = T::from_real(scale * (delta + diff[i] * diff[j] * inv_r2));
            }
        }
        Ok(())
    }

    fn evaluate_source_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_pi = num::cast::<f64, T::Real>(f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 2>(target, source)?;
        let r2 = r * r;
        stresslet(&diff, m_inv_pi / (r2 * r2), result);
        Ok(())
    }

    fn evaluate_target_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_inv_pi = num::cast::<f64, T::Real>(f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 2>(target, source)?;
        let r2 = r * r;
        stresslet(&diff, -m_inv_pi / (r2 * r2), result);
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
        let kernel = Stokes2dKernel::<f64>::new(0.5);
        let mut result = [0.0; 4];
        kernel
            .evaluate(&[0.0, 0.0], &[0.0, -2.0], &mut result)
            .unwrap();
        let c = 1.0 / (2.0 * std::f64::consts::PI);
        assert_relative_eq!(result[0], -c * f64::ln(2.0));
        assert_relative_eq!(result[3], c * (1.0 - f64::ln(2.0)));
        assert_relative_eq!(result[1], 0.0);
        assert_relative_eq!(result[2], 0.0);
    }
}
