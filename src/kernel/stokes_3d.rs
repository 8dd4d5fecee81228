//! Implementation of the Stokes kernel in 3D
use std::marker::PhantomData;

use super::difference;
use crate::traits::Kernel;
use crate::types::{RealScalar, SingularEvaluation, Singularity, ValueShape};
use num::traits::FloatConst;
use rlst::RlstScalar;

/// Stokeslet in 3D with viscosity μ.
///
/// `G_ij(x, y) = (δ_ij / r + r_i r_j / r^3) / 8πμ` with `r = x - y`. The source
/// flux is the stresslet `T_ijk = 3 r_i r_j r_k / 4π r^5`.
#[derive(Clone, Debug)]
pub struct Stokes3dKernel<T: RlstScalar> {
    viscosity: T::Real,
    _phantom_t: PhantomData<T>,
}

impl<T: RlstScalar> Stokes3dKernel<T> {
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

/// Write `scale * r_i r_j r_k` for all index triples
fn stresslet<T: RlstScalar>(diff: &[T::Real; 3], scale: T::Real, result: &mut [T]) {
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                result[(i * 3 + j) * 3 + k] = T::from_real(scale * diff[i] * diff[j] * diff[k]);
            }
        }
    }
}

impl<T: RlstScalar + Send + Sync> Kernel for Stokes3dKernel<T>
where
    T::Real: RealScalar,
{
    type T = T;
    type Real = T::Real;

    fn space_dimension(&self) -> usize {
        3
    }

    fn value_shape(&self) -> ValueShape {
        ValueShape::Tensor(3)
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
        let m_inv_8pi = num::cast::<f64, T::Real>(0.125 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let scale = m_inv_8pi / self.viscosity;
        let inv_r = <T::Real as num::One>::one() / r;
        let inv_r3 = inv_r * inv_r * inv_r;
        for i in 0..3 {
            for j in 0..3 {
                let delta = if i == j { inv_r } else { num::Zero::zero() };
                result[i * 3 + j] = T::from_real(scale * (delta + diff[i] * diff[j] * inv_r3));
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
        let m_3_over_4pi = num::cast::<f64, T::Real>(0.75 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let r2 = r * r;
        stresslet(&diff, m_3_over_4pi / (r2 * r2 * r), result);
        Ok(())
    }

    fn evaluate_target_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let m_3_over_4pi = num::cast::<f64, T::Real>(0.75 * f64::FRAC_1_PI()).unwrap();
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let r2 = r * r;
        stresslet(&diff, -m_3_over_4pi / (r2 * r2 * r), result);
        Ok(())
    }

    fn double_layer_identity(&self) -> Option<T> {
        Some(T::from_real(num::cast::<f64, T::Real>(-0.5).unwrap()))
    }
}
