//! Implementation of the Helmholtz kernel
use std::marker::PhantomData;

use super::difference;
use crate::traits::Kernel;
use crate::types::{RealScalar, SingularEvaluation, Singularity, ValueShape};
use num::traits::FloatConst;
use num::Float;
use rlst::RlstScalar;

/// Kernel for Helmholtz in 3D, `G(x, y) = e^{ik|x - y|} / 4π|x - y|`
#[derive(Clone, Debug)]
pub struct Helmholtz3dKernel<T: RlstScalar> {
    wavenumber: T::Real,
    _phantom_t: PhantomData<T>,
}

impl<T: RlstScalar> Helmholtz3dKernel<T> {
    /// Create new
    pub fn new(wavenumber: T::Real) -> Self {
        Self {
            wavenumber,
            _phantom_t: PhantomData,
        }
    }

    /// The wavenumber
    pub fn wavenumber(&self) -> T::Real {
        self.wavenumber
    }

    /// `e^{ikr} (ikr - 1) / 4π r^3`, the radial factor of both fluxes
    fn flux_factor(&self, r: T::Real) -> T
    where
        T: RlstScalar<Complex = T>,
        T::Real: RealScalar,
    {
        let m_inv_4pi = num::cast::<f64, T::Real>(0.25 * f64::FRAC_1_PI()).unwrap();
        let kr = self.wavenumber * r;
        let (s, c) = (Float::sin(kr), Float::cos(kr));
        T::complex(-c - kr * s, kr * c - s).mul_real(m_inv_4pi / (r * r * r))
    }
}

impl<T: RlstScalar<Complex = T> + Send + Sync> Kernel for Helmholtz3dKernel<T>
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
        let kr = self.wavenumber * r;
        result[0] = T::complex(Float::cos(kr), Float::sin(kr)).mul_real(m_inv_4pi / r);
        Ok(())
    }

    fn evaluate_source_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let factor = self.flux_factor(r);
        for (res, d) in result.iter_mut().zip(diff) {
            *res = factor.mul_real(-d);
        }
        Ok(())
    }

    fn evaluate_target_flux(
        &self,
        target: &[T::Real],
        source: &[T::Real],
        result: &mut [T],
    ) -> Result<(), SingularEvaluation> {
        let (diff, r) = difference::<T::Real, 3>(target, source)?;
        let factor = self.flux_factor(r);
        for (res, d) in result.iter_mut().zip(diff) {
            *res = factor.mul_real(d);
        }
        Ok(())
    }
}
