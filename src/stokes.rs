//! Stokes operators
//!
//! Unknowns are velocities and tractions interleaved point by point, so the
//! component `c` at point `i` has index `i * d + c`.

/// Assemblers for Stokes problems
pub mod assembler {
    use rlst::RlstScalar;

    use crate::{
        kernel::{DoubleLayer, SingleLayer, Stokes2dKernel, Stokes3dKernel},
        operator::assemble_dense,
        options::{CompressionOptions, CorrectionOptions},
        quadrature::Quadrature,
        traits::Element,
        types::{RealScalar, Result, RlstArray},
    };

    /// Assembler for the Stokes single layer operator.
    pub fn stokes_single_layer<T, E, F>(
        viscosity: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = SingleLayer::new(Stokes3dKernel::<T>::new(viscosity));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Stokes double layer operator.
    pub fn stokes_double_layer<T, E, F>(
        viscosity: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = DoubleLayer::new(Stokes3dKernel::<T>::new(viscosity));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Stokes single layer operator in two dimensions.
    pub fn stokes_single_layer_2d<T, E, F>(
        viscosity: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = SingleLayer::new(Stokes2dKernel::<T>::new(viscosity));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Stokes double layer operator in two dimensions.
    pub fn stokes_double_layer_2d<T, E, F>(
        viscosity: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = DoubleLayer::new(Stokes2dKernel::<T>::new(viscosity));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

}
