//! Helmholtz operators

/// Assemblers for Helmholtz problems
pub mod assembler {
    use num::Zero;
    use rlst::RlstScalar;

    use crate::{
        kernel::{
            AdjointDoubleLayer, DoubleLayer, Helmholtz3dKernel, LayerKernelSum,
            LayerKernelTimesScalar, SingleLayer,
        },
        operator::assemble_dense,
        options::{CompressionOptions, CorrectionOptions},
        quadrature::Quadrature,
        traits::Element,
        types::{RealScalar, Result, RlstArray},
    };

    /// Assembler for the Helmholtz single layer operator.
    pub fn helmholtz_single_layer<T, E, F>(
        wavenumber: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar<Complex = T> + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = SingleLayer::new(Helmholtz3dKernel::<T>::new(wavenumber));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Helmholtz double layer operator.
    pub fn helmholtz_double_layer<T, E, F>(
        wavenumber: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar<Complex = T> + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = DoubleLayer::new(Helmholtz3dKernel::<T>::new(wavenumber));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Helmholtz adjoint double layer operator.
    pub fn helmholtz_adjoint_double_layer<T, E, F>(
        wavenumber: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar<Complex = T> + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = AdjointDoubleLayer::new(Helmholtz3dKernel::<T>::new(wavenumber));
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the combined field operator `D - i eta S`.
    ///
    /// Combined field formulations of exterior problems are uniquely solvable
    /// for every wavenumber when `eta` is non-zero.
    pub fn helmholtz_combined_field<T, E, F>(
        wavenumber: T::Real,
        eta: T::Real,
        sources: &Quadrature<'_, E>,
        targets: &Quadrature<'_, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<RlstArray<T, 2>>
    where
        T: RlstScalar<Complex = T> + Send + Sync,
        T::Real: RealScalar,
        E: Element<T = T::Real>,
        F: Element<T = T::Real>,
    {
        let kernel = LayerKernelSum::new(
            DoubleLayer::new(Helmholtz3dKernel::<T>::new(wavenumber)),
            LayerKernelTimesScalar::new(
                T::complex(<T::Real as Zero>::zero(), -eta),
                SingleLayer::new(Helmholtz3dKernel::<T>::new(wavenumber)),
            ),
        );
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

}
