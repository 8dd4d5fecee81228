//! Laplace operators

/// Assemblers for Laplace problems.
///
/// Each assembler builds a [BoundaryOperator](crate::operator::BoundaryOperator)
/// and returns its dense matrix. Rows belong to target points and columns to
/// source points.
pub mod assembler {
    use rlst::RlstScalar;

    use crate::{
        kernel::{AdjointDoubleLayer, DoubleLayer, Laplace2dKernel, Laplace3dKernel, SingleLayer},
        operator::assemble_dense,
        options::{CompressionOptions, CorrectionOptions},
        quadrature::Quadrature,
        traits::Element,
        types::{RealScalar, Result, RlstArray},
    };

    /// Assembler for the Laplace single layer operator.
    pub fn laplace_single_layer<T, E, F>(
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
        let kernel = SingleLayer::new(Laplace3dKernel::<T>::new());
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Laplace double layer operator.
    pub fn laplace_double_layer<T, E, F>(
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
        let kernel = DoubleLayer::new(Laplace3dKernel::<T>::new());
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Laplace adjoint double layer operator.
    pub fn laplace_adjoint_double_layer<T, E, F>(
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
        let kernel = AdjointDoubleLayer::new(Laplace3dKernel::<T>::new());
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Laplace single layer operator in two dimensions.
    pub fn laplace_single_layer_2d<T, E, F>(
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
        let kernel = SingleLayer::new(Laplace2dKernel::<T>::new());
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Laplace double layer operator in two dimensions.
    pub fn laplace_double_layer_2d<T, E, F>(
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
        let kernel = DoubleLayer::new(Laplace2dKernel::<T>::new());
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    /// Assembler for the Laplace adjoint double layer operator in two dimensions.
    pub fn laplace_adjoint_double_layer_2d<T, E, F>(
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
        let kernel = AdjointDoubleLayer::new(Laplace2dKernel::<T>::new());
        assemble_dense(&kernel, sources, targets, compression, correction)
    }

    #[cfg(test)]
    mod test {
        use super::*;
        use crate::options::{CompressionMethod, CorrectionMethod};
        use crate::shapes::{circle, regular_sphere};
        use crate::types::BieError;
        use approx::assert_relative_eq;
        use rlst::{RandomAccessByRef, Shape};

        fn options() -> (CompressionOptions, CorrectionOptions) {
            let compression = CompressionOptions::new(CompressionMethod::None);
            let mut correction = CorrectionOptions::new(CorrectionMethod::SingularitySubtraction, 6);
            correction.set_tolerance(1e-10);
            (compression, correction)
        }

        fn row_sums(matrix: &RlstArray<f64, 2>) -> Vec<f64> {
            let [m, n] = matrix.shape();
            (0..m)
                .map(|i| (0..n).map(|j| *matrix.get([i, j]).unwrap()).sum())
                .collect()
        }

        #[test]
        fn test_double_layer_of_constant_on_sphere() {
            let elements = regular_sphere::<f64>(1);
            let quadrature = Quadrature::from_elements(&elements, 6).unwrap();
            let (compression, correction) = options();
            let matrix = laplace_double_layer::<f64, _, _>(&quadrature, &quadrature, &compression, &correction).unwrap();
            assert_eq!(matrix.shape(), [quadrature.len(), quadrature.len()]);
            for sum in row_sums(&matrix) {
                assert_relative_eq!(sum, -0.5, epsilon = 1e-3);
            }
        }

        #[test]
        fn test_double_layer_of_constant_on_circle() {
            let elements = circle::<f64>(16, 1.0);
            let quadrature = Quadrature::from_elements(&elements, 6).unwrap();
            let (compression, correction) = options();
            let matrix =
                laplace_double_layer_2d::<f64, _, _>(&quadrature, &quadrature, &compression, &correction).unwrap();
            for sum in row_sums(&matrix) {
                assert_relative_eq!(sum, -0.5, epsilon = 1e-8);
            }
        }

        #[test]
        fn test_adjoint_double_layer_is_scaled_transpose() {
            let elements = circle::<f64>(8, 1.0);
            let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
            let compression = CompressionOptions::new(CompressionMethod::None);
            let mut correction = CorrectionOptions::new(CorrectionMethod::SingularitySubtraction, 4);
            correction.set_tolerance(1e-10);
            correction.set_near_field_ratio(0.0);
            let dl = laplace_double_layer_2d::<f64, _, _>(&quadrature, &quadrature, &compression, &correction).unwrap();
            let adl =
                laplace_adjoint_double_layer_2d::<f64, _, _>(&quadrature, &quadrature, &compression, &correction)
                    .unwrap();
            // Entries outside the own element are not corrected
            let n = quadrature.len();
            for i in 0..n {
                for j in 0..n {
                    if quadrature.element(i) == quadrature.element(j) {
                        continue;
                    }
                    let a = *adl.get([i, j]).unwrap() / quadrature.weight(j);
                    let d = *dl.get([j, i]).unwrap() / quadrature.weight(i);
                    assert_relative_eq!(a, d, epsilon = 1e-12);
                }
            }
        }

        #[test]
        fn test_single_layer_dimension_is_checked() {
            let elements = circle::<f64>(8, 1.0);
            let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
            let (compression, correction) = options();
            let result = laplace_single_layer::<f64, _, _>(&quadrature, &quadrature, &compression, &correction);
            assert!(matches!(result, Err(BieError::DimensionMismatch { .. })));
        }
    }
}
