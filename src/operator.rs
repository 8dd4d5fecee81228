//! Boundary operators
use std::sync::OnceLock;

use crate::dense::mult_add_into;
use crate::far_field::{DirectEvaluator, FarField};
use crate::near_field::NearFieldCorrection;
use crate::options::{CompressionOptions, CorrectionOptions};
use crate::quadrature::Quadrature;
use crate::traits::{Element, LayerKernel, LinearOperator};
use crate::types::{check_length, BieError, Result, RlstArray};
use num::Zero;
use rlst::RandomAccessMut;

/// Lifecycle of a boundary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    /// Inputs have been collected but nothing has been computed
    Uninitialized,
    /// Near and far field have been built; products are available
    Assembled,
    /// The dense matrix has been computed in addition
    Materialized,
}

/// Summary of an assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    near_field_entries: usize,
    admissible_blocks: usize,
    dense_blocks: usize,
    max_rank: usize,
    storage_ratio: f64,
    failures: Vec<BieError>,
}

impl AssemblyReport {
    /// Number of corrected entries
    pub fn near_field_entries(&self) -> usize {
        self.near_field_entries
    }
    /// Number of admissible far-field blocks
    pub fn admissible_blocks(&self) -> usize {
        self.admissible_blocks
    }
    /// Number of far-field blocks stored dense, including fallbacks
    pub fn dense_blocks(&self) -> usize {
        self.dense_blocks
    }
    /// Number of admissible blocks that missed the tolerance and are stored dense
    pub fn fallback_blocks(&self) -> usize {
        self.failures.len()
    }
    /// Largest rank of a compressed block
    pub fn max_rank(&self) -> usize {
        self.max_rank
    }
    /// Stored scalars relative to the size of the dense matrix
    pub fn storage_ratio(&self) -> f64 {
        self.storage_ratio
    }
    /// The [BieError::CompressionAccuracyUnmet] failures of the fallback blocks
    pub fn failures(&self) -> &[BieError] {
        &self.failures
    }
}

/// A boundary integral operator discretised by a Nyström method.
///
/// The operator is the naive quadrature matrix `A_ij = K(x_i, y_j) w_j`,
/// represented by its far field, plus a sparse overlay that replaces the
/// entries of singular and near-singular pairs. It is immutable after
/// assembly and may be applied concurrently.
pub struct BoundaryOperator<'a, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> {
    evaluator: DirectEvaluator<'a, 'a, K, E, F>,
    far_field: FarField<K>,
    correction: NearFieldCorrection<K::T>,
    report: AssemblyReport,
    dense: OnceLock<RlstArray<K::T, 2>>,
}

impl<'a, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> BoundaryOperator<'a, K, E, F> {
    /// Assemble the operator mapping densities at `sources` to values at `targets`
    pub fn assemble(
        kernel: &'a K,
        sources: &'a Quadrature<'a, E>,
        targets: &'a Quadrature<'a, F>,
        compression: &CompressionOptions,
        correction: &CorrectionOptions,
    ) -> Result<Self> {
        compression.validate()?;
        correction.validate()?;
        check_length(kernel.space_dimension(), sources.dim(), "source dimension")?;
        check_length(kernel.space_dimension(), targets.dim(), "target dimension")?;

        let evaluator = DirectEvaluator::new(kernel, targets, sources);
        let [nrows, ncols] = evaluator.shape();
        let far_field = FarField::build(&evaluator, compression)?;
        log::info!(
            "Built far field ({:?}): {} admissible blocks, {} dense blocks, {} fallbacks, max rank {}",
            far_field.method(),
            far_field.admissible_blocks(),
            far_field.dense_blocks(),
            far_field.fallbacks().len(),
            far_field.max_rank()
        );
        let near_field = NearFieldCorrection::build(&evaluator, &far_field, correction)?;

        let stored = far_field.storage() + near_field.len();
        let report = AssemblyReport {
            near_field_entries: near_field.len(),
            admissible_blocks: far_field.admissible_blocks(),
            dense_blocks: far_field.dense_blocks(),
            max_rank: far_field.max_rank(),
            storage_ratio: stored as f64 / (nrows as f64 * ncols as f64),
            failures: far_field.fallbacks().to_vec(),
        };
        log::info!(
            "Assembled {nrows} x {ncols} operator: {} near-field entries, storage ratio {:.3e}",
            report.near_field_entries,
            report.storage_ratio
        );
        Ok(Self {
            evaluator,
            far_field,
            correction: near_field,
            report,
            dense: OnceLock::new(),
        })
    }

    /// Current state
    pub fn state(&self) -> OperatorState {
        if self.dense.get().is_some() {
            OperatorState::Materialized
        } else {
            OperatorState::Assembled
        }
    }

    /// Number of rows and columns
    pub fn shape(&self) -> [usize; 2] {
        self.evaluator.shape()
    }

    /// Summary of the assembly
    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    /// The near-field overlay
    pub fn corrections(&self) -> &NearFieldCorrection<K::T> {
        &self.correction
    }

    /// The far field
    pub fn far_field(&self) -> &FarField<K> {
        &self.far_field
    }

    /// Compute `y = A x`
    pub fn apply(&self, x: &[K::T], y: &mut [K::T]) -> Result<()> {
        let [nrows, ncols] = self.shape();
        check_length(ncols, x.len(), "operator input")?;
        check_length(nrows, y.len(), "operator output")?;
        y.fill(K::T::zero());
        match self.dense.get() {
            Some(dense) => mult_add_into(dense, x, y),
            None => {
                self.far_field.apply(&self.evaluator, x, y);
                self.correction.apply(x, y);
            }
        }
        Ok(())
    }

    /// Compute `A x` into a new vector
    pub fn apply_vec(&self, x: &[K::T]) -> Result<Vec<K::T>> {
        let mut y = vec![K::T::zero(); self.shape()[0]];
        self.apply(x, &mut y)?;
        Ok(y)
    }

    /// The dense matrix.
    ///
    /// This needs memory for all `rows x columns` entries and is meant for small
    /// problems and testing. The matrix is computed on the first call and
    /// kept; later products use it.
    pub fn materialize(&self) -> &RlstArray<K::T, 2> {
        self.dense.get_or_init(|| self.compute_dense())
    }

    /// Consume the operator and return its dense matrix
    pub fn into_dense(mut self) -> RlstArray<K::T, 2> {
        match self.dense.take() {
            Some(dense) => dense,
            None => self.compute_dense(),
        }
    }

    fn compute_dense(&self) -> RlstArray<K::T, 2> {
        let targets = (0..self.evaluator.targets().len()).collect::<Vec<_>>();
        let sources = (0..self.evaluator.sources().len()).collect::<Vec<_>>();
        let mut dense = self.evaluator.dense_block(&targets, &sources);
        for entry in self.correction.entries() {
            *dense.get_mut([entry.row, entry.col]).unwrap() = entry.corrected;
        }
        log::debug!("Materialized {:?} operator", self.shape());
        dense
    }
}

/// Assemble an operator and return its dense matrix
pub(crate) fn assemble_dense<K, E, F>(
    kernel: &K,
    sources: &Quadrature<'_, E>,
    targets: &Quadrature<'_, F>,
    compression: &CompressionOptions,
    correction: &CorrectionOptions,
) -> Result<RlstArray<K::T, 2>>
where
    K: LayerKernel,
    E: Element<T = K::Real>,
    F: Element<T = K::Real>,
{
    Ok(BoundaryOperator::assemble(kernel, sources, targets, compression, correction)?.into_dense())
}

impl<K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> LinearOperator
    for BoundaryOperator<'_, K, E, F>
{
    type T = K::T;

    fn shape(&self) -> [usize; 2] {
        BoundaryOperator::shape(self)
    }

    fn apply(&self, x: &[K::T], y: &mut [K::T]) -> Result<()> {
        BoundaryOperator::apply(self, x, y)
    }
}

/// Collects the inputs of an assembly.
///
/// Both option sets must be given before [BoundaryOperatorBuilder::assemble]
/// is called.
pub struct BoundaryOperatorBuilder<'a, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> {
    kernel: &'a K,
    sources: &'a Quadrature<'a, E>,
    targets: &'a Quadrature<'a, F>,
    compression: Option<CompressionOptions>,
    correction: Option<CorrectionOptions>,
}

impl<'a, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>>
    BoundaryOperatorBuilder<'a, K, E, F>
{
    /// Create new
    pub fn new(kernel: &'a K, sources: &'a Quadrature<'a, E>, targets: &'a Quadrature<'a, F>) -> Self {
        Self {
            kernel,
            sources,
            targets,
            compression: None,
            correction: None,
        }
    }

    /// Set compression options
    pub fn compression(&mut self, options: CompressionOptions) -> &mut Self {
        self.compression = Some(options);
        self
    }

    /// Set correction options
    pub fn correction(&mut self, options: CorrectionOptions) -> &mut Self {
        self.correction = Some(options);
        self
    }

    /// State of the operator before assembly
    pub fn state(&self) -> OperatorState {
        OperatorState::Uninitialized
    }

    /// Assemble the operator
    pub fn assemble(&self) -> Result<BoundaryOperator<'a, K, E, F>> {
        let compression = self
            .compression
            .as_ref()
            .ok_or_else(|| BieError::InvalidOptions("no compression options".to_string()))?;
        let correction = self
            .correction
            .as_ref()
            .ok_or_else(|| BieError::InvalidOptions("no correction options".to_string()))?;
        BoundaryOperator::assemble(self.kernel, self.sources, self.targets, compression, correction)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kernel::{DoubleLayer, Laplace2dKernel, Laplace3dKernel, SingleLayer};
    use crate::options::{CompressionMethod, CorrectionMethod};
    use crate::shapes::circle;
    use approx::assert_relative_eq;
    use rlst::RandomAccessByRef;

    fn options() -> (CompressionOptions, CorrectionOptions) {
        let compression = CompressionOptions::new(CompressionMethod::None);
        let mut correction = CorrectionOptions::new(CorrectionMethod::SingularitySubtraction, 4);
        correction.set_tolerance(1e-10);
        (compression, correction)
    }

    #[test]
    fn test_builder_needs_both_option_sets() {
        let elements = circle::<f64>(8, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let (compression, _) = options();
        let mut builder = BoundaryOperatorBuilder::new(&kernel, &quadrature, &quadrature);
        assert_eq!(builder.state(), OperatorState::Uninitialized);
        builder.compression(compression);
        assert!(matches!(builder.assemble(), Err(BieError::InvalidOptions(_))));
    }

    #[test]
    fn test_tolerance_is_required() {
        let elements = circle::<f64>(8, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let (compression, _) = options();
        let correction = CorrectionOptions::new(CorrectionMethod::SingularitySubtraction, 4);
        let result = BoundaryOperator::assemble(&kernel, &quadrature, &quadrature, &compression, &correction);
        assert!(matches!(result, Err(BieError::InvalidOptions(_))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let elements = circle::<f64>(8, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
        let kernel = SingleLayer::new(Laplace3dKernel::<f64>::new());
        let (compression, correction) = options();
        let result = BoundaryOperator::assemble(&kernel, &quadrature, &quadrature, &compression, &correction);
        assert!(matches!(result, Err(BieError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_apply_checks_lengths() {
        let elements = circle::<f64>(8, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let (compression, correction) = options();
        let op = BoundaryOperator::assemble(&kernel, &quadrature, &quadrature, &compression, &correction)
            .unwrap();
        let mut y = vec![0.0; 24];
        assert!(op.apply(&[1.0; 23], &mut y).is_err());
        assert!(op.apply(&[1.0; 24], &mut y[..20]).is_err());
        assert!(op.apply(&[1.0; 24], &mut y).is_ok());
    }

    #[test]
    fn test_materialize_keeps_products() {
        let elements = circle::<f64>(12, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
        let kernel = DoubleLayer::new(Laplace2dKernel::<f64>::new());
        let (compression, correction) = options();
        let op = BoundaryOperator::assemble(&kernel, &quadrature, &quadrature, &compression, &correction)
            .unwrap();
        assert_eq!(op.state(), OperatorState::Assembled);
        let x = (0..36).map(|i| (i as f64).sin()).collect::<Vec<_>>();
        let before = op.apply_vec(&x).unwrap();
        let dense = op.materialize();
        assert_eq!(op.state(), OperatorState::Materialized);
        let entry = op.corrections().entries()[0];
        assert_eq!(*dense.get([entry.row, entry.col]).unwrap(), entry.corrected);
        let after = op.apply_vec(&x).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert_relative_eq!(a, b, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_into_dense_with_and_without_materialize() {
        let elements = circle::<f64>(12, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 3).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let (compression, correction) = options();
        let assemble = || {
            BoundaryOperator::assemble(&kernel, &quadrature, &quadrature, &compression, &correction)
                .unwrap()
        };
        let direct = assemble().into_dense();
        let op = assemble();
        op.materialize();
        assert_eq!(op.state(), OperatorState::Materialized);
        let cached = op.into_dense();
        for i in 0..36 {
            for j in 0..36 {
                assert_eq!(
                    *direct.get([i, j]).unwrap(),
                    *cached.get([i, j]).unwrap()
                );
            }
        }
    }
}
