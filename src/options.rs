//! Options for assembly and potential evaluation
//!
//! Tolerances have no defaults: an assembly with a compression or correction
//! method that needs a tolerance fails with [BieError::InvalidOptions] unless
//! one has been set.
use crate::types::{BieError, Result};

/// How the far field is represented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Direct evaluation of every interaction
    None,
    /// Hierarchical blocks compressed by adaptive cross approximation
    LowRankHierarchical,
    /// Hierarchical blocks compressed by interpolation of the kernel
    Multipole,
}

/// What to do with a far-field block that misses the tolerance within its budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyFallback {
    /// Store the block dense and record the failure in the assembly report
    DirectEvaluation,
    /// Abort the assembly
    Fail,
}

/// How singular and near-singular interactions are corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMethod {
    /// Singular transforms with Richardson extrapolation on the element, graded oversampling near it
    SingularitySubtraction,
    /// Zeroth order density interpolation using the double layer identity
    DensityInterpolation,
    /// Singular transforms on the element, adaptive subdivision near it
    Adaptive,
}

/// What to do with evaluation points too close to a source point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearSingularityAction {
    /// Return [BieError::EvaluationNearSingularity]
    Fail,
    /// Evaluate anyway, skipping coincident sources
    Accept,
}

fn check_tolerance(tolerance: Option<f64>, what: &str) -> Result<f64> {
    match tolerance {
        None => Err(BieError::InvalidOptions(format!(
            "no tolerance set for {what}"
        ))),
        Some(tol) if !(tol > 0.0 && tol < 1.0) => Err(BieError::InvalidOptions(format!(
            "{what} tolerance {tol} is not in (0, 1)"
        ))),
        Some(tol) => Ok(tol),
    }
}

/// Options for far-field compression
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    method: CompressionMethod,
    tolerance: Option<f64>,
    leaf_size: usize,
    admissibility: f64,
    max_rank: usize,
    initial_expansion_order: usize,
    max_expansion_order: usize,
    accuracy_fallback: AccuracyFallback,
}

impl CompressionOptions {
    /// Create new
    pub fn new(method: CompressionMethod) -> Self {
        Self {
            method,
            tolerance: None,
            leaf_size: 32,
            admissibility: 1.0,
            max_rank: 64,
            initial_expansion_order: 4,
            max_expansion_order: 16,
            accuracy_fallback: AccuracyFallback::DirectEvaluation,
        }
    }

    /// Check the options
    pub fn validate(&self) -> Result<()> {
        if self.method == CompressionMethod::None {
            return Ok(());
        }
        check_tolerance(self.tolerance, "compression")?;
        if self.leaf_size == 0 {
            return Err(BieError::InvalidOptions("leaf size must be positive".to_string()));
        }
        if !(self.admissibility > 0.0) {
            return Err(BieError::InvalidOptions(
                "admissibility parameter must be positive".to_string(),
            ));
        }
        if self.max_rank == 0 {
            return Err(BieError::InvalidOptions("maximum rank must be positive".to_string()));
        }
        if self.initial_expansion_order == 0
            || self.initial_expansion_order > self.max_expansion_order
        {
            return Err(BieError::InvalidOptions(format!(
                "expansion orders {} to {} are invalid",
                self.initial_expansion_order, self.max_expansion_order
            )));
        }
        Ok(())
    }

    /// Compression method
    pub fn method(&self) -> CompressionMethod {
        self.method
    }
    /// Tolerance
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }
    /// Set tolerance
    pub fn set_tolerance(&mut self, tolerance: f64) -> &mut Self {
        self.tolerance = Some(tolerance);
        self
    }
    /// Maximum number of points in a leaf of the cluster tree
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }
    /// Set leaf size
    pub fn set_leaf_size(&mut self, leaf_size: usize) -> &mut Self {
        self.leaf_size = leaf_size;
        self
    }
    /// Admissibility parameter η
    pub fn admissibility(&self) -> f64 {
        self.admissibility
    }
    /// Set admissibility parameter
    pub fn set_admissibility(&mut self, eta: f64) -> &mut Self {
        self.admissibility = eta;
        self
    }
    /// Maximum rank of a low-rank block
    pub fn max_rank(&self) -> usize {
        self.max_rank
    }
    /// Set maximum rank
    pub fn set_max_rank(&mut self, max_rank: usize) -> &mut Self {
        self.max_rank = max_rank;
        self
    }
    /// First interpolation order tried for expansions
    pub fn initial_expansion_order(&self) -> usize {
        self.initial_expansion_order
    }
    /// Set first interpolation order
    pub fn set_initial_expansion_order(&mut self, order: usize) -> &mut Self {
        self.initial_expansion_order = order;
        self
    }
    /// Largest interpolation order used for expansions
    pub fn max_expansion_order(&self) -> usize {
        self.max_expansion_order
    }
    /// Set largest interpolation order
    pub fn set_max_expansion_order(&mut self, order: usize) -> &mut Self {
        self.max_expansion_order = order;
        self
    }
    /// Behaviour for blocks missing the tolerance
    pub fn accuracy_fallback(&self) -> AccuracyFallback {
        self.accuracy_fallback
    }
    /// Set behaviour for blocks missing the tolerance
    pub fn set_accuracy_fallback(&mut self, fallback: AccuracyFallback) -> &mut Self {
        self.accuracy_fallback = fallback;
        self
    }
}

/// Options for near-field correction
#[derive(Debug, Clone)]
pub struct CorrectionOptions {
    method: CorrectionMethod,
    order: usize,
    tolerance: Option<f64>,
    near_field_ratio: f64,
    max_refinement_levels: usize,
    richardson_order: usize,
}

impl CorrectionOptions {
    /// Create new
    ///
    /// `order` is the number of Gauss points per direction on the coarsest level of the singular rules.
    pub fn new(method: CorrectionMethod, order: usize) -> Self {
        Self {
            method,
            order,
            tolerance: None,
            near_field_ratio: 1.0,
            max_refinement_levels: 6,
            richardson_order: 4,
        }
    }

    /// Check the options
    pub fn validate(&self) -> Result<()> {
        check_tolerance(self.tolerance, "correction")?;
        if self.order == 0 {
            return Err(BieError::InvalidOptions(
                "correction order must be positive".to_string(),
            ));
        }
        if !(self.near_field_ratio >= 0.0) {
            return Err(BieError::InvalidOptions(
                "near field ratio must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Correction method
    pub fn method(&self) -> CorrectionMethod {
        self.method
    }
    /// Order of the singular rules
    pub fn order(&self) -> usize {
        self.order
    }
    /// Tolerance
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }
    /// Set tolerance
    pub fn set_tolerance(&mut self, tolerance: f64) -> &mut Self {
        self.tolerance = Some(tolerance);
        self
    }
    /// Radius of the near field relative to the element size
    pub fn near_field_ratio(&self) -> f64 {
        self.near_field_ratio
    }
    /// Set radius of the near field relative to the element size
    pub fn set_near_field_ratio(&mut self, ratio: f64) -> &mut Self {
        self.near_field_ratio = ratio;
        self
    }
    /// Maximum number of refinement levels
    pub fn max_refinement_levels(&self) -> usize {
        self.max_refinement_levels
    }
    /// Set maximum number of refinement levels
    pub fn set_max_refinement_levels(&mut self, levels: usize) -> &mut Self {
        self.max_refinement_levels = levels;
        self
    }
    /// Convergence order assumed by Richardson extrapolation
    pub fn richardson_order(&self) -> usize {
        self.richardson_order
    }
    /// Set convergence order assumed by Richardson extrapolation
    pub fn set_richardson_order(&mut self, order: usize) -> &mut Self {
        self.richardson_order = order;
        self
    }
}

/// Options for potential evaluation
#[derive(Debug, Clone)]
pub struct PotentialOptions {
    singularity_ratio: f64,
    action: NearSingularityAction,
}

impl PotentialOptions {
    /// Create new
    ///
    /// Evaluation points closer to a source point than `singularity_ratio`
    /// times the size of its element are near-singular.
    pub fn new(singularity_ratio: f64) -> Self {
        Self {
            singularity_ratio,
            action: NearSingularityAction::Fail,
        }
    }

    /// Ratio defining near-singular evaluation points
    pub fn singularity_ratio(&self) -> f64 {
        self.singularity_ratio
    }
    /// Action for near-singular evaluation points
    pub fn action(&self) -> NearSingularityAction {
        self.action
    }
    /// Set action for near-singular evaluation points
    pub fn set_action(&mut self, action: NearSingularityAction) -> &mut Self {
        self.action = action;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tolerance_is_required() {
        let mut options = CompressionOptions::new(CompressionMethod::LowRankHierarchical);
        assert!(matches!(options.validate(), Err(BieError::InvalidOptions(_))));
        options.set_tolerance(1e-6);
        assert!(options.validate().is_ok());
        options.set_tolerance(2.0);
        assert!(options.validate().is_err());

        assert!(CompressionOptions::new(CompressionMethod::None)
            .validate()
            .is_ok());

        for method in [
            CorrectionMethod::SingularitySubtraction,
            CorrectionMethod::DensityInterpolation,
            CorrectionMethod::Adaptive,
        ] {
            let mut options = CorrectionOptions::new(method, 4);
            assert!(matches!(options.validate(), Err(BieError::InvalidOptions(_))));
            options.set_tolerance(1e-8);
            assert!(options.validate().is_ok());
        }
    }

    #[test]
    fn test_defaults() {
        let options = CompressionOptions::new(CompressionMethod::Multipole);
        assert_eq!(options.leaf_size(), 32);
        assert_eq!(options.max_rank(), 64);
        assert_eq!(options.initial_expansion_order(), 4);
        assert_eq!(options.max_expansion_order(), 16);
        assert_eq!(
            options.accuracy_fallback(),
            AccuracyFallback::DirectEvaluation
        );
        let options = CorrectionOptions::new(CorrectionMethod::Adaptive, 3);
        assert_eq!(options.max_refinement_levels(), 6);
        assert_eq!(options.richardson_order(), 4);
        assert_eq!(PotentialOptions::new(0.1).action(), NearSingularityAction::Fail);
    }
}
