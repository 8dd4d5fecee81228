//! Types specific to bempp-nystrom

use rlst::{Array, BaseArray, LinAlg, RlstScalar, VectorContainer};

/// Real scalar used for coordinates, normals and weights.
pub trait RealScalar: num::Float + LinAlg + RlstScalar<Real = Self> + Send + Sync {}

impl<T: num::Float + LinAlg + RlstScalar<Real = T> + Send + Sync> RealScalar for T {}

/// A dynamically sized rlst array.
pub type RlstArray<T, const DIM: usize> = Array<T, BaseArray<T, VectorContainer<T>, DIM>, DIM>;

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, BieError>;

/// Check that a length matches the expected one
pub(crate) fn check_length(expected: usize, actual: usize, context: &'static str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(BieError::DimensionMismatch {
            expected,
            actual,
            context,
        })
    }
}

/// Reference cell of a boundary element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceCellType {
    /// The interval \[0, 1\], used for curves in 2D.
    Interval,
    /// The triangle with vertices (0, 0), (1, 0), (0, 1), used for surfaces in 3D.
    Triangle,
}

impl ReferenceCellType {
    /// Topological dimension of the cell.
    pub fn dim(&self) -> usize {
        match self {
            ReferenceCellType::Interval => 1,
            ReferenceCellType::Triangle => 2,
        }
    }

    /// Volume of the reference cell.
    pub fn volume(&self) -> f64 {
        match self {
            ReferenceCellType::Interval => 1.0,
            ReferenceCellType::Triangle => 0.5,
        }
    }

    /// Coordinates of the vertices, stored point by point.
    pub fn vertices(&self) -> &'static [f64] {
        match self {
            ReferenceCellType::Interval => &[0.0, 1.0],
            ReferenceCellType::Triangle => &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Shape of the values a kernel returns for a single pair of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// A scalar.
    Scalar,
    /// A square tensor acting on vectors with the given number of components.
    Tensor(usize),
}

impl ValueShape {
    /// Number of components of the unknown at each point.
    pub fn components(&self) -> usize {
        match self {
            ValueShape::Scalar => 1,
            ValueShape::Tensor(d) => *d,
        }
    }

    /// Number of values returned for one pair of points.
    pub fn size(&self) -> usize {
        self.components() * self.components()
    }
}

/// Behaviour of a kernel as the target approaches the source.
///
/// Variants are ordered from the mildest to the strongest singularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Singularity {
    /// Bounded, but not defined at coincident points.
    Bounded,
    /// Grows like `ln(1/r)`.
    Logarithmic,
    /// Grows like `1/r`.
    InverseDistance,
}

/// Signal raised by a kernel evaluated at coincident source and target points.
///
/// This never leaves the crate: assembly routes such pairs to the near-field corrector.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("kernel evaluated at coincident source and target points")]
pub struct SingularEvaluation;

/// Errors raised while building or using boundary operators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BieError {
    /// An element has zero (or invalid) measure.
    #[error("element {element} is degenerate (measure {measure:e})")]
    DegenerateElement {
        /// Index of the element
        element: usize,
        /// Measure computed for the element
        measure: f64,
    },
    /// The singular correction of an entry did not converge.
    #[error(
        "correction for target {target} on source element {source_element} did not converge \
         after {levels} refinement levels (change {estimate:e})"
    )]
    CorrectionDivergence {
        /// Target point index
        target: usize,
        /// Source element index
        source_element: usize,
        /// Number of refinement levels used
        levels: usize,
        /// Last estimated change of the corrected values
        estimate: f64,
    },
    /// A far-field block did not reach the tolerance within its budget.
    #[error(
        "block of target cluster {target_cluster} and source cluster {source_cluster} reached \
         {achieved:e} instead of {tolerance:e} with budget {budget}"
    )]
    CompressionAccuracyUnmet {
        /// Target cluster index
        target_cluster: usize,
        /// Source cluster index
        source_cluster: usize,
        /// Requested tolerance
        tolerance: f64,
        /// Achieved accuracy estimate
        achieved: f64,
        /// Maximum rank or expansion order that was allowed
        budget: usize,
    },
    /// A potential was requested at a point too close to a source point.
    #[error(
        "evaluation point {point} is {distance:e} from source point {source_index} (threshold {threshold:e})"
    )]
    EvaluationNearSingularity {
        /// Evaluation point index
        point: usize,
        /// Closest source point index
        source_index: usize,
        /// Distance between the two
        distance: f64,
        /// Threshold below which evaluation is refused
        threshold: f64,
    },
    /// Sizes of inputs do not fit together.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
        /// What was being checked
        context: &'static str,
    },
    /// Invalid or incomplete options.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    /// The chosen correction method cannot be used with this operator.
    #[error("unsupported correction: {0}")]
    UnsupportedCorrection(String),
    /// An element or rule that is not supported.
    #[error("unsupported element: {0}")]
    UnsupportedElement(String),
    /// A quadrature without points.
    #[error("quadrature contains no points")]
    EmptyQuadrature,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_value_shape() {
        assert_eq!(ValueShape::Scalar.components(), 1);
        assert_eq!(ValueShape::Scalar.size(), 1);
        assert_eq!(ValueShape::Tensor(3).components(), 3);
        assert_eq!(ValueShape::Tensor(3).size(), 9);
    }

    #[test]
    fn test_check_length() {
        assert!(check_length(3, 3, "points").is_ok());
        assert_eq!(
            check_length(3, 4, "points"),
            Err(BieError::DimensionMismatch {
                expected: 3,
                actual: 4,
                context: "points"
            })
        );
    }

    #[test]
    fn test_reference_cells() {
        assert_eq!(ReferenceCellType::Interval.dim(), 1);
        assert_eq!(ReferenceCellType::Triangle.dim(), 2);
        assert_eq!(
            ReferenceCellType::Triangle.vertices().len(),
            3 * ReferenceCellType::Triangle.dim()
        );
    }

    #[test]
    fn test_error_messages_name_the_culprit() {
        let e = BieError::DegenerateElement {
            element: 7,
            measure: 0.0,
        };
        assert!(format!("{e}").contains("element 7"));
        let e = BieError::CorrectionDivergence {
            target: 3,
            source_element: 11,
            levels: 6,
            estimate: 1e-3,
        };
        assert!(format!("{e}").contains("target 3"));
        assert!(format!("{e}").contains("element 11"));
        let e = BieError::EvaluationNearSingularity {
            point: 2,
            source_index: 5,
            distance: 1e-3,
            threshold: 1e-2,
        };
        assert!(format!("{e}").contains("source point 5"));
    }

    #[test]
    fn test_errors_have_no_underlying_cause() {
        let e = BieError::EvaluationNearSingularity {
            point: 0,
            source_index: 1,
            distance: 0.0,
            threshold: 0.0,
        };
        assert!(std::error::Error::source(&e).is_none());
    }
}
