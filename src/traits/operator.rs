//! Linear operators
use crate::types::Result;
use rlst::RlstScalar;

/// A linear map acting on flat buffers.
///
/// This is the interface consumed by iterative solvers.
pub trait LinearOperator: Sync {
    /// Scalar type
    type T: RlstScalar;

    /// Number of rows and columns
    fn shape(&self) -> [usize; 2];

    /// Compute `y = A x`
    fn apply(&self, x: &[Self::T], y: &mut [Self::T]) -> Result<()>;

    /// Compute `A x` into a new vector
    fn apply_vec(&self, x: &[Self::T]) -> Result<Vec<Self::T>> {
        let mut y = vec![<Self::T as num::Zero>::zero(); self.shape()[0]];
        self.apply(x, &mut y)?;
        Ok(y)
    }
}
