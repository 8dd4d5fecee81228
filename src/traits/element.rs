//! Boundary elements
use crate::types::{RealScalar, ReferenceCellType};

/// A geometric boundary element parametrised over a reference cell.
///
/// Points in reference and physical space are passed as flat slices with
/// `tdim` and `gdim` entries. The Jacobian is a `gdim x tdim` matrix stored
/// column-major, so that entry `jacobian[i + gdim * j]` is the derivative of
/// physical coordinate `i` with respect to reference coordinate `j`.
pub trait Element: Sync {
    /// The floating point type used for coordinates
    type T: RealScalar;

    /// The reference cell this element is parametrised over
    fn reference_cell(&self) -> ReferenceCellType;

    /// Dimension of the physical space
    fn geometry_dim(&self) -> usize;

    /// Topological dimension of the element
    fn topology_dim(&self) -> usize {
        self.reference_cell().dim()
    }

    /// Map a reference point to physical space
    fn reference_to_physical(&self, reference: &[Self::T], physical: &mut [Self::T]);

    /// Compute the Jacobian of the parametrisation at a reference point
    fn jacobian(&self, reference: &[Self::T], jacobian: &mut [Self::T]);
}
