//! Near-field correction
//!
//! Entries of the naive Nyström matrix whose source element lies close to the
//! target are replaced by integrals of the kernel against the Lagrange basis
//! through the quadrature points of the element.
mod adaptive;
pub mod corrector;
pub mod interpolation;
mod singular;

pub use corrector::{CorrectionEntry, NearFieldCorrection};
pub use interpolation::NodalInterpolant;
