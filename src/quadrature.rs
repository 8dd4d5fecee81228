//! Quadrature rules and the quadrature table
pub mod duffy;
pub mod gauss;
pub mod simplex_rules;
mod table;
pub mod types;

pub(crate) use table::same_quadrature;
pub use table::{Quadrature, QuadraturePoint};
