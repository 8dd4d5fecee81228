//! Bempp Nyström
//!
//! Nyström discretisation of boundary integral operators. Operators act on
//! densities sampled at the points of a [quadrature::Quadrature]; entries of
//! singular and near-singular pairs are replaced by corrected weights, and
//! well-separated interactions are compressed by hierarchical low-rank or
//! multipole approximations.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

#[macro_use]
extern crate lazy_static;

mod dense;
pub mod far_field;
pub mod geometry;
pub mod helmholtz;
pub mod kernel;
pub mod laplace;
pub mod near_field;
pub mod operator;
pub mod options;
pub mod potential;
pub mod quadrature;
pub mod shapes;
pub mod stokes;
pub mod traits;
pub mod types;
