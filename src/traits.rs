//! Trait definitions

mod element;
mod kernel;
mod operator;

pub use element::Element;
pub use kernel::{Kernel, LayerKernel};
pub use operator::LinearOperator;
