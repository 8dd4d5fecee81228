//! Far-field compression
//!
//! Points are clustered in binary trees, the matrix is partitioned into
//! blocks of cluster pairs and blocks of well separated clusters are
//! compressed by cross approximation or kernel interpolation.
pub mod aca;
pub mod chebyshev;
pub mod compressor;
pub mod direct;
pub mod partition;
pub mod tree;

pub use compressor::FarField;
pub use direct::DirectEvaluator;
pub use tree::ClusterTree;
