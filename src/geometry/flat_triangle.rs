//! Flat triangles in 3D
use crate::traits::Element;
use crate::types::{RealScalar, ReferenceCellType};

/// A flat triangle.
///
/// The reference vertices (0, 0), (1, 0) and (0, 1) are mapped to the three
/// vertices in order; the normal follows the right hand rule.
#[derive(Debug, Clone)]
pub struct FlatTriangle<T: RealScalar> {
    vertices: [[T; 3]; 3],
}

impl<T: RealScalar> FlatTriangle<T> {
    /// Create new
    pub fn new(vertices: [[T; 3]; 3]) -> Self {
        Self { vertices }
    }

    /// The vertices
    pub fn vertices(&self) -> &[[T; 3]; 3] {
        &self.vertices
    }
}

impl<T: RealScalar> Element for FlatTriangle<T> {
    type T = T;

    fn reference_cell(&self) -> ReferenceCellType {
        ReferenceCellType::Triangle
    }

    fn geometry_dim(&self) -> usize {
        3
    }

    fn reference_to_physical(&self, reference: &[T], physical: &mut [T]) {
        let [v0, v1, v2] = &self.vertices;
        for i in 0..3 {
            physical[i] = v0[i] + reference[0] * (v1[i] - v0[i]) + reference[1] * (v2[i] - v0[i]);
        }
    }

    fn jacobian(&self, _reference: &[T], jacobian: &mut [T]) {
        let [v0, v1, v2] = &self.vertices;
        for i in 0..3 {
            jacobian[i] = v1[i] - v0[i];
            jacobian[3 + i] = v2[i] - v0[i];
        }
    }
}
