//! Straight line segments in 2D
use crate::traits::Element;
use crate::types::{RealScalar, ReferenceCellType};

/// A straight segment from `start` to `end`
#[derive(Debug, Clone)]
pub struct Segment<T: RealScalar> {
    start: [T; 2],
    end: [T; 2],
}

impl<T: RealScalar> Segment<T> {
    /// Create new
    pub fn new(start: [T; 2], end: [T; 2]) -> Self {
        Self { start, end }
    }

    /// Start point
    pub fn start(&self) -> &[T; 2] {
        &self.start
    }

    /// End point
    pub fn end(&self) -> &[T; 2] {
        &self.end
    }
}

impl<T: RealScalar> Element for Segment<T> {
    type T = T;

    fn reference_cell(&self) -> ReferenceCellType {
        ReferenceCellType::Interval
    }

    fn geometry_dim(&self) -> usize {
        2
    }

    fn reference_to_physical(&self, reference: &[T], physical: &mut [T]) {
        let t = reference[0];
        for i in 0..2 {
            physical[i] = self.start[i] + t * (self.end[i] - self.start[i]);
        }
    }

    fn jacobian(&self, _reference: &[T], jacobian: &mut [T]) {
        for i in 0..2 {
            jacobian[i] = self.end[i] - self.start[i];
        }
    }
}
