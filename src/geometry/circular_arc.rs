//! Exact arcs of circles
use crate::traits::Element;
use crate::types::{RealScalar, ReferenceCellType};
use num::Float;

/// The arc of the circle with given centre and radius between two angles.
///
/// The arc is traversed counter-clockwise when `end_angle > start_angle`.
#[derive(Debug, Clone)]
pub struct CircularArc<T: RealScalar> {
    centre: [T; 2],
    radius: T,
    start_angle: T,
    end_angle: T,
}

impl<T: RealScalar> CircularArc<T> {
    /// Create new
    pub fn new(centre: [T; 2], radius: T, start_angle: T, end_angle: T) -> Self {
        Self {
            centre,
            radius,
            start_angle,
            end_angle,
        }
    }

    /// Length of the arc
    pub fn length(&self) -> T {
        Float::abs(self.radius * (self.end_angle - self.start_angle))
    }

    fn angle(&self, t: T) -> T {
        self.start_angle + t * (self.end_angle - self.start_angle)
    }
}

impl<T: RealScalar> Element for CircularArc<T> {
    type T = T;

    fn reference_cell(&self) -> ReferenceCellType {
        ReferenceCellType::Interval
    }

    fn geometry_dim(&self) -> usize {
        2
    }

    fn reference_to_physical(&self, reference: &[T], physical: &mut [T]) {
        let theta = self.angle(reference[0]);
        physical[0] = self.centre[0] + self.radius * Float::cos(theta);
        physical[1] = self.centre[1] + self.radius * Float::sin(theta);
    }

    fn jacobian(&self, reference: &[T], jacobian: &mut [T]) {
        let theta = self.angle(reference[0]);
        let dtheta = self.end_angle - self.start_angle;
        jacobian[0] = -self.radius * dtheta * Float::sin(theta);
        jacobian[1] = self.radius * dtheta * Float::cos(theta);
    }
}
