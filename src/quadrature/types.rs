//! Type definitions.

/// Family of a reference quadrature rule.
///
/// The family decides how densities are interpolated between the points of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    /// Gauss-Legendre points on the interval
    GaussLegendre,
    /// Tabulated symmetric rules on the triangle
    Symmetric,
    /// Tensor Gauss rule on the square collapsed onto the triangle, with the
    /// given number of points in each direction
    CollapsedGauss(usize),
    /// Rules that are not used to interpolate
    Transformed,
}

/// Definition of a numerical quadrature rule.
#[derive(Debug, Clone)]
pub struct NumericalQuadratureDefinition {
    /// The dimension d of a single point.
    pub dim: usize,

    /// The order of the quadrature rule.
    pub order: usize,

    /// The number of points of the quadrature rule.
    pub npoints: usize,

    /// The family the rule belongs to.
    pub family: RuleFamily,

    /// The weights of the quadrature rule.
    pub weights: Vec<f64>,
    /// The point coordinates of the quadrature rule.
    ///
    /// A single point has the coordinates p_1, p_2, ..., p_d,
    /// with d being the dimension of the point (typically, 1, 2, or 3).
    /// The vector points stores all points in consecutive order.
    /// Hence, the first point starts at position zero, the second point at
    /// position d, and the third point at position 2d.
    pub points: Vec<f64>,
}
