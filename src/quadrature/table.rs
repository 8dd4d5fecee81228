//! The quadrature table: points, normals and weights on a boundary
use std::ops::Range;

use crate::geometry::{bounding_ball, normal_from_jacobian};
use crate::quadrature::simplex_rules::simplex_rule;
use crate::quadrature::types::NumericalQuadratureDefinition;
use crate::traits::Element;
use crate::types::{BieError, RealScalar, Result};
use num::{Float, One, Zero};
use rayon::prelude::*;

/// A single quadrature point
#[derive(Debug, Clone, Copy)]
pub struct QuadraturePoint<'b, T: RealScalar> {
    /// Global index of the point
    pub index: usize,
    /// Coordinates
    pub coordinates: &'b [T],
    /// Unit normal (zero for point clouds without normals)
    pub normal: &'b [T],
    /// Weight, including the integration element
    pub weight: T,
    /// Owning element
    pub element: Option<usize>,
}

/// Quadrature points on a collection of boundary elements.
///
/// Points are stored element by element in the order of the elements; the
/// index of a point is the index of the matching matrix row or column.
/// Coordinates and normals are stored point by point.
pub struct Quadrature<'a, E: Element> {
    elements: &'a [E],
    dim: usize,
    rule: Option<NumericalQuadratureDefinition>,
    points: Vec<E::T>,
    normals: Vec<E::T>,
    weights: Vec<E::T>,
    owners: Vec<usize>,
    reference_points: Vec<E::T>,
    element_offsets: Vec<usize>,
    measures: Vec<E::T>,
    sizes: Vec<E::T>,
    centres: Vec<E::T>,
    radii: Vec<E::T>,
}

struct ElementData<T> {
    points: Vec<T>,
    normals: Vec<T>,
    weights: Vec<T>,
    measure: T,
    centre: Vec<T>,
    radius: T,
}

impl<'a, E: Element> Quadrature<'a, E> {
    /// Create the quadrature of a boundary using a reference rule with `npoints` points per element.
    pub fn from_elements(elements: &'a [E], npoints: usize) -> Result<Self> {
        let first = elements.first().ok_or(BieError::EmptyQuadrature)?;
        let cell = first.reference_cell();
        let gdim = first.geometry_dim();
        if cell.dim() + 1 != gdim {
            return Err(BieError::UnsupportedElement(format!(
                "elements of dimension {} in {gdim}D space",
                cell.dim()
            )));
        }
        if let Some(e) = elements
            .iter()
            .position(|e| e.reference_cell() != cell || e.geometry_dim() != gdim)
        {
            return Err(BieError::UnsupportedElement(format!(
                "element {e} differs from the first element"
            )));
        }

        let rule = simplex_rule(cell, npoints)?;
        let tdim = cell.dim();
        let reference_points = rule
            .points
            .iter()
            .map(|p| num::cast::<f64, E::T>(*p).unwrap())
            .collect::<Vec<_>>();
        let reference_weights = rule
            .weights
            .iter()
            .map(|w| num::cast::<f64, E::T>(*w).unwrap())
            .collect::<Vec<_>>();

        let data = elements
            .par_iter()
            .enumerate()
            .map(|(index, element)| {
                let mut points = vec![E::T::zero(); gdim * npoints];
                let mut normals = vec![E::T::zero(); gdim * npoints];
                let mut weights = vec![E::T::zero(); npoints];
                let mut jac = vec![E::T::zero(); gdim * tdim];
                for (((r, w), (p, n)), weight) in reference_points
                    .chunks_exact(tdim)
                    .zip(&reference_weights)
                    .zip(points.chunks_exact_mut(gdim).zip(normals.chunks_exact_mut(gdim)))
                    .zip(weights.iter_mut())
                {
                    element.reference_to_physical(r, p);
                    element.jacobian(r, &mut jac);
                    let jdet = normal_from_jacobian(gdim, tdim, &jac, n);
                    *weight = *w * jdet;
                }
                let measure = weights.iter().fold(E::T::zero(), |acc, w| acc + *w);
                if !(measure > E::T::zero()) || !Float::is_finite(measure) {
                    return Err(BieError::DegenerateElement {
                        element: index,
                        measure: num::cast::<E::T, f64>(measure).unwrap_or(f64::NAN),
                    });
                }
                let (centre, radius) = bounding_ball(element);
                Ok(ElementData {
                    points,
                    normals,
                    weights,
                    measure,
                    centre,
                    radius,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let nelements = elements.len();
        let npts = nelements * npoints;
        let mut quadrature = Self {
            elements,
            dim: gdim,
            rule: None,
            points: Vec::with_capacity(gdim * npts),
            normals: Vec::with_capacity(gdim * npts),
            weights: Vec::with_capacity(npts),
            owners: Vec::with_capacity(npts),
            reference_points: Vec::with_capacity(tdim * npts),
            element_offsets: (0..=nelements).map(|e| e * npoints).collect(),
            measures: Vec::with_capacity(nelements),
            sizes: Vec::with_capacity(nelements),
            centres: Vec::with_capacity(gdim * nelements),
            radii: Vec::with_capacity(nelements),
        };
        let two = E::T::one() + E::T::one();
        for (index, d) in data.into_iter().enumerate() {
            quadrature.points.extend(d.points);
            quadrature.normals.extend(d.normals);
            quadrature.weights.extend(d.weights);
            quadrature.owners.extend(std::iter::repeat(index).take(npoints));
            quadrature.reference_points.extend(&reference_points);
            quadrature.measures.push(d.measure);
            quadrature.sizes.push(two * d.radius);
            quadrature.centres.extend(d.centre);
            quadrature.radii.push(d.radius);
        }
        quadrature.rule = Some(rule);

        log::debug!(
            "Created quadrature with {} points on {} elements",
            quadrature.len(),
            nelements
        );
        Ok(quadrature)
    }

    /// Create a point cloud without elements.
    ///
    /// All weights are one and all normals are zero.
    pub fn from_points(dim: usize, points: &[E::T]) -> Result<Self> {
        let normals = vec![E::T::zero(); points.len()];
        Self::from_points_with_normals(dim, points, &normals)
    }

    /// Create a point cloud without elements but with given normals.
    pub fn from_points_with_normals(dim: usize, points: &[E::T], normals: &[E::T]) -> Result<Self> {
        if points.is_empty() {
            return Err(BieError::EmptyQuadrature);
        }
        if points.len() % dim != 0 {
            return Err(BieError::DimensionMismatch {
                expected: dim * (points.len() / dim + 1),
                actual: points.len(),
                context: "point coordinates",
            });
        }
        if normals.len() != points.len() {
            return Err(BieError::DimensionMismatch {
                expected: points.len(),
                actual: normals.len(),
                context: "point normals",
            });
        }
        Ok(Self {
            elements: &[],
            dim,
            rule: None,
            points: points.to_vec(),
            normals: normals.to_vec(),
            weights: vec![E::T::one(); points.len() / dim],
            owners: vec![],
            reference_points: vec![],
            element_offsets: vec![0],
            measures: vec![],
            sizes: vec![],
            centres: vec![],
            radii: vec![],
        })
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Is the quadrature empty?
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Dimension of the space the points live in
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Does the quadrature come from elements?
    pub fn has_elements(&self) -> bool {
        !self.elements.is_empty()
    }

    /// The elements
    pub fn elements(&self) -> &'a [E] {
        self.elements
    }

    /// Number of elements
    pub fn nelements(&self) -> usize {
        self.elements.len()
    }

    /// The reference rule used on every element
    pub fn rule(&self) -> Option<&NumericalQuadratureDefinition> {
        self.rule.as_ref()
    }

    /// All coordinates
    pub fn points(&self) -> &[E::T] {
        &self.points
    }

    /// All normals
    pub fn normals(&self) -> &[E::T] {
        &self.normals
    }

    /// All weights
    pub fn weights(&self) -> &[E::T] {
        &self.weights
    }

    /// Coordinates of a point
    pub fn point(&self, index: usize) -> &[E::T] {
        &self.points[self.dim * index..self.dim * (index + 1)]
    }

    /// Normal at a point
    pub fn normal(&self, index: usize) -> &[E::T] {
        &self.normals[self.dim * index..self.dim * (index + 1)]
    }

    /// Weight of a point
    pub fn weight(&self, index: usize) -> E::T {
        self.weights[index]
    }

    /// Element owning a point
    pub fn element(&self, index: usize) -> Option<usize> {
        self.owners.get(index).copied()
    }

    /// Reference coordinates of a point in its element
    pub fn reference_point(&self, index: usize) -> &[E::T] {
        let tdim = self.dim - 1;
        &self.reference_points[tdim * index..tdim * (index + 1)]
    }

    /// Indices of the points of an element
    pub fn element_points(&self, element: usize) -> Range<usize> {
        self.element_offsets[element]..self.element_offsets[element + 1]
    }

    /// Measure (length or area) of an element
    pub fn element_measure(&self, element: usize) -> E::T {
        self.measures[element]
    }

    /// Size (diameter estimate) of an element
    pub fn element_size(&self, element: usize) -> E::T {
        self.sizes[element]
    }

    /// Centre of a ball containing an element
    pub fn element_centre(&self, element: usize) -> &[E::T] {
        &self.centres[self.dim * element..self.dim * (element + 1)]
    }

    /// All element centres
    pub fn element_centres(&self) -> &[E::T] {
        &self.centres
    }

    /// Radius of a ball containing an element
    pub fn element_radius(&self, element: usize) -> E::T {
        self.radii[element]
    }

    /// Largest element size
    pub fn max_element_size(&self) -> E::T {
        self.sizes.iter().fold(E::T::zero(), |a, b| Float::max(a, *b))
    }

    /// Sum of all weights
    pub fn total_weight(&self) -> E::T {
        self.weights.iter().fold(E::T::zero(), |acc, w| acc + *w)
    }

    /// Iterate over the points
    pub fn iter(&self) -> impl Iterator<Item = QuadraturePoint<'_, E::T>> + '_ {
        (0..self.len()).map(move |index| QuadraturePoint {
            index,
            coordinates: self.point(index),
            normal: self.normal(index),
            weight: self.weight(index),
            element: self.element(index),
        })
    }
}

/// Are the two quadratures the same object?
pub(crate) fn same_quadrature<E: Element, F: Element>(
    targets: &Quadrature<'_, F>,
    sources: &Quadrature<'_, E>,
) -> bool {
    std::ptr::addr_of!(*targets) as usize == std::ptr::addr_of!(*sources) as usize
}
