//! Definition of various test shapes.

use std::collections::{hash_map::Entry::Vacant, HashMap};

use crate::geometry::{CircularArc, FlatTriangle, Segment};
use crate::types::RealScalar;
use num::{traits::FloatConst, Float};

/// Create a circle from exact arcs
///
/// The circle with given `radius` around the origin is split into `nelements`
/// arcs of equal length, traversed counter-clockwise.
pub fn circle<T: RealScalar + FloatConst>(nelements: usize, radius: T) -> Vec<CircularArc<T>> {
    let zero = T::zero();
    let step = T::TAU() / num::cast::<usize, T>(nelements).unwrap();
    (0..nelements)
        .map(|i| {
            let a0 = step * num::cast::<usize, T>(i).unwrap();
            CircularArc::new([zero, zero], radius, a0, a0 + step)
        })
        .collect()
}

/// Create an ellipse as a polygon
///
/// The vertices are placed at equally spaced parameter values on the ellipse
/// with semi-axes `a` and `b`. With `a == b` this is a regular polygon
/// inscribed in a circle.
pub fn ellipse<T: RealScalar + FloatConst>(nelements: usize, a: T, b: T) -> Vec<Segment<T>> {
    let step = T::TAU() / num::cast::<usize, T>(nelements).unwrap();
    let vertex = |i: usize| {
        let t = step * num::cast::<usize, T>(i % nelements).unwrap();
        [a * Float::cos(t), b * Float::sin(t)]
    };
    (0..nelements)
        .map(|i| Segment::new(vertex(i), vertex(i + 1)))
        .collect()
}

/// Create a regular sphere
///
/// A regular sphere is created by starting with a regular octahedron. The shape is then refined `refinement_level` times.
/// Each time the grid is refined, each triangle is split into four triangles (by adding lines connecting the midpoints of
/// each edge). The new points are then scaled so that they are a distance of 1 from the origin.
pub fn regular_sphere<T: RealScalar>(refinement_level: u32) -> Vec<FlatTriangle<T>> {
    let zero = T::zero();
    let one = T::one();
    let half = num::cast::<f64, T>(0.5).unwrap();

    let mut points = Vec::<[T; 3]>::with_capacity(2 + usize::pow(4, refinement_level + 1));
    points.push([zero, zero, one]);
    points.push([one, zero, zero]);
    points.push([zero, one, zero]);
    points.push([-one, zero, zero]);
    points.push([zero, -one, zero]);
    points.push([zero, zero, -one]);

    let mut cells = vec![
        [0, 1, 2],
        [0, 2, 3],
        [0, 3, 4],
        [0, 4, 1],
        [5, 2, 1],
        [5, 3, 2],
        [5, 4, 3],
        [5, 1, 4],
    ];

    for level in 0..refinement_level {
        let mut edge_points = HashMap::new();
        let mut new_cells = Vec::with_capacity(8 * usize::pow(4, level + 1));
        for c in &cells {
            let edges = [[1, 2], [0, 2], [0, 1]]
                .iter()
                .map(|[i, j]| {
                    let mut pt_i = c[*i];
                    let mut pt_j = c[*j];
                    if pt_i > pt_j {
                        std::mem::swap(&mut pt_i, &mut pt_j);
                    }
                    if let Vacant(e) = edge_points.entry((pt_i, pt_j)) {
                        let v_i = points[pt_i];
                        let v_j = points[pt_j];
                        let mut new_pt = [
                            half * (v_i[0] + v_j[0]),
                            half * (v_i[1] + v_j[1]),
                            half * (v_i[2] + v_j[2]),
                        ];
                        let size = Float::sqrt(new_pt.iter().fold(zero, |acc, x| acc + *x * *x));
                        for i in new_pt.iter_mut() {
                            *i = *i / size;
                        }
                        e.insert(points.len());
                        points.push(new_pt);
                    }
                    edge_points[&(pt_i, pt_j)]
                })
                .collect::<Vec<_>>();
            new_cells.push([c[0], edges[2], edges[1]]);
            new_cells.push([c[1], edges[0], edges[2]]);
            new_cells.push([c[2], edges[1], edges[0]]);
            new_cells.push([edges[0], edges[1], edges[2]]);
        }
        cells = new_cells;
    }

    cells
        .iter()
        .map(|c| FlatTriangle::new([points[c[0]], points[c[1]], points[c[2]]]))
        .collect()
}

/// Create a square screen with triangle cells
///
/// Create a grid of the square \[0,1\]^2 in the plane z = 0 with triangle cells. The input ncells is the number of cells
/// along each side of the square.
pub fn screen<T: RealScalar>(ncells: usize) -> Vec<FlatTriangle<T>> {
    let zero = T::zero();
    let n = num::cast::<usize, T>(ncells).unwrap();
    let point = |x: usize, y: usize| {
        [
            num::cast::<usize, T>(x).unwrap() / n,
            num::cast::<usize, T>(y).unwrap() / n,
            zero,
        ]
    };
    let mut cells = Vec::with_capacity(2 * ncells * ncells);
    for y in 0..ncells {
        for x in 0..ncells {
            cells.push(FlatTriangle::new([
                point(x, y),
                point(x + 1, y),
                point(x + 1, y + 1),
            ]));
            cells.push(FlatTriangle::new([
                point(x, y),
                point(x + 1, y + 1),
                point(x, y + 1),
            ]));
        }
    }
    cells
}
