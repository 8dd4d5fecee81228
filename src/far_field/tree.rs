//! Binary cluster tree over a point set
use crate::types::{BieError, RealScalar, Result};
use num::Float;

/// Axis-aligned bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox<T: RealScalar> {
    min: Vec<T>,
    max: Vec<T>,
}

impl<T: RealScalar> BoundingBox<T> {
    /// Bounding box of the points with the given indices
    fn from_indices(dim: usize, points: &[T], indices: &[usize]) -> Self {
        let mut min = vec![<T as Float>::infinity(); dim];
        let mut max = vec![<T as Float>::neg_infinity(); dim];
        for i in indices {
            for (d, x) in points[dim * i..dim * (i + 1)].iter().enumerate() {
                min[d] = Float::min(min[d], *x);
                max[d] = Float::max(max[d], *x);
            }
        }
        Self { min, max }
    }

    /// Lower corner
    pub fn min(&self) -> &[T] {
        &self.min
    }

    /// Upper corner
    pub fn max(&self) -> &[T] {
        &self.max
    }

    /// Centre of the box
    pub fn centre(&self) -> Vec<T> {
        let half = num::cast::<f64, T>(0.5).unwrap();
        self.min
            .iter()
            .zip(&self.max)
            .map(|(a, b)| half * (*a + *b))
            .collect()
    }

    /// Length of the diagonal
    pub fn diameter(&self) -> T {
        Float::sqrt(
            self.min
                .iter()
                .zip(&self.max)
                .fold(T::zero(), |acc, (a, b)| acc + (*b - *a) * (*b - *a)),
        )
    }

    /// Distance between two boxes, zero if they overlap
    pub fn distance(&self, other: &Self) -> T {
        let mut dist = T::zero();
        for d in 0..self.min.len() {
            let gap = Float::max(
                Float::max(other.min[d] - self.max[d], self.min[d] - other.max[d]),
                T::zero(),
            );
            dist = dist + gap * gap;
        }
        Float::sqrt(dist)
    }

    /// Distance from a point to the box, zero if the point is inside
    pub fn distance_to_point(&self, point: &[T]) -> T {
        let mut dist = T::zero();
        for (d, x) in point.iter().enumerate() {
            let gap = Float::max(
                Float::max(self.min[d] - *x, *x - self.max[d]),
                T::zero(),
            );
            dist = dist + gap * gap;
        }
        Float::sqrt(dist)
    }

    fn longest_axis(&self) -> (usize, T) {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(a, b)| *b - *a)
            .enumerate()
            .fold((0, <T as Float>::neg_infinity()), |best, (d, w)| {
                if w > best.1 {
                    (d, w)
                } else {
                    best
                }
            })
    }
}

/// A node of a cluster tree
#[derive(Debug, Clone)]
pub struct ClusterNode<T: RealScalar> {
    bbox: BoundingBox<T>,
    start: usize,
    end: usize,
    children: Option<[usize; 2]>,
    level: usize,
    parent: Option<usize>,
}

impl<T: RealScalar> ClusterNode<T> {
    /// Bounding box of the points in the node
    pub fn bbox(&self) -> &BoundingBox<T> {
        &self.bbox
    }
    /// Number of points in the node
    pub fn npoints(&self) -> usize {
        self.end - self.start
    }
    /// Children of the node
    pub fn children(&self) -> Option<[usize; 2]> {
        self.children
    }
    /// Is the node a leaf?
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
    /// Level of the node; the root is on level 0
    pub fn level(&self) -> usize {
        self.level
    }
    /// Parent of the node
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
    /// Diameter of the bounding box
    pub fn diameter(&self) -> T {
        self.bbox.diameter()
    }
}

/// A binary cluster tree.
///
/// Nodes are stored in an arena; the root is node 0. Every node owns a
/// contiguous range of a permutation of the point indices. A node is split
/// at the midpoint of the longest side of its bounding box, or at the median
/// if the midpoint leaves one side empty, until it holds at most `leaf_size`
/// points.
#[derive(Debug, Clone)]
pub struct ClusterTree<T: RealScalar> {
    dim: usize,
    points: Vec<T>,
    permutation: Vec<usize>,
    nodes: Vec<ClusterNode<T>>,
    leaf_size: usize,
}

impl<T: RealScalar> ClusterTree<T> {
    /// Build a tree over points stored point by point
    pub fn new(dim: usize, points: &[T], leaf_size: usize) -> Result<Self> {
        if points.is_empty() {
            return Err(BieError::EmptyQuadrature);
        }
        if dim == 0 || points.len() % dim != 0 {
            return Err(BieError::DimensionMismatch {
                expected: dim * (points.len() / dim.max(1) + 1),
                actual: points.len(),
                context: "cluster tree points",
            });
        }
        if leaf_size == 0 {
            return Err(BieError::InvalidOptions(
                "leaf size must be positive".to_string(),
            ));
        }
        let npoints = points.len() / dim;
        let mut permutation = (0..npoints).collect::<Vec<_>>();
        let mut nodes = vec![ClusterNode {
            bbox: BoundingBox::from_indices(dim, points, &permutation),
            start: 0,
            end: npoints,
            children: None,
            level: 0,
            parent: None,
        }];

        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let (start, end, level) = {
                let node = &nodes[index];
                (node.start, node.end, node.level)
            };
            if end - start <= leaf_size {
                continue;
            }
            let (axis, width) = nodes[index].bbox.longest_axis();
            if width <= T::zero() {
                // All points coincide
                continue;
            }
            let coordinate = |i: &usize| points[dim * i + axis];
            let mid = nodes[index].bbox.min[axis] + width / (T::one() + T::one());
            let slice = &mut permutation[start..end];
            let mut split = partition(slice, |i| coordinate(i) < mid);
            if split == 0 || split == slice.len() {
                split = slice.len() / 2;
                slice.select_nth_unstable_by(split, |a, b| {
                    coordinate(a)
                        .partial_cmp(&coordinate(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }

            let mut children = [0; 2];
            for (c, (s, e)) in [(start, start + split), (start + split, end)]
                .into_iter()
                .enumerate()
            {
                children[c] = nodes.len();
                nodes.push(ClusterNode {
                    bbox: BoundingBox::from_indices(dim, points, &permutation[s..e]),
                    start: s,
                    end: e,
                    children: None,
                    level: level + 1,
                    parent: Some(index),
                });
                stack.push(children[c]);
            }
            nodes[index].children = Some(children);
        }

        Ok(Self {
            dim,
            points: points.to_vec(),
            permutation,
            nodes,
            leaf_size,
        })
    }

    /// Dimension of the points
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points
    pub fn npoints(&self) -> usize {
        self.permutation.len()
    }

    /// Maximum number of points in a leaf
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Index of the root node
    pub fn root(&self) -> usize {
        0
    }

    /// All nodes
    pub fn nodes(&self) -> &[ClusterNode<T>] {
        &self.nodes
    }

    /// A node
    pub fn node(&self, index: usize) -> &ClusterNode<T> {
        &self.nodes[index]
    }

    /// Number of nodes
    pub fn nnodes(&self) -> usize {
        self.nodes.len()
    }

    /// Indices of the points in a node
    pub fn indices(&self, node: usize) -> &[usize] {
        let n = &self.nodes[node];
        &self.permutation[n.start..n.end]
    }

    /// Coordinates of a point
    pub fn point(&self, index: usize) -> &[T] {
        &self.points[self.dim * index..self.dim * (index + 1)]
    }

    /// Indices of the leaves
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|i| self.nodes[*i].is_leaf())
            .collect()
    }

    /// Number of levels
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.level).max().unwrap_or(0) + 1
    }

    /// Indices of all points closer than `radius` to `centre`, in increasing order
    pub fn ball_query(&self, centre: &[T], radius: T) -> Vec<usize> {
        let mut found = vec![];
        let mut stack = vec![self.root()];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.bbox.distance_to_point(centre) >= radius {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => {
                    for i in self.indices(index) {
                        if distance(self.point(*i), centre) < radius {
                            found.push(*i);
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// The point closest to `point` and its distance
    pub fn nearest(&self, point: &[T]) -> (usize, T) {
        let mut best = (0, <T as Float>::infinity());
        let mut stack = vec![self.root()];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.bbox.distance_to_point(point) >= best.1 {
                continue;
            }
            match node.children {
                Some([a, b]) => {
                    // Visit the closer child first
                    let da = self.nodes[a].bbox.distance_to_point(point);
                    let db = self.nodes[b].bbox.distance_to_point(point);
                    if da <= db {
                        stack.push(b);
                        stack.push(a);
                    } else {
                        stack.push(a);
                        stack.push(b);
                    }
                }
                None => {
                    for i in self.indices(index) {
                        let d = distance(self.point(*i), point);
                        if d < best.1 || (d == best.1 && *i < best.0) {
                            best = (*i, d);
                        }
                    }
                }
            }
        }
        best
    }
}

fn distance<T: RealScalar>(a: &[T], b: &[T]) -> T {
    crate::geometry::distance(a, b)
}

/// Reorder a slice so that all entries satisfying `pred` come first; returns their number
fn partition(slice: &mut [usize], pred: impl Fn(&usize) -> bool) -> usize {
    let mut first = 0;
    for i in 0..slice.len() {
        if pred(&slice[i]) {
            slice.swap(first, i);
            first += 1;
        }
    }
    first
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;

    fn random_points(npoints: usize, dim: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(0);
        (0..npoints * dim).map(|_| rng.gen::<f64>()).collect()
    }

    #[test]
    fn test_leaves_partition_points() {
        let points = random_points(1000, 3);
        let tree = ClusterTree::new(3, &points, 20).unwrap();
        let mut all = tree
            .leaves()
            .iter()
            .flat_map(|l| tree.indices(*l).to_vec())
            .collect::<Vec<_>>();
        all.sort();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
        for l in tree.leaves() {
            assert!(tree.node(l).npoints() <= 20);
            for i in tree.indices(l) {
                assert_eq!(tree.node(l).bbox().distance_to_point(tree.point(*i)), 0.0);
            }
        }
    }

    #[test]
    fn test_coincident_points() {
        let points = vec![0.5; 2 * 50];
        let tree = ClusterTree::new(2, &points, 4).unwrap();
        assert_eq!(tree.nnodes(), 1);
        assert_eq!(tree.indices(0).len(), 50);
    }

    #[test]
    fn test_queries_match_brute_force() {
        let points = random_points(500, 2);
        let tree = ClusterTree::new(2, &points, 8).unwrap();
        let query = [0.3, 0.6];

        let expected = (0..500)
            .filter(|i| distance(&points[2 * i..2 * i + 2], &query) < 0.1)
            .collect::<Vec<_>>();
        assert_eq!(tree.ball_query(&query, 0.1), expected);

        let nearest = (0..500)
            .min_by(|a, b| {
                distance(&points[2 * a..2 * a + 2], &query)
                    .total_cmp(&distance(&points[2 * b..2 * b + 2], &query))
            })
            .unwrap();
        assert_eq!(tree.nearest(&query).0, nearest);
    }

    #[test]
    fn test_box_distance() {
        let points = vec![0.0, 0.0, 1.0, 1.0, 3.0, 0.0, 4.0, 1.0];
        let a = BoundingBox::from_indices(2, &points, &[0, 1]);
        let b = BoundingBox::from_indices(2, &points, &[2, 3]);
        assert_eq!(a.distance(&b), 2.0);
        assert_eq!(a.distance(&a), 0.0);
        assert_eq!(a.centre(), vec![0.5, 0.5]);
    }
}
