//! Block partition of a pair of cluster trees
use crate::far_field::tree::ClusterTree;
use crate::types::RealScalar;

/// Admissibility condition for a pair of clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissibilityCondition {
    /// `min(diam t, diam s) <= eta dist(t, s)`
    MinDiameter,
    /// `max(diam t, diam s) <= eta dist(t, s)`
    MaxDiameter,
}

/// A block of the matrix: all target points of one cluster and all source points of another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Node of the target tree
    pub target_cluster: usize,
    /// Node of the source tree
    pub source_cluster: usize,
    /// Is the block admissible for compression?
    pub admissible: bool,
}

/// A partition of the matrix into admissible and dense blocks
#[derive(Debug, Clone)]
pub struct BlockPartition {
    blocks: Vec<Block>,
}

impl BlockPartition {
    /// Partition by a dual traversal of the two trees
    pub fn new<T: RealScalar>(
        targets: &ClusterTree<T>,
        sources: &ClusterTree<T>,
        eta: T,
        condition: AdmissibilityCondition,
    ) -> Self {
        let mut blocks = vec![];
        let mut stack = vec![(targets.root(), sources.root())];
        while let Some((t, s)) = stack.pop() {
            let tnode = targets.node(t);
            let snode = sources.node(s);
            let dist = tnode.bbox().distance(snode.bbox());
            let (dt, ds) = (tnode.diameter(), snode.diameter());
            let diam = match condition {
                AdmissibilityCondition::MinDiameter => num::Float::min(dt, ds),
                AdmissibilityCondition::MaxDiameter => num::Float::max(dt, ds),
            };
            if dist > T::zero() && diam <= eta * dist {
                blocks.push(Block {
                    target_cluster: t,
                    source_cluster: s,
                    admissible: true,
                });
                continue;
            }
            match (tnode.children(), snode.children()) {
                (None, None) => blocks.push(Block {
                    target_cluster: t,
                    source_cluster: s,
                    admissible: false,
                }),
                (Some(tc), None) => stack.extend(tc.iter().map(|c| (*c, s))),
                (None, Some(sc)) => stack.extend(sc.iter().map(|c| (t, *c))),
                (Some(tc), Some(sc)) => {
                    for a in tc {
                        for b in sc {
                            stack.push((a, b));
                        }
                    }
                }
            }
        }
        // Order blocks for reproducible traversal
        blocks.sort_by_key(|b| (b.target_cluster, b.source_cluster));
        Self { blocks }
    }

    /// All blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Admissible blocks
    pub fn admissible(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.admissible)
    }

    /// Blocks that are stored dense
    pub fn inadmissible(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.admissible)
    }
}
