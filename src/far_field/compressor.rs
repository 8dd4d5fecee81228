//! Far-field representation of the naive Nyström matrix
use std::sync::Arc;

use crate::dense::{mult, mult_add_into};
use crate::far_field::aca::{aca, LowRankBlock};
use crate::far_field::chebyshev::{
    kernel_factor, source_factor, target_factor, ExpansionCache, InterpolationBox,
};
use crate::far_field::direct::DirectEvaluator;
use crate::far_field::partition::{AdmissibilityCondition, Block, BlockPartition};
use crate::far_field::tree::ClusterTree;
use crate::options::{AccuracyFallback, CompressionMethod, CompressionOptions};
use crate::traits::{Element, LayerKernel};
use crate::types::{BieError, RlstArray, Result};
use num::{Float, Zero};
use rayon::prelude::*;
use rlst::{
    empty_array, rlst_dynamic_array2, MultIntoResize, RandomAccessByRef, RandomAccessMut, RlstScalar,
    Shape,
};

/// Storage of a single block
pub enum BlockData<T: RlstScalar> {
    /// All entries
    Dense(RlstArray<T, 2>),
    /// Cross approximation
    LowRank(LowRankBlock<T>),
    /// Chebyshev interpolation `U M V`
    Expansion {
        /// Expansion order
        order: usize,
        /// Target interpolation factor
        target: Arc<RlstArray<T, 2>>,
        /// Kernel values between the interpolation nodes
        kernel: RlstArray<T, 2>,
        /// Source interpolation factor
        source: Arc<RlstArray<T, 2>>,
    },
}

/// A block of the far field
pub struct FarFieldBlock<T: RlstScalar> {
    target_cluster: usize,
    source_cluster: usize,
    data: BlockData<T>,
}

impl<T: RlstScalar> FarFieldBlock<T> {
    /// Node of the target tree
    pub fn target_cluster(&self) -> usize {
        self.target_cluster
    }
    /// Node of the source tree
    pub fn source_cluster(&self) -> usize {
        self.source_cluster
    }
    /// Stored data
    pub fn data(&self) -> &BlockData<T> {
        &self.data
    }

    fn apply(&self, x: &[T], y: &mut [T]) {
        match &self.data {
            BlockData::Dense(a) => mult_add_into(a, x, y),
            BlockData::LowRank(block) => block.apply(x, y),
            BlockData::Expansion {
                target,
                kernel,
                source,
                ..
            } => {
                let a = mult(source, x);
                let b = mult(kernel, &a);
                mult_add_into(target, &b, y);
            }
        }
    }

    fn storage(&self) -> usize {
        match &self.data {
            BlockData::Dense(a) => a.shape()[0] * a.shape()[1],
            BlockData::LowRank(block) => block.storage(),
            BlockData::Expansion { kernel, .. } => kernel.shape()[0] * kernel.shape()[1],
        }
    }
}

struct Compressed<K: LayerKernel> {
    target_tree: ClusterTree<K::Real>,
    source_tree: ClusterTree<K::Real>,
    blocks: Vec<FarFieldBlock<K::T>>,
    factor_storage: usize,
}

/// The far field of an operator.
///
/// With [CompressionMethod::None] nothing is stored and every product is
/// evaluated directly. Otherwise the matrix is split into the blocks of a
/// [BlockPartition]; admissible blocks are compressed and all others are
/// stored dense.
pub struct FarField<K: LayerKernel> {
    method: CompressionMethod,
    components: usize,
    compressed: Option<Compressed<K>>,
    fallbacks: Vec<BieError>,
    admissible_blocks: usize,
}

impl<K: LayerKernel> FarField<K> {
    /// Build the far field of the naive matrix evaluated by `evaluator`
    pub fn build<E: Element<T = K::Real>, F: Element<T = K::Real>>(
        evaluator: &DirectEvaluator<'_, '_, K, E, F>,
        options: &CompressionOptions,
    ) -> Result<Self> {
        options.validate()?;
        let components = evaluator.components();
        let method = options.method();
        if method == CompressionMethod::None {
            log::debug!("Far field is evaluated directly");
            return Ok(Self {
                method,
                components,
                compressed: None,
                fallbacks: vec![],
                admissible_blocks: 0,
            });
        }
        let kernel = evaluator.kernel();
        if method == CompressionMethod::Multipole && !kernel.supports_expansion() {
            return Err(BieError::InvalidOptions(
                "the kernel does not support multipole expansions".to_string(),
            ));
        }

        let targets = evaluator.targets();
        let sources = evaluator.sources();
        let target_tree = ClusterTree::new(targets.dim(), targets.points(), options.leaf_size())?;
        let source_tree = ClusterTree::new(sources.dim(), sources.points(), options.leaf_size())?;
        let condition = match method {
            CompressionMethod::Multipole => AdmissibilityCondition::MaxDiameter,
            _ => AdmissibilityCondition::MinDiameter,
        };
        let eta = num::cast::<f64, K::Real>(options.admissibility()).unwrap();
        let partition = BlockPartition::new(&target_tree, &source_tree, eta, condition);
        log::debug!(
            "Partitioned {} x {} points into {} blocks ({} admissible)",
            targets.len(),
            sources.len(),
            partition.blocks().len(),
            partition.admissible().count()
        );

        let norders =
            (options.max_expansion_order() - options.initial_expansion_order()) / 2 + 1;
        let target_cache = ExpansionCache::new(target_tree.nnodes(), norders);
        let source_cache = ExpansionCache::new(source_tree.nnodes(), norders);

        let builder = BlockBuilder {
            evaluator,
            options,
            target_tree: &target_tree,
            source_tree: &source_tree,
            target_cache: &target_cache,
            source_cache: &source_cache,
        };
        let results = partition
            .blocks()
            .par_iter()
            .map(|block| builder.build(block))
            .collect::<Result<Vec<_>>>()?;

        let mut blocks = Vec::with_capacity(results.len());
        let mut fallbacks = vec![];
        for (block, failure) in results {
            if let Some(e) = failure {
                log::warn!("{e}; storing the block dense");
                fallbacks.push(e);
            }
            blocks.push(block);
        }
        let factor_storage = target_cache.storage() + source_cache.storage();
        Ok(Self {
            method,
            components,
            compressed: Some(Compressed {
                target_tree,
                source_tree,
                blocks,
                factor_storage,
            }),
            fallbacks,
            admissible_blocks: partition.admissible().count(),
        })
    }

    /// Compression method
    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// Stored blocks; empty for direct evaluation
    pub fn blocks(&self) -> &[FarFieldBlock<K::T>] {
        self.compressed
            .as_ref()
            .map(|c| c.blocks.as_slice())
            .unwrap_or(&[])
    }

    /// Number of admissible blocks of the partition
    pub fn admissible_blocks(&self) -> usize {
        self.admissible_blocks
    }

    /// Number of blocks stored dense, including fallbacks
    pub fn dense_blocks(&self) -> usize {
        self.blocks()
            .iter()
            .filter(|b| matches!(b.data, BlockData::Dense(_)))
            .count()
    }

    /// Blocks that missed the tolerance and were stored dense
    pub fn fallbacks(&self) -> &[BieError] {
        &self.fallbacks
    }

    /// Largest rank of a cross approximation or interpolation
    pub fn max_rank(&self) -> usize {
        self.blocks()
            .iter()
            .map(|b| match &b.data {
                BlockData::Dense(_) => 0,
                BlockData::LowRank(block) => block.rank(),
                BlockData::Expansion { kernel, .. } => kernel.shape()[0].min(kernel.shape()[1]),
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of stored scalars
    pub fn storage(&self) -> usize {
        self.compressed
            .as_ref()
            .map(|c| c.factor_storage + c.blocks.iter().map(|b| b.storage()).sum::<usize>())
            .unwrap_or(0)
    }

    /// `y += A x` for the naive matrix `A`
    pub fn apply<E: Element<T = K::Real>, F: Element<T = K::Real>>(
        &self,
        evaluator: &DirectEvaluator<'_, '_, K, E, F>,
        x: &[K::T],
        y: &mut [K::T],
    ) {
        let Some(compressed) = &self.compressed else {
            evaluator.apply(x, y);
            return;
        };
        let c = self.components;
        let products = compressed
            .blocks
            .par_iter()
            .map(|block| {
                let sources = compressed.source_tree.indices(block.source_cluster);
                let targets = compressed.target_tree.indices(block.target_cluster);
                let mut local_x = Vec::with_capacity(sources.len() * c);
                for j in sources {
                    local_x.extend_from_slice(&x[j * c..(j + 1) * c]);
                }
                let mut local_y = vec![K::T::zero(); targets.len() * c];
                block.apply(&local_x, &mut local_y);
                local_y
            })
            .collect::<Vec<_>>();
        // Accumulate in block order
        for (block, local_y) in compressed.blocks.iter().zip(products) {
            let targets = compressed.target_tree.indices(block.target_cluster);
            for (i, values) in targets.iter().zip(local_y.chunks_exact(c)) {
                for (yi, v) in y[i * c..(i + 1) * c].iter_mut().zip(values) {
                    *yi += *v;
                }
            }
        }
    }
}

struct BlockBuilder<'a, 'k, 'q, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> {
    evaluator: &'a DirectEvaluator<'k, 'q, K, E, F>,
    options: &'a CompressionOptions,
    target_tree: &'a ClusterTree<K::Real>,
    source_tree: &'a ClusterTree<K::Real>,
    target_cache: &'a ExpansionCache<K::T>,
    source_cache: &'a ExpansionCache<K::T>,
}

impl<K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> BlockBuilder<'_, '_, '_, K, E, F> {
    fn build(&self, block: &Block) -> Result<(FarFieldBlock<K::T>, Option<BieError>)> {
        let targets = self.target_tree.indices(block.target_cluster);
        let sources = self.source_tree.indices(block.source_cluster);
        let stored = |data| FarFieldBlock {
            target_cluster: block.target_cluster,
            source_cluster: block.source_cluster,
            data,
        };
        if !block.admissible {
            return Ok((
                stored(BlockData::Dense(self.evaluator.dense_block(targets, sources))),
                None,
            ));
        }
        let compressed = match self.options.method() {
            CompressionMethod::Multipole => self.interpolate(block, targets, sources),
            _ => self.cross_approximate(block, targets, sources),
        };
        match compressed {
            Ok(data) => Ok((stored(data), None)),
            Err(e @ BieError::CompressionAccuracyUnmet { .. })
                if self.options.accuracy_fallback() == AccuracyFallback::DirectEvaluation =>
            {
                Ok((
                    stored(BlockData::Dense(self.evaluator.dense_block(targets, sources))),
                    Some(e),
                ))
            }
            Err(e) => Err(e),
        }
    }

    fn tolerance(&self) -> f64 {
        self.options.tolerance().unwrap_or(0.0)
    }

    fn cross_approximate(
        &self,
        block: &Block,
        targets: &[usize],
        sources: &[usize],
    ) -> Result<BlockData<K::T>> {
        let c = self.evaluator.components();
        let (m, n) = (targets.len() * c, sources.len() * c);
        let tolerance = num::cast::<f64, K::Real>(self.tolerance()).unwrap();
        match aca(
            m,
            n,
            |r, values| self.evaluator.row(targets[r / c] * c + r % c, sources, values),
            |s, values| self.evaluator.column(sources[s / c] * c + s % c, targets, values),
            tolerance,
            self.options.max_rank(),
        ) {
            Ok(low_rank) if low_rank.storage() < m * n => Ok(BlockData::LowRank(low_rank)),
            Ok(_) => Ok(BlockData::Dense(self.evaluator.dense_block(targets, sources))),
            Err(achieved) => Err(BieError::CompressionAccuracyUnmet {
                target_cluster: block.target_cluster,
                source_cluster: block.source_cluster,
                tolerance: self.tolerance(),
                achieved: num::cast::<K::Real, f64>(achieved).unwrap_or(f64::NAN),
                budget: self.options.max_rank(),
            }),
        }
    }

    fn interpolate(
        &self,
        block: &Block,
        targets: &[usize],
        sources: &[usize],
    ) -> Result<BlockData<K::T>> {
        let kernel = self.evaluator.kernel();
        let c = self.evaluator.components();
        let (m, n) = (targets.len() * c, sources.len() * c);
        let [rows, cols] = kernel.expansion_shape();
        let target_box = InterpolationBox::new(self.target_tree.node(block.target_cluster).bbox());
        let source_box = InterpolationBox::new(self.source_tree.node(block.source_cluster).bbox());

        let mut achieved = f64::INFINITY;
        let mut order = self.options.initial_expansion_order();
        let mut order_index = 0;
        while order <= self.options.max_expansion_order() {
            let nnodes = target_box.nnodes(order);
            if nnodes * rows * nnodes * cols >= m * n {
                // The expansion would not save storage
                return Ok(BlockData::Dense(self.evaluator.dense_block(targets, sources)));
            }
            let target = self.target_cache.get_or_init(block.target_cluster, order_index, || {
                target_factor(kernel, self.evaluator.targets(), targets, &target_box, order)
            });
            let source = self.source_cache.get_or_init(block.source_cluster, order_index, || {
                source_factor(kernel, self.evaluator.sources(), sources, &source_box, order)
            });
            let kernel_values = kernel_factor(kernel, &target_box, &source_box, order);
            achieved = self.sampled_error(targets, sources, &target, &kernel_values, &source);
            if achieved <= self.tolerance() {
                return Ok(BlockData::Expansion {
                    order,
                    target,
                    kernel: kernel_values,
                    source,
                });
            }
            order += 2;
            order_index += 1;
        }
        Err(BieError::CompressionAccuracyUnmet {
            target_cluster: block.target_cluster,
            source_cluster: block.source_cluster,
            tolerance: self.tolerance(),
            achieved,
            budget: self.options.max_expansion_order(),
        })
    }

    /// Relative error of the interpolated block on a few rows
    fn sampled_error(
        &self,
        targets: &[usize],
        sources: &[usize],
        target: &RlstArray<K::T, 2>,
        kernel: &RlstArray<K::T, 2>,
        source: &RlstArray<K::T, 2>,
    ) -> f64 {
        let c = self.evaluator.components();
        let m = targets.len() * c;
        let n = sources.len() * c;
        let nsamples = m.min(6);
        let rows = (0..nsamples).map(|s| s * m / nsamples).collect::<Vec<_>>();
        let nnodes = target.shape()[1];
        let mut sampled = rlst_dynamic_array2!(K::T, [nsamples, nnodes]);
        for (s, r) in rows.iter().enumerate() {
            for p in 0..nnodes {
                *sampled.get_mut([s, p]).unwrap() = *target.get([*r, p]).unwrap();
            }
        }
        let approx = empty_array::<K::T, 2>().simple_mult_into_resize(
            empty_array::<K::T, 2>().simple_mult_into_resize(sampled.view(), kernel.view()),
            source.view(),
        );

        let mut exact = vec![K::T::zero(); n];
        let mut error = <K::Real as Zero>::zero();
        let mut size = <K::Real as Zero>::zero();
        for (s, r) in rows.iter().enumerate() {
            self.evaluator
                .row(targets[r / c] * c + r % c, sources, &mut exact);
            for (j, e) in exact.iter().enumerate() {
                error += (*approx.get([s, j]).unwrap() - *e).square();
                size += e.square();
            }
        }
        let error = Float::sqrt(error);
        let size = Float::sqrt(size);
        let relative = if size > <K::Real as Zero>::zero() {
            error / size
        } else {
            error
        };
        num::cast::<K::Real, f64>(relative).unwrap_or(f64::INFINITY)
    }
}
