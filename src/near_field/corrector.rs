//! Sparse corrections of the naive Nyström matrix
use crate::far_field::{ClusterTree, DirectEvaluator, FarField};
use crate::geometry::{closest_point, distance};
use crate::near_field::adaptive::integrate_adaptively;
use crate::near_field::interpolation::NodalInterpolant;
use crate::near_field::singular::{start_level, ElementIntegrator};
use crate::options::{CorrectionMethod, CorrectionOptions};
use crate::quadrature::duffy::GRADING;
use crate::quadrature::same_quadrature;
use crate::traits::{Element, LayerKernel};
use crate::types::{BieError, Result};
use num::{One, Zero};
use rayon::prelude::*;
use rlst::RlstScalar;

/// Distance below which a target counts as lying on an element, relative to the element size
const ON_ELEMENT_RATIO: f64 = 1e-10;

/// An entry of the matrix whose naive value is replaced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionEntry<T: RlstScalar> {
    /// Row of the entry
    pub row: usize,
    /// Column of the entry
    pub col: usize,
    /// Accurate value
    pub corrected: T,
    /// Naive value that is replaced
    pub naive: T,
}

/// Where a target lies relative to a source element
enum Proximity {
    On(Vec<f64>),
    Near { point: Vec<f64>, distance: f64 },
}

/// The near-field overlay of an operator.
///
/// Entries are grouped by target point: the entries of target point `i`
/// cover rows `i * c .. (i + 1) * c`. For every entry the naive value is
/// stored next to the corrected one, so the overlay can be added to any
/// representation of the naive matrix.
pub struct NearFieldCorrection<T: RlstScalar> {
    method: CorrectionMethod,
    components: usize,
    entries: Vec<CorrectionEntry<T>>,
    offsets: Vec<usize>,
}

impl<T: RlstScalar> NearFieldCorrection<T> {
    fn from_targets(method: CorrectionMethod, components: usize, per_target: Vec<Vec<CorrectionEntry<T>>>) -> Self {
        let mut offsets = Vec::with_capacity(per_target.len() + 1);
        offsets.push(0);
        let mut entries = Vec::with_capacity(per_target.iter().map(|e| e.len()).sum());
        for target_entries in per_target {
            entries.extend(target_entries);
            offsets.push(entries.len());
        }
        Self {
            method,
            components,
            entries,
            offsets,
        }
    }

    /// Correction method used
    pub fn method(&self) -> CorrectionMethod {
        self.method
    }

    /// All entries, ordered by target point
    pub fn entries(&self) -> &[CorrectionEntry<T>] {
        &self.entries
    }

    /// Entries in the rows of one target point
    pub fn target_entries(&self, target: usize) -> &[CorrectionEntry<T>] {
        &self.entries[self.offsets[target]..self.offsets[target + 1]]
    }

    /// Number of corrected entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Are there no corrected entries?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `y += (C - N) x`, where `C` holds the corrected values and `N` the naive ones
    pub fn apply(&self, x: &[T], y: &mut [T]) {
        let c = self.components;
        y.par_chunks_mut(c).enumerate().for_each(|(i, rows)| {
            for entry in self.target_entries(i) {
                rows[entry.row - i * c] += (entry.corrected - entry.naive) * x[entry.col];
            }
        });
    }
}

impl<T: RlstScalar> NearFieldCorrection<T> {
    /// Compute the corrections of the naive matrix of `evaluator`.
    ///
    /// Density interpolation corrects the row sums of the naive matrix and
    /// uses `far_field` to compute them.
    pub fn build<K, E, F>(
        evaluator: &DirectEvaluator<'_, '_, K, E, F>,
        far_field: &FarField<K>,
        options: &CorrectionOptions,
    ) -> Result<Self>
    where
        K: LayerKernel<T = T>,
        E: Element<T = K::Real>,
        F: Element<T = K::Real>,
    {
        options.validate()?;
        let correction = match options.method() {
            CorrectionMethod::DensityInterpolation => density_interpolation(evaluator, far_field)?,
            method => {
                let corrector = Corrector::new(evaluator, options)?;
                let per_target = match &corrector {
                    Some(corrector) => (0..evaluator.targets().len())
                        .into_par_iter()
                        .map(|i| corrector.target_entries(i))
                        .collect::<Result<Vec<_>>>()?,
                    None => {
                        check_separated(evaluator)?;
                        vec![vec![]; evaluator.targets().len()]
                    }
                };
                Self::from_targets(method, evaluator.components(), per_target)
            }
        };
        log::info!(
            "Computed {} near-field corrections with {:?}",
            correction.len(),
            correction.method
        );
        Ok(correction)
    }
}

/// Fail if a target coincides with a source point that has no element
fn check_separated<K, E, F>(evaluator: &DirectEvaluator<'_, '_, K, E, F>) -> Result<()>
where
    K: LayerKernel,
    E: Element<T = K::Real>,
    F: Element<T = K::Real>,
{
    let sources = evaluator.sources();
    let targets = evaluator.targets();
    let tree = ClusterTree::new(sources.dim(), sources.points(), 32)?;
    (0..targets.len()).into_par_iter().try_for_each(|i| {
        let (j, dist) = tree.nearest(targets.point(i));
        if dist == K::Real::zero() {
            Err(BieError::UnsupportedCorrection(format!(
                "target {i} coincides with source point {j}, which has no element to correct"
            )))
        } else {
            Ok(())
        }
    })
}

/// Diagonal corrections `c I - sum_j A_ij` for double layer operators
fn density_interpolation<K, E, F>(
    evaluator: &DirectEvaluator<'_, '_, K, E, F>,
    far_field: &FarField<K>,
) -> Result<NearFieldCorrection<K::T>>
where
    K: LayerKernel,
    E: Element<T = K::Real>,
    F: Element<T = K::Real>,
{
    if !same_quadrature(evaluator.targets(), evaluator.sources()) {
        return Err(BieError::UnsupportedCorrection(
            "density interpolation needs the same quadrature for sources and targets".to_string(),
        ));
    }
    let identity = evaluator.kernel().double_layer_identity().ok_or_else(|| {
        BieError::UnsupportedCorrection(
            "the kernel has no double layer identity".to_string(),
        )
    })?;
    let c = evaluator.components();
    let [nrows, ncols] = evaluator.shape();

    // Row sums of the naive matrix for each component of the density
    let row_sums = (0..c)
        .map(|b| {
            let mut x = vec![K::T::zero(); ncols];
            for v in x.iter_mut().skip(b).step_by(c) {
                *v = K::T::one();
            }
            let mut y = vec![K::T::zero(); nrows];
            far_field.apply(evaluator, &x, &mut y);
            y
        })
        .collect::<Vec<_>>();

    let per_target = (0..evaluator.targets().len())
        .into_par_iter()
        .map(|i| {
            let mut block = [K::T::zero(); 9];
            evaluator.point_block(i, i, &mut block[..c * c]);
            let mut entries = Vec::with_capacity(c * c);
            for a in 0..c {
                for b in 0..c {
                    let naive = block[a * c + b];
                    let diagonal = if a == b { identity } else { K::T::zero() };
                    entries.push(CorrectionEntry {
                        row: i * c + a,
                        col: i * c + b,
                        corrected: diagonal - (row_sums[b][i * c + a] - naive),
                        naive,
                    });
                }
            }
            entries
        })
        .collect::<Vec<_>>();
    Ok(NearFieldCorrection::from_targets(
        CorrectionMethod::DensityInterpolation,
        c,
        per_target,
    ))
}

/// Element based corrections for one operator
struct Corrector<'a, 'k, 'q, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>> {
    evaluator: &'a DirectEvaluator<'k, 'q, K, E, F>,
    options: &'a CorrectionOptions,
    interpolant: NodalInterpolant,
    element_tree: ClusterTree<K::Real>,
    search_radius: K::Real,
    same_points: bool,
}

impl<'a, 'k, 'q, K: LayerKernel, E: Element<T = K::Real>, F: Element<T = K::Real>>
    Corrector<'a, 'k, 'q, K, E, F>
{
    /// `None` if the sources have no elements to correct
    fn new(
        evaluator: &'a DirectEvaluator<'k, 'q, K, E, F>,
        options: &'a CorrectionOptions,
    ) -> Result<Option<Self>> {
        let sources = evaluator.sources();
        let Some(rule) = sources.rule() else {
            log::debug!("Sources have no elements; nothing to correct");
            return Ok(None);
        };
        let interpolant = NodalInterpolant::new(rule)?;
        let element_tree = ClusterTree::new(sources.dim(), sources.element_centres(), 16)?;
        let ratio = num::cast::<f64, K::Real>(options.near_field_ratio()).unwrap();
        let max_radius = (0..sources.nelements())
            .map(|e| sources.element_radius(e))
            .fold(<K::Real as Zero>::zero(), num::Float::max);
        Ok(Some(Self {
            evaluator,
            options,
            interpolant,
            element_tree,
            search_radius: ratio * sources.max_element_size() + max_radius,
            same_points: same_quadrature(evaluator.targets(), sources),
        }))
    }

    /// Position of target `i` relative to source element `e`, or `None` if it is far from it
    fn proximity(&self, i: usize, e: usize) -> Option<Proximity> {
        let sources = self.evaluator.sources();
        if self.same_points && sources.element(i) == Some(e) {
            let point = sources
                .reference_point(i)
                .iter()
                .map(|x| num::cast::<K::Real, f64>(*x).unwrap_or(0.0))
                .collect();
            return Some(Proximity::On(point));
        }
        let x = self.evaluator.targets().point(i);
        let size = sources.element_size(e);
        let ratio = num::cast::<f64, K::Real>(self.options.near_field_ratio()).unwrap();
        if distance(x, sources.element_centre(e)) >= ratio * size + sources.element_radius(e) {
            return None;
        }
        let (reference, delta) = closest_point(&sources.elements()[e], x);
        let point = reference
            .iter()
            .map(|v| num::cast::<K::Real, f64>(*v).unwrap_or(0.0))
            .collect();
        let on_element = num::cast::<f64, K::Real>(ON_ELEMENT_RATIO).unwrap();
        if delta <= on_element * size {
            Some(Proximity::On(point))
        } else if delta < ratio * size {
            Some(Proximity::Near {
                point,
                distance: num::cast::<K::Real, f64>(delta).unwrap_or(0.0),
            })
        } else {
            None
        }
    }

    /// Corrected entries in the rows of target point `i`
    fn target_entries(&self, i: usize) -> Result<Vec<CorrectionEntry<K::T>>> {
        let sources = self.evaluator.sources();
        let targets = self.evaluator.targets();
        let kernel = self.evaluator.kernel();
        let c = self.evaluator.components();
        let order = self.options.order();
        let levels = self.options.max_refinement_levels();
        let tolerance = self.options.tolerance().unwrap_or(0.0);

        let mut entries = vec![];
        let mut naive = [K::T::zero(); 9];
        for e in self
            .element_tree
            .ball_query(targets.point(i), self.search_radius)
        {
            let Some(proximity) = self.proximity(i, e) else {
                continue;
            };
            let integrator = ElementIntegrator::new(
                kernel,
                &sources.elements()[e],
                &self.interpolant,
                targets.point(i),
                targets.normal(i),
            );
            let size = num::cast::<K::Real, f64>(sources.element_size(e)).unwrap_or(0.0);
            let values = match (&proximity, self.options.method()) {
                (Proximity::On(point), _) => integrator.on_element(
                    point,
                    order,
                    levels,
                    self.options.richardson_order(),
                    tolerance,
                ),
                (Proximity::Near { distance, .. }, CorrectionMethod::Adaptive) => {
                    let depth = levels + bisection_depth(size, *distance);
                    integrate_adaptively(&integrator, order, tolerance, depth)
                }
                (Proximity::Near { point, distance }, _) => {
                    integrator.near_element(point, *distance, size, order, levels, tolerance)
                }
            }
            .map_err(|d| BieError::CorrectionDivergence {
                target: i,
                source_element: e,
                levels: d.levels,
                estimate: d.estimate,
            })?;

            for (offset, j) in sources.element_points(e).enumerate() {
                self.evaluator.point_block(i, j, &mut naive[..c * c]);
                for a in 0..c {
                    for b in 0..c {
                        entries.push(CorrectionEntry {
                            row: i * c + a,
                            col: j * c + b,
                            corrected: values[offset * c * c + a * c + b],
                            naive: naive[a * c + b],
                        });
                    }
                }
            }
        }
        Ok(entries)
    }
}

/// Number of bisections that bring pieces of an element of size `size` down to `distance`
fn bisection_depth(size: f64, distance: f64) -> usize {
    start_level(size, distance, 64) * GRADING as usize
}
