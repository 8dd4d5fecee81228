//! Evaluation of layer potentials away from the boundary
use crate::far_field::ClusterTree;
use crate::options::{NearSingularityAction, PotentialOptions};
use crate::quadrature::Quadrature;
use crate::traits::{Element, LayerKernel};
use crate::types::{check_length, BieError, Result};
use num::Zero;
use rayon::prelude::*;
use rlst::RlstScalar;

/// Evaluates the potential `u(x) = sum_j K(x, y_j) w_j phi_j` of a density `phi` given at the source points
pub struct PotentialEvaluator<'a, K: LayerKernel, E: Element<T = K::Real>> {
    kernel: &'a K,
    sources: &'a Quadrature<'a, E>,
    options: PotentialOptions,
    tree: ClusterTree<K::Real>,
}

impl<'a, K: LayerKernel, E: Element<T = K::Real>> PotentialEvaluator<'a, K, E> {
    /// Create new
    pub fn new(kernel: &'a K, sources: &'a Quadrature<'a, E>, options: PotentialOptions) -> Result<Self> {
        if kernel.uses_target_normal() {
            return Err(BieError::InvalidOptions(
                "potentials of kernels that use target normals are not defined".to_string(),
            ));
        }
        let ratio = options.singularity_ratio();
        if !(ratio >= 0.0 && ratio.is_finite()) {
            return Err(BieError::InvalidOptions(format!(
                "singularity ratio {ratio} is not a non-negative number"
            )));
        }
        check_length(kernel.space_dimension(), sources.dim(), "source dimension")?;
        let tree = ClusterTree::new(sources.dim(), sources.points(), 32)?;
        Ok(Self {
            kernel,
            sources,
            options,
            tree,
        })
    }

    /// Distance below which a point is too close to source point `j`
    fn threshold(&self, j: usize) -> K::Real {
        let ratio = num::cast::<f64, K::Real>(self.options.singularity_ratio()).unwrap();
        match self.sources.element(j) {
            Some(e) => ratio * self.sources.element_size(e),
            None => ratio,
        }
    }

    /// Evaluate the potential at `points`, stored point by point.
    ///
    /// The result holds the components of the potential at each point.
    pub fn evaluate(&self, points: &[K::Real], density: &[K::T]) -> Result<Vec<K::T>> {
        let dim = self.sources.dim();
        let c = self.kernel.value_shape().components();
        check_length(self.sources.len() * c, density.len(), "density")?;
        check_length(dim * (points.len() / dim), points.len(), "evaluation points")?;
        let zero_normal = vec![K::Real::zero(); dim];

        let values = points
            .par_chunks_exact(dim)
            .enumerate()
            .map(|(p, x)| {
                let (nearest, dist) = self.tree.nearest(x);
                let threshold = self.threshold(nearest);
                if dist < threshold || dist == K::Real::zero() {
                    match self.options.action() {
                        NearSingularityAction::Fail => {
                            return Err(BieError::EvaluationNearSingularity {
                                point: p,
                                source_index: nearest,
                                distance: num::cast::<K::Real, f64>(dist).unwrap_or(f64::NAN),
                                threshold: num::cast::<K::Real, f64>(threshold).unwrap_or(f64::NAN),
                            });
                        }
                        NearSingularityAction::Accept => log::warn!(
                            "Evaluation point {p} is {:e} from source point {nearest}",
                            num::cast::<K::Real, f64>(dist).unwrap_or(f64::NAN)
                        ),
                    }
                }
                let mut result = vec![K::T::zero(); c];
                let mut kernel_values = vec![K::T::zero(); c * c];
                for j in 0..self.sources.len() {
                    if self
                        .kernel
                        .evaluate(
                            x,
                            &zero_normal,
                            self.sources.point(j),
                            self.sources.normal(j),
                            &mut kernel_values,
                        )
                        .is_err()
                    {
                        continue;
                    }
                    let w = self.sources.weight(j);
                    for (a, r) in result.iter_mut().enumerate() {
                        for b in 0..c {
                            *r += kernel_values[a * c + b].mul_real(w) * density[j * c + b];
                        }
                    }
                }
                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Evaluated potential at {} points", values.len());
        Ok(values.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Segment;
    use crate::kernel::{AdjointDoubleLayer, DoubleLayer, Laplace2dKernel, SingleLayer, Stokes2dKernel};
    use crate::shapes::circle;
    use approx::assert_relative_eq;

    #[test]
    fn test_double_layer_of_constant_inside_and_outside() {
        let elements = circle::<f64>(32, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 6).unwrap();
        let kernel = DoubleLayer::new(Laplace2dKernel::<f64>::new());
        let evaluator = PotentialEvaluator::new(&kernel, &quadrature, PotentialOptions::new(1.0)).unwrap();
        let density = vec![1.0; quadrature.len()];
        let values = evaluator
            .evaluate(&[0.0, 0.0, 0.3, -0.2, 2.0, 1.0], &density)
            .unwrap();
        assert_relative_eq!(values[0], -1.0, epsilon = 1e-10);
        assert_relative_eq!(values[1], -1.0, epsilon = 1e-10);
        assert_relative_eq!(values[2], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_near_singular_points() {
        let elements = circle::<f64>(16, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 4).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let density = vec![1.0; quadrature.len()];
        let point = quadrature.point(5).to_vec();

        let evaluator = PotentialEvaluator::new(&kernel, &quadrature, PotentialOptions::new(0.1)).unwrap();
        match evaluator.evaluate(&[0.0, 0.0, point[0], point[1]], &density) {
            Err(BieError::EvaluationNearSingularity {
                point,
                source_index,
                ..
            }) => {
                assert_eq!(point, 1);
                assert_eq!(source_index, 5);
            }
            _ => panic!("near-singular point was not detected"),
        }

        let mut options = PotentialOptions::new(0.1);
        options.set_action(NearSingularityAction::Accept);
        let evaluator = PotentialEvaluator::new(&kernel, &quadrature, options).unwrap();
        let values = evaluator
            .evaluate(&[0.0, 0.0, point[0], point[1]], &density)
            .unwrap();
        assert!(values[1].is_finite());
    }

    #[test]
    fn test_point_sources() {
        let kernel = SingleLayer::new(Stokes2dKernel::<f64>::new(1.0));
        let sources = Quadrature::<Segment<f64>>::from_points(2, &[0.0, 0.0]).unwrap();
        let evaluator = PotentialEvaluator::new(&kernel, &sources, PotentialOptions::new(0.0)).unwrap();
        let values = evaluator.evaluate(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        // Stokeslet (x - y) ⊗ (x - y) / r² - ln r I, over 4π μ
        assert_relative_eq!(values[0], 1.0 / (4.0 * std::f64::consts::PI), epsilon = 1e-14);
        assert_relative_eq!(values[1], 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_target_normal_kernels_are_rejected() {
        let elements = circle::<f64>(8, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 2).unwrap();
        let kernel = AdjointDoubleLayer::new(Laplace2dKernel::<f64>::new());
        let result = PotentialEvaluator::new(&kernel, &quadrature, PotentialOptions::new(1.0));
        assert!(matches!(result, Err(BieError::InvalidOptions(_))));
    }

    #[test]
    fn test_density_length_is_checked() {
        let elements = circle::<f64>(8, 1.0);
        let quadrature = Quadrature::from_elements(&elements, 2).unwrap();
        let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
        let evaluator = PotentialEvaluator::new(&kernel, &quadrature, PotentialOptions::new(1.0)).unwrap();
        assert!(matches!(
            evaluator.evaluate(&[0.0, 0.0], &[1.0; 3]),
            Err(BieError::DimensionMismatch { .. })
        ));
    }
}
