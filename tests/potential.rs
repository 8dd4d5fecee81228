extern crate blas_src;
extern crate lapack_src;

use approx::assert_relative_eq;
use bempp_nystrom::geometry::{FlatTriangle, Segment};
use bempp_nystrom::kernel::{Helmholtz3dKernel, Laplace2dKernel, SingleLayer, Stokes3dKernel};
use bempp_nystrom::options::{NearSingularityAction, PotentialOptions};
use bempp_nystrom::potential::PotentialEvaluator;
use bempp_nystrom::quadrature::Quadrature;
use bempp_nystrom::shapes::{circle, regular_sphere};
use bempp_nystrom::types::BieError;
use rlst::c64;
use std::f64::consts::PI;

#[test]
fn test_point_source_at_boundary_points() {
    let elements = circle::<f64>(12, 1.0);
    let boundary = Quadrature::from_elements(&elements, 4).unwrap();
    let source = [0.2, -0.3];
    let sources = Quadrature::<Segment<f64>>::from_points(2, &source).unwrap();
    let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
    let evaluator = PotentialEvaluator::new(&kernel, &sources, PotentialOptions::new(0.0)).unwrap();
    let values = evaluator.evaluate(boundary.points(), &[1.0]).unwrap();
    assert_eq!(values.len(), boundary.len());
    for (x, value) in boundary.points().chunks_exact(2).zip(values) {
        let r = ((x[0] - source[0]).powi(2) + (x[1] - source[1]).powi(2)).sqrt();
        assert_relative_eq!(value, -r.ln() / (2.0 * PI), epsilon = 1e-14);
    }
}

#[test]
fn test_helmholtz_point_source_at_boundary_points() {
    let elements = regular_sphere::<f64>(1);
    let boundary = Quadrature::from_elements(&elements, 3).unwrap();
    let source = [0.1, 0.0, -0.2];
    let sources = Quadrature::<FlatTriangle<f64>>::from_points(3, &source).unwrap();
    let k = 3.0;
    let kernel = SingleLayer::new(Helmholtz3dKernel::<c64>::new(k));
    let evaluator = PotentialEvaluator::new(&kernel, &sources, PotentialOptions::new(0.0)).unwrap();
    let values = evaluator
        .evaluate(boundary.points(), &[c64::new(1.0, 0.0)])
        .unwrap();
    for (x, value) in boundary.points().chunks_exact(3).zip(values) {
        let r = x
            .iter()
            .zip(source)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        let expected = c64::new((k * r).cos(), (k * r).sin()) / (4.0 * PI * r);
        assert_relative_eq!(value.re, expected.re, epsilon = 1e-13);
        assert_relative_eq!(value.im, expected.im, epsilon = 1e-13);
    }
}

#[test]
fn test_stokes_point_force() {
    let force = [0.0, 0.0, 1.0];
    let sources = Quadrature::<FlatTriangle<f64>>::from_points(3, &[0.0, 0.0, 0.0]).unwrap();
    let viscosity = 2.0;
    let kernel = SingleLayer::new(Stokes3dKernel::<f64>::new(viscosity));
    let evaluator = PotentialEvaluator::new(&kernel, &sources, PotentialOptions::new(0.0)).unwrap();
    let x = [1.0, 0.0, 1.0];
    let values = evaluator.evaluate(&x, &force).unwrap();
    // (I / r + x x^T / r^3) f / (8 pi mu)
    let r = 2.0f64.sqrt();
    let scale = 1.0 / (8.0 * PI * viscosity);
    assert_relative_eq!(values[0], scale / r.powi(3), epsilon = 1e-14);
    assert_relative_eq!(values[1], 0.0, epsilon = 1e-14);
    assert_relative_eq!(values[2], scale * (1.0 / r + 1.0 / r.powi(3)), epsilon = 1e-14);
}

#[test]
fn test_coincident_point_is_reported() {
    let elements = circle::<f64>(12, 1.0);
    let boundary = Quadrature::from_elements(&elements, 4).unwrap();
    let kernel = SingleLayer::new(Laplace2dKernel::<f64>::new());
    let density = vec![1.0; boundary.len()];
    let evaluator = PotentialEvaluator::new(&kernel, &boundary, PotentialOptions::new(0.0)).unwrap();
    let point = boundary.point(7).to_vec();
    assert!(matches!(
        evaluator.evaluate(&point, &density),
        Err(BieError::EvaluationNearSingularity { source_index: 7, .. })
    ));

    let mut options = PotentialOptions::new(0.0);
    options.set_action(NearSingularityAction::Accept);
    let evaluator = PotentialEvaluator::new(&kernel, &boundary, options).unwrap();
    let values = evaluator.evaluate(&point, &density).unwrap();
    assert!(values[0].is_finite());
}
