extern crate blas_src;
extern crate lapack_src;

mod common;

use bempp_nystrom::far_field::aca::aca;
use bempp_nystrom::far_field::{DirectEvaluator, FarField};
use bempp_nystrom::geometry::FlatTriangle;
use bempp_nystrom::kernel::{DoubleLayer, Helmholtz3dKernel, Laplace3dKernel, SingleLayer};
use bempp_nystrom::options::{CompressionMethod, CompressionOptions};
use bempp_nystrom::quadrature::Quadrature;
use bempp_nystrom::shapes::regular_sphere;
use common::relative_difference;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rlst::{c64, RandomAccessByRef, RawAccess, Shape};

/// Random points in a cube of side `width` centred at `centre`
fn cluster(rng: &mut StdRng, n: usize, centre: [f64; 3], width: f64) -> Vec<f64> {
    (0..n)
        .flat_map(|_| centre.map(|c| c + width * (rng.gen::<f64>() - 0.5)))
        .collect()
}

#[test]
fn test_cross_approximation_of_separated_clusters() {
    let mut rng = StdRng::seed_from_u64(1);
    let targets = cluster(&mut rng, 80, [0.0, 0.0, 0.0], 1.0);
    let sources = cluster(&mut rng, 60, [3.0, 0.5, 0.0], 1.0);
    let targets = Quadrature::<FlatTriangle<f64>>::from_points(3, &targets).unwrap();
    let sources = Quadrature::<FlatTriangle<f64>>::from_points(3, &sources).unwrap();
    let kernel = SingleLayer::new(Laplace3dKernel::<f64>::new());
    let evaluator = DirectEvaluator::new(&kernel, &targets, &sources);
    let [m, n] = evaluator.shape();
    let rows = (0..m).collect::<Vec<_>>();
    let cols = (0..n).collect::<Vec<_>>();
    let dense = evaluator.dense_block(&rows, &cols);
    let dense_norm = dense.data().iter().map(|v| v * v).sum::<f64>().sqrt();

    for tolerance in [1e-4, 1e-6, 1e-8] {
        let block = aca(
            m,
            n,
            |i, r| evaluator.row(i, &cols, r),
            |j, c| evaluator.column(j, &rows, c),
            tolerance,
            n,
        )
        .unwrap();
        assert!(block.rank() < n);
        assert_eq!(block.shape(), [m, n]);

        for _ in 0..10 {
            let x = (0..n).map(|_| rng.gen::<f64>() - 0.5).collect::<Vec<_>>();
            let x_norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            let mut compressed = vec![0.0; m];
            block.apply(&x, &mut compressed);
            let error = (0..m)
                .map(|i| {
                    let exact = (0..n).map(|j| *dense.get([i, j]).unwrap() * x[j]).sum::<f64>();
                    (exact - compressed[i]).powi(2)
                })
                .sum::<f64>()
                .sqrt();
            assert!(error <= tolerance * dense_norm * x_norm);
        }
    }
}

#[test]
fn test_complex_cross_approximation() {
    let mut rng = StdRng::seed_from_u64(2);
    let targets = cluster(&mut rng, 50, [0.0, 0.0, 0.0], 1.0);
    let sources = cluster(&mut rng, 50, [0.0, 0.0, 4.0], 1.0);
    let targets = Quadrature::<FlatTriangle<f64>>::from_points(3, &targets).unwrap();
    let sources = Quadrature::<FlatTriangle<f64>>::from_points(3, &sources).unwrap();
    let kernel = SingleLayer::new(Helmholtz3dKernel::<c64>::new(2.0));
    let evaluator = DirectEvaluator::new(&kernel, &targets, &sources);
    let [m, n] = evaluator.shape();
    let rows = (0..m).collect::<Vec<_>>();
    let cols = (0..n).collect::<Vec<_>>();
    let dense = evaluator.dense_block(&rows, &cols);
    let dense_norm = dense.data().iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
    let tolerance = 1e-6;
    let block = aca(
        m,
        n,
        |i, r| evaluator.row(i, &cols, r),
        |j, c| evaluator.column(j, &rows, c),
        tolerance,
        n,
    )
    .unwrap();

    for _ in 0..10 {
        let x = (0..n)
            .map(|_| c64::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5))
            .collect::<Vec<_>>();
        let x_norm = x.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
        let mut compressed = vec![c64::new(0.0, 0.0); m];
        block.apply(&x, &mut compressed);
        let error = (0..m)
            .map(|i| {
                let exact = (0..n)
                    .map(|j| *dense.get([i, j]).unwrap() * x[j])
                    .sum::<c64>();
                (exact - compressed[i]).norm_sqr()
            })
            .sum::<f64>()
            .sqrt();
        assert!(error <= tolerance * dense_norm * x_norm);
    }
}

#[test]
fn test_compressed_operator_over_random_trials() {
    let elements = regular_sphere::<f64>(3);
    let quadrature = Quadrature::from_elements(&elements, 1).unwrap();
    let kernel = DoubleLayer::new(Laplace3dKernel::<f64>::new());
    let evaluator = DirectEvaluator::new(&kernel, &quadrature, &quadrature);
    let mut rng = StdRng::seed_from_u64(5);

    for method in [CompressionMethod::LowRankHierarchical, CompressionMethod::Multipole] {
        let mut options = CompressionOptions::new(method);
        options.set_tolerance(1e-6).set_leaf_size(32);
        let far_field = FarField::build(&evaluator, &options).unwrap();
        assert!(far_field.storage() < quadrature.len() * quadrature.len());
        for _ in 0..5 {
            let x = (0..quadrature.len()).map(|_| rng.gen::<f64>()).collect::<Vec<_>>();
            let mut expected = vec![0.0; quadrature.len()];
            evaluator.apply(&x, &mut expected);
            let mut y = vec![0.0; quadrature.len()];
            far_field.apply(&evaluator, &x, &mut y);
            assert!(relative_difference(&y, &expected) < 1e-5);
        }
    }
}
