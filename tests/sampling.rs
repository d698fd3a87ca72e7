//! Dataset-generator properties: shapes, bounds, seeded reproducibility.

extern crate nalgebra as na;

use rand::rngs::StdRng;
use rand::SeedableRng;

use thermofin::sample::{BatchSource, DatasetSampler, Direction, FEATURE_KEY};
use thermofin::solver::{ForwardSolver, GridSpec, SolveError};
use thermofin::sparse::SparseMatrix;
use thermofin::store::{FinFemData, FinMesh};

fn unit_square_mesh() -> FinMesh {
  let coords = vec![
    na::Vector2::new(0.0, 0.0),
    na::Vector2::new(1.0, 0.0),
    na::Vector2::new(1.0, 1.0),
    na::Vector2::new(0.0, 1.0),
  ];
  FinMesh::new(coords, vec![[0, 1, 2], [0, 2, 3]])
}

/// Three regions so the sampler exercises every bound kind: one free side
/// conductivity, the fixed Biot coefficient, the center conductivity.
/// `Ah = (k + biot) · I` stays nonsingular for every draw.
fn toy_solver(grid: Option<GridSpec>) -> ForwardSolver {
  let eye = |scale: f64| SparseMatrix::new(4, 4, (0..4).map(|i| (i, i, scale)).collect());
  let data = FinFemData::new(
    vec![eye(1.0), eye(1.0), SparseMatrix::zeros(4, 4)],
    na::DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]),
    unit_square_mesh(),
  )
  .unwrap();
  ForwardSolver::new(data, grid)
}

#[test]
fn forward_batch_shapes_and_finiteness() {
  let solver = toy_solver(None);
  let mut sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(42));

  let batch = sampler.forward_batch(5).unwrap();
  assert_eq!(batch.key, FEATURE_KEY);
  assert_eq!(batch.features.shape(), (5, 3));
  assert_eq!(batch.labels.shape(), (5, 4));
  assert!(batch.labels.iter().all(|v| v.is_finite()));
}

#[test]
fn inverse_batch_swaps_features_and_labels() {
  let solver = toy_solver(None);
  let mut sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(42));

  let batch = sampler.inverse_batch(3).unwrap();
  assert_eq!(batch.features.shape(), (3, 4));
  assert_eq!(batch.labels.shape(), (3, 3));
}

#[test]
fn grid_batches_flatten_the_grid_field() {
  let solver = toy_solver(Some(GridSpec::new(6, 4)));
  let mut sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(1));

  let batch = sampler.inverse_batch(2).unwrap();
  assert_eq!(batch.features.shape(), (2, 24));
  assert_eq!(batch.labels.shape(), (2, 3));
}

#[test]
fn draws_respect_the_parameter_domain() {
  let solver = toy_solver(None);
  let mut sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(7));

  for _ in 0..200 {
    let params = sampler.draw_params();
    assert_eq!(params.len(), 3);
    assert!(params[0] >= 0.0 && params[0] < 8.0);
    assert_eq!(params[1], 1.0);
    assert!(params[2] >= 0.0 && params[2] < 2.0);
  }
}

#[test]
fn seeded_sampling_is_reproducible() {
  let solver = toy_solver(None);

  let mut first = DatasetSampler::new(&solver, StdRng::seed_from_u64(1234));
  let mut second = DatasetSampler::new(&solver, StdRng::seed_from_u64(1234));

  let a = first.forward_batch(4).unwrap();
  let b = second.forward_batch(4).unwrap();
  assert_eq!(a.features, b.features);
  assert_eq!(a.labels, b.labels);
}

#[test]
fn single_sample_variants() {
  let solver = toy_solver(Some(GridSpec::new(5, 5)));
  let mut sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(9));

  let (params, nodal) = sampler.sample_nodal().unwrap();
  assert_eq!(params.len(), 3);
  assert_eq!(nodal.len(), 4);

  let (params, grid) = sampler.sample_grid().unwrap();
  assert_eq!(params.len(), 3);
  assert_eq!(grid.shape(), (5, 5));
}

#[test]
fn grid_sample_without_grid_is_a_configuration_error() {
  let solver = toy_solver(None);
  let mut sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(2));
  assert!(matches!(
    sampler.sample_grid(),
    Err(SolveError::Configuration { .. })
  ));
}

#[test]
fn directed_sampler_is_a_batch_source() {
  let solver = toy_solver(None);
  let sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(5));
  let mut source = sampler.directed(Direction::Inverse);

  let batch = source.next_batch(2).unwrap();
  assert_eq!(batch.features.shape(), (2, 4));
  assert_eq!(batch.labels.shape(), (2, 3));
}
