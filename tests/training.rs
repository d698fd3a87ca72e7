//! End-to-end pipeline: sampler feeds solver-generated batches into the
//! regression model's training loop.

extern crate nalgebra as na;

use rand::rngs::StdRng;
use rand::SeedableRng;

use thermofin::model::{self, Adagrad, Mlp, TrainConfig};
use thermofin::sample::{BatchSource, DatasetSampler, Direction};
use thermofin::solver::ForwardSolver;
use thermofin::sparse::SparseMatrix;
use thermofin::store::{FinFemData, FinMesh};

fn toy_solver() -> ForwardSolver {
  let coords = vec![
    na::Vector2::new(0.0, 0.0),
    na::Vector2::new(1.0, 0.0),
    na::Vector2::new(1.0, 1.0),
    na::Vector2::new(0.0, 1.0),
  ];
  let mesh = FinMesh::new(coords, vec![[0, 1, 2], [0, 2, 3]]);
  let eye = |scale: f64| SparseMatrix::new(4, 4, (0..4).map(|i| (i, i, scale)).collect());
  let data = FinFemData::new(
    vec![eye(1.0), eye(1.0), eye(0.5)],
    na::DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]),
    mesh,
  )
  .unwrap();
  ForwardSolver::new(data, None)
}

#[test]
fn inverse_model_trains_on_sampled_batches() {
  let _ = tracing_subscriber::fmt::try_init();
  let solver = toy_solver();

  let sampler = DatasetSampler::new(&solver, StdRng::seed_from_u64(17));
  let mut source = sampler.directed(Direction::Inverse);

  let config = TrainConfig {
    hidden_units: vec![16, 16],
    output_dim: solver.nparams(),
    learning_rate: 0.1,
  };
  let mut rng = StdRng::seed_from_u64(23);
  let mut mlp = Mlp::new(solver.nnodes(), &config, &mut rng);
  let mut optimizer = Adagrad::for_config(&mlp, &config);

  let final_loss = model::fit(&mut mlp, &mut optimizer, &mut source, 50, 8).unwrap();
  assert!(final_loss.is_finite());

  let held_out = source.next_batch(16).unwrap();
  let evaluation = model::evaluate(&mlp, &held_out);
  assert!(evaluation.loss.is_finite());

  let predictions = model::predict(&mlp, &held_out.features);
  assert_eq!(predictions.shape(), (16, solver.nparams()));
}
