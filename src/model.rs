//! Feed-forward regression model.
//!
//! Maps sampled field values to conductivity parameters (or the reverse,
//! depending on the batch direction). ReLU hidden layers, linear output,
//! mean-squared-error loss, Adagrad updates. Everything the training entry
//! point needs travels through [`TrainConfig`]; there is no ambient state.
//!
//! The three operating modes are separate functions — [`predict`],
//! [`evaluate`], [`train_step`] — dispatched by the explicit [`Mode`]
//! variant through [`run`], each with its own typed result.

use crate::sample::{Batch, BatchSource};
use crate::solver::SolveError;

use rand::Rng;

/// Configuration consumed by the training entry point. Loss is
/// mean-squared-error by contract.
#[derive(Debug, Clone)]
pub struct TrainConfig {
  pub hidden_units: Vec<usize>,
  pub output_dim: usize,
  pub learning_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Predict,
  Eval,
  Train,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
  pub loss: f64,
}

#[derive(Debug, Clone)]
pub struct TrainStep {
  pub loss: f64,
}

#[derive(Debug)]
pub enum ModelOutput {
  Predictions(na::DMatrix<f64>),
  Evaluation(Evaluation),
  TrainStep(TrainStep),
}

#[derive(Debug, Clone)]
struct Dense {
  weights: na::DMatrix<f64>,
  bias: na::RowDVector<f64>,
}

impl Dense {
  fn new(fan_in: usize, fan_out: usize, rng: &mut impl Rng) -> Self {
    let limit = (fan_in as f64).sqrt().recip();
    Self {
      weights: na::DMatrix::from_fn(fan_in, fan_out, |_, _| rng.gen_range(-limit..limit)),
      bias: na::RowDVector::zeros(fan_out),
    }
  }

  /// `x · W + b`, bias broadcast over rows.
  fn affine(&self, x: &na::DMatrix<f64>) -> na::DMatrix<f64> {
    let mut z = x * &self.weights;
    for mut row in z.row_iter_mut() {
      row += &self.bias;
    }
    z
  }
}

#[derive(Debug, Clone)]
pub struct Mlp {
  layers: Vec<Dense>,
}

impl Mlp {
  /// Hidden layers per `config.hidden_units`, linear output of
  /// `config.output_dim`. Weight init is uniform scaled by fan-in.
  pub fn new(input_dim: usize, config: &TrainConfig, rng: &mut impl Rng) -> Self {
    let mut layers = Vec::new();
    let mut fan_in = input_dim;
    for &units in &config.hidden_units {
      layers.push(Dense::new(fan_in, units, rng));
      fan_in = units;
    }
    layers.push(Dense::new(fan_in, config.output_dim, rng));
    Self { layers }
  }

  pub fn input_dim(&self) -> usize {
    self.layers.first().map_or(0, |l| l.weights.nrows())
  }
  pub fn output_dim(&self) -> usize {
    self.layers.last().map_or(0, |l| l.weights.ncols())
  }

  /// Forward pass keeping per-layer activations for backprop.
  /// `activations[l]` is the input of layer `l`; the last entry is the
  /// network output.
  fn forward_trace(&self, x: &na::DMatrix<f64>) -> Vec<na::DMatrix<f64>> {
    let nlayers = self.layers.len();
    let mut activations = Vec::with_capacity(nlayers + 1);
    activations.push(x.clone());
    for (l, layer) in self.layers.iter().enumerate() {
      let z = layer.affine(activations.last().unwrap());
      let a = if l + 1 < nlayers {
        z.map(|v| v.max(0.0))
      } else {
        z
      };
      activations.push(a);
    }
    activations
  }

  pub fn forward(&self, x: &na::DMatrix<f64>) -> na::DMatrix<f64> {
    self.forward_trace(x).pop().unwrap()
  }
}

/// Mean-squared error over all entries.
pub fn mse(predictions: &na::DMatrix<f64>, labels: &na::DMatrix<f64>) -> f64 {
  assert_eq!(predictions.shape(), labels.shape());
  let residual = predictions - labels;
  residual.iter().map(|r| r * r).sum::<f64>() / residual.len() as f64
}

/// Adagrad accumulator state, one slot per layer.
#[derive(Debug, Clone)]
pub struct Adagrad {
  learning_rate: f64,
  accum_weights: Vec<na::DMatrix<f64>>,
  accum_bias: Vec<na::RowDVector<f64>>,
}

const ADAGRAD_INITIAL_ACCUM: f64 = 0.1;

impl Adagrad {
  pub fn new(model: &Mlp, learning_rate: f64) -> Self {
    let accum_weights = model
      .layers
      .iter()
      .map(|l| na::DMatrix::from_element(l.weights.nrows(), l.weights.ncols(), ADAGRAD_INITIAL_ACCUM))
      .collect();
    let accum_bias = model
      .layers
      .iter()
      .map(|l| na::RowDVector::from_element(l.bias.ncols(), ADAGRAD_INITIAL_ACCUM))
      .collect();
    Self {
      learning_rate,
      accum_weights,
      accum_bias,
    }
  }

  pub fn for_config(model: &Mlp, config: &TrainConfig) -> Self {
    Self::new(model, config.learning_rate)
  }
}

/// Network output for a feature matrix (rows are samples).
pub fn predict(model: &Mlp, features: &na::DMatrix<f64>) -> na::DMatrix<f64> {
  model.forward(features)
}

/// Loss of the model on one batch, no update.
pub fn evaluate(model: &Mlp, batch: &Batch) -> Evaluation {
  let predictions = model.forward(&batch.features);
  Evaluation {
    loss: mse(&predictions, &batch.labels),
  }
}

/// One backprop + Adagrad update on one batch. Returns the pre-update loss.
pub fn train_step(model: &mut Mlp, optimizer: &mut Adagrad, batch: &Batch) -> TrainStep {
  let activations = model.forward_trace(&batch.features);
  let predictions = activations.last().unwrap();
  let loss = mse(predictions, &batch.labels);

  // d(MSE)/d(output)
  let scale = 2.0 / (predictions.nrows() * predictions.ncols()) as f64;
  let mut delta = (predictions - &batch.labels) * scale;

  for l in (0..model.layers.len()).rev() {
    let input = &activations[l];
    let grad_weights = input.transpose() * &delta;
    let grad_bias = delta.row_sum();

    if l > 0 {
      // Push through the preceding ReLU.
      let mask = activations[l].map(|v| if v > 0.0 { 1.0 } else { 0.0 });
      delta = (&delta * model.layers[l].weights.transpose()).component_mul(&mask);
    }

    let accum_w = &mut optimizer.accum_weights[l];
    *accum_w += grad_weights.component_mul(&grad_weights);
    model.layers[l].weights -=
      optimizer.learning_rate * grad_weights.component_div(&accum_w.map(f64::sqrt));

    let accum_b = &mut optimizer.accum_bias[l];
    *accum_b += grad_bias.component_mul(&grad_bias);
    model.layers[l].bias -=
      optimizer.learning_rate * grad_bias.component_div(&accum_b.map(f64::sqrt));
  }

  TrainStep { loss }
}

/// Mode-keyed dispatch over the three operations.
pub fn run(mode: Mode, model: &mut Mlp, optimizer: &mut Adagrad, batch: &Batch) -> ModelOutput {
  match mode {
    Mode::Predict => ModelOutput::Predictions(predict(model, &batch.features)),
    Mode::Eval => ModelOutput::Evaluation(evaluate(model, batch)),
    Mode::Train => ModelOutput::TrainStep(train_step(model, optimizer, batch)),
  }
}

/// Training loop over a pull-based batch source. Returns the final step
/// loss. A solver error from the source aborts the loop unchanged.
pub fn fit(
  model: &mut Mlp,
  optimizer: &mut Adagrad,
  source: &mut impl BatchSource,
  steps: usize,
  batch_size: usize,
) -> Result<f64, SolveError> {
  let mut last_loss = f64::NAN;
  for step in 0..steps {
    let batch = source.next_batch(batch_size)?;
    let outcome = train_step(model, optimizer, &batch);
    last_loss = outcome.loss;
    tracing::debug!(step, loss = outcome.loss, "train step");
  }
  Ok(last_loss)
}
