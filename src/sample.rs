//! Random parameter sampling and dataset generation.
//!
//! The generator draws conductivity vectors, runs the forward solver and
//! packages (feature, label) batches for the regression collaborator, in
//! both pairing directions: "params → field" for forward surrogates and
//! "field → params" for the inverse estimator.
//!
//! A solve failure (singular parameter vector) aborts the whole batch and
//! propagates; rows are never skipped or silently resampled. Callers that
//! want resampling can wrap [`BatchSource::next_batch`].

use crate::solver::{ForwardSolver, SolveError};

use rand::Rng;

/// Key under which features are handed to the training collaborator.
pub const FEATURE_KEY: &str = "x";

/// Sampling bounds for the conductivity parameters. The defaults are the
/// normative ranges: side conductivities uniform on (0, 8), Biot fixed at
/// 1, center conductivity uniform on (0, 2).
#[derive(Debug, Clone, Copy)]
pub struct ParameterDomain {
  pub k_range: (f64, f64),
  pub biot: f64,
  pub k_center_range: (f64, f64),
}

impl Default for ParameterDomain {
  fn default() -> Self {
    Self {
      k_range: (0.0, 8.0),
      biot: 1.0,
      k_center_range: (0.0, 2.0),
    }
  }
}

impl ParameterDomain {
  /// Draws one parameter vector of length `nparams`: side conductivities
  /// first, then the Biot coefficient, then the center conductivity.
  pub fn draw(&self, nparams: usize, rng: &mut impl Rng) -> Vec<f64> {
    assert!(nparams >= 2);
    let mut params = Vec::with_capacity(nparams);
    for _ in 0..nparams - 2 {
      params.push(rng.gen_range(self.k_range.0..self.k_range.1));
    }
    params.push(self.biot);
    params.push(rng.gen_range(self.k_center_range.0..self.k_center_range.1));
    params
  }
}

/// One (feature-map, label) pair exchanged with the training loop.
/// Features are keyed by [`FEATURE_KEY`]; rows are samples.
#[derive(Debug, Clone)]
pub struct Batch {
  pub key: &'static str,
  pub features: na::DMatrix<f64>,
  pub labels: na::DMatrix<f64>,
}

/// Pairing direction of a generated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// Features are parameter vectors, labels are fields.
  Forward,
  /// Features are fields, labels are parameter vectors.
  Inverse,
}

pub struct DatasetSampler<'a, R> {
  solver: &'a ForwardSolver,
  domain: ParameterDomain,
  rng: R,
}

impl<'a, R: Rng> DatasetSampler<'a, R> {
  pub fn new(solver: &'a ForwardSolver, rng: R) -> Self {
    Self::with_domain(solver, ParameterDomain::default(), rng)
  }

  pub fn with_domain(solver: &'a ForwardSolver, domain: ParameterDomain, rng: R) -> Self {
    Self {
      solver,
      domain,
      rng,
    }
  }

  pub fn domain(&self) -> &ParameterDomain {
    &self.domain
  }

  pub fn draw_params(&mut self) -> Vec<f64> {
    self.domain.draw(self.solver.nparams(), &mut self.rng)
  }

  /// One (params, nodal field) pair, for evaluation and held-out testing.
  pub fn sample_nodal(&mut self) -> Result<(Vec<f64>, na::DVector<f64>), SolveError> {
    let params = self.draw_params();
    let field = self.solver.solve_nodal(&params)?;
    Ok((params, field))
  }

  /// One (params, grid field) pair; requires a configured grid.
  pub fn sample_grid(&mut self) -> Result<(Vec<f64>, na::DMatrix<f64>), SolveError> {
    let params = self.draw_params();
    let field = self.solver.solve_interpolated(&params)?;
    Ok((params, field))
  }

  /// Draws `batch_size` rows of (params, field) pairs. Fields are nodal
  /// vectors, or flattened grid fields when the solver has a grid.
  fn sample_rows(
    &mut self,
    batch_size: usize,
  ) -> Result<(na::DMatrix<f64>, na::DMatrix<f64>), SolveError> {
    let nparams = self.solver.nparams();
    let field_len = match self.solver.grid() {
      Some(grid) => grid.nx * grid.ny,
      None => self.solver.nnodes(),
    };

    let mut params = na::DMatrix::zeros(batch_size, nparams);
    let mut fields = na::DMatrix::zeros(batch_size, field_len);

    for row in 0..batch_size {
      let (theta, field) = match self.solver.grid() {
        Some(_) => {
          let (theta, field) = self.sample_grid()?;
          (theta, na::DVector::from_iterator(field_len, field.iter().copied()))
        }
        None => self.sample_nodal()?,
      };
      for (col, &value) in theta.iter().enumerate() {
        params[(row, col)] = value;
      }
      for (col, &value) in field.iter().enumerate() {
        fields[(row, col)] = value;
      }
    }
    Ok((params, fields))
  }

  /// "params → field" batch: features `B×Q`, labels `B×N` (or `B×(nx·ny)`).
  pub fn forward_batch(&mut self, batch_size: usize) -> Result<Batch, SolveError> {
    let (params, fields) = self.sample_rows(batch_size)?;
    Ok(Batch {
      key: FEATURE_KEY,
      features: params,
      labels: fields,
    })
  }

  /// "field → params" batch: features `B×N` (or `B×(nx·ny)`), labels `B×Q`.
  pub fn inverse_batch(&mut self, batch_size: usize) -> Result<Batch, SolveError> {
    let (params, fields) = self.sample_rows(batch_size)?;
    Ok(Batch {
      key: FEATURE_KEY,
      features: fields,
      labels: params,
    })
  }

  pub fn batch(&mut self, direction: Direction, batch_size: usize) -> Result<Batch, SolveError> {
    match direction {
      Direction::Forward => self.forward_batch(batch_size),
      Direction::Inverse => self.inverse_batch(batch_size),
    }
  }

  /// Fixes the pairing direction, yielding the pull-based factory the
  /// training loop consumes.
  pub fn directed(self, direction: Direction) -> DirectedSampler<'a, R> {
    DirectedSampler {
      sampler: self,
      direction,
    }
  }
}

/// Pull-based batch factory interface consumed by the training loop.
pub trait BatchSource {
  fn next_batch(&mut self, batch_size: usize) -> Result<Batch, SolveError>;
}

pub struct DirectedSampler<'a, R> {
  sampler: DatasetSampler<'a, R>,
  direction: Direction,
}

impl<R: Rng> BatchSource for DirectedSampler<'_, R> {
  fn next_batch(&mut self, batch_size: usize) -> Result<Batch, SolveError> {
    self.sampler.batch(self.direction, batch_size)
  }
}
