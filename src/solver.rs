//! Parametrized forward solver for the thermal-fin problem.
//!
//! The discretized operator is a weighted sum of precomputed region
//! stiffness matrices, `Ah(θ) = Σ θ_q · Aq_q`; a solve assembles the sum
//! for one parameter vector, factorizes it with a general sparse LU and
//! returns the nodal temperature field, optionally pushed through the C1
//! interpolant onto a fixed sampling grid.
//!
//! Solves are pure functions of the parameter vector: the only state is
//! the immutable FEM data loaded at construction.

use crate::linalg::FaerLu;
use crate::sparse::SparseMatrix;
use crate::store::{DataLoadError, FinFemData};
use crate::triangulation::{CubicInterpolant, Triangulation};

use std::path::Path;

use thiserror::Error;

/// Physical extent of the fin geometry along x.
pub const DOMAIN_X: (f64, f64) = (-3.0, 3.0);
/// Physical extent of the fin geometry along y.
pub const DOMAIN_Y: (f64, f64) = (0.0, 4.0);

#[derive(Debug, Error)]
pub enum SolveError {
  #[error("expected {expected} parameters, got {got}")]
  ParameterCount { expected: usize, got: usize },
  #[error("singular system: {detail}")]
  Singular { detail: String },
  #[error("solver misconfigured: {detail}")]
  Configuration { detail: String },
}

/// Resolution of the rectangular output grid over [`DOMAIN_X`] × [`DOMAIN_Y`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
  pub nx: usize,
  pub ny: usize,
}

impl GridSpec {
  pub fn new(nx: usize, ny: usize) -> Self {
    assert!(nx > 0 && ny > 0);
    Self { nx, ny }
  }

  pub fn x_coord(&self, i: usize) -> f64 {
    linspace(DOMAIN_X.0, DOMAIN_X.1, self.nx, i)
  }
  pub fn y_coord(&self, j: usize) -> f64 {
    linspace(DOMAIN_Y.0, DOMAIN_Y.1, self.ny, j)
  }
}

fn linspace(start: f64, end: f64, n: usize, i: usize) -> f64 {
  debug_assert!(i < n);
  if n == 1 {
    start
  } else {
    start + (end - start) * i as f64 / (n - 1) as f64
  }
}

pub struct ForwardSolver {
  data: FinFemData,
  triangulation: Triangulation,
  grid: Option<GridSpec>,
}

impl ForwardSolver {
  pub fn new(data: FinFemData, grid: Option<GridSpec>) -> Self {
    let triangulation = Triangulation::from_mesh(data.mesh());
    Self {
      data,
      triangulation,
      grid,
    }
  }

  pub fn from_dir(dir: impl AsRef<Path>, grid: Option<GridSpec>) -> Result<Self, DataLoadError> {
    Ok(Self::new(FinFemData::load(dir)?, grid))
  }

  /// Number of region matrices; every parameter vector must have this length.
  pub fn nparams(&self) -> usize {
    self.data.nregions()
  }
  pub fn nnodes(&self) -> usize {
    self.data.nnodes()
  }
  pub fn grid(&self) -> Option<&GridSpec> {
    self.grid.as_ref()
  }
  pub fn data(&self) -> &FinFemData {
    &self.data
  }
  pub fn triangulation(&self) -> &Triangulation {
    &self.triangulation
  }

  /// Assembles `Ah(θ) = Σ θ_q · Aq_q` as an unconsolidated triplet sum.
  pub fn assemble(&self, params: &[f64]) -> Result<SparseMatrix, SolveError> {
    if params.len() != self.nparams() {
      return Err(SolveError::ParameterCount {
        expected: self.nparams(),
        got: params.len(),
      });
    }
    let nnodes = self.nnodes();
    let mut system = SparseMatrix::zeros(nnodes, nnodes);
    for (&param, aq) in params.iter().zip(self.data.region_matrices()) {
      system.add_scaled(aq, param);
    }
    Ok(system)
  }

  /// Solves `Ah(θ) · uh = Fh` for the nodal temperature field.
  ///
  /// A parameter vector that decouples the mesh (zero or negative
  /// conductivities) surfaces as [`SolveError::Singular`]; the call is
  /// fatal and never retried here.
  pub fn solve_nodal(&self, params: &[f64]) -> Result<na::DVector<f64>, SolveError> {
    let system = self.assemble(params)?.to_nalgebra_csr();

    let lu = FaerLu::new(system).ok_or_else(|| SolveError::Singular {
      detail: format!("sparse LU factorization failed for params {params:?}"),
    })?;
    let uh = lu.solve(self.data.load_vector());

    if !uh.iter().all(|v| v.is_finite()) {
      return Err(SolveError::Singular {
        detail: format!("non-finite solution for params {params:?}"),
      });
    }
    Ok(uh)
  }

  /// Solves and evaluates the C1 cubic interpolant on the output grid.
  ///
  /// Entry `(i, j)` holds the field at `(x_i, y_j)`. Grid points outside
  /// the mesh hull take the fill value 0.0 by contract.
  pub fn solve_interpolated(&self, params: &[f64]) -> Result<na::DMatrix<f64>, SolveError> {
    let grid = self.grid.ok_or_else(|| SolveError::Configuration {
      detail: "output grid resolution not configured".into(),
    })?;

    let uh = self.solve_nodal(params)?;
    let interpolant = CubicInterpolant::new(&self.triangulation, &uh);

    let mut field = na::DMatrix::zeros(grid.nx, grid.ny);
    for i in 0..grid.nx {
      let x = grid.x_coord(i);
      for j in 0..grid.ny {
        let point = na::Vector2::new(x, grid.y_coord(j));
        field[(i, j)] = interpolant.eval(&point).unwrap_or(0.0);
      }
    }
    Ok(field)
  }

  /// Solves and samples the field at arbitrary sensor coordinates, with
  /// the same out-of-hull fill convention as [`Self::solve_interpolated`].
  pub fn solve_at_points(
    &self,
    params: &[f64],
    points: &[(f64, f64)],
  ) -> Result<Vec<f64>, SolveError> {
    let uh = self.solve_nodal(params)?;
    let interpolant = CubicInterpolant::new(&self.triangulation, &uh);
    Ok(
      points
        .iter()
        .map(|&(x, y)| {
          interpolant
            .eval(&na::Vector2::new(x, y))
            .unwrap_or(0.0)
        })
        .collect(),
    )
  }
}
