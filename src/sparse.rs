//! Triplet-based sparse matrix builder.
//!
//! The parametrized system matrix is a weighted sum of the region stiffness
//! matrices. Accumulation happens on triplet lists; duplicates are
//! consolidated once, on conversion to CSR, right before factorization.

use itertools::Itertools;

#[derive(Default, Debug, Clone)]
pub struct SparseMatrix {
  nrows: usize,
  ncols: usize,
  triplets: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
  pub fn zeros(nrows: usize, ncols: usize) -> Self {
    Self::new(nrows, ncols, Vec::new())
  }
  pub fn new(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
    Self {
      nrows,
      ncols,
      triplets,
    }
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn nnz(&self) -> usize {
    self.triplets.len()
  }
  pub fn triplets(&self) -> &[(usize, usize, f64)] {
    &self.triplets
  }

  pub fn into_parts(self) -> (usize, usize, Vec<(usize, usize, f64)>) {
    (self.nrows, self.ncols, self.triplets)
  }

  pub fn push(&mut self, r: usize, c: usize, v: f64) {
    assert!(r < self.nrows && c < self.ncols);
    if v != 0.0 {
      self.triplets.push((r, c, v));
    }
  }

  /// Accumulates `coeff * other` into `self` without consolidating.
  pub fn add_scaled(&mut self, other: &SparseMatrix, coeff: f64) {
    assert!(self.nrows == other.nrows && self.ncols == other.ncols);
    if coeff == 0.0 {
      return;
    }
    self
      .triplets
      .extend(other.triplets.iter().map(|&(r, c, v)| (r, c, coeff * v)));
  }

  pub fn to_nalgebra_coo(&self) -> nas::CooMatrix<f64> {
    let (rows, cols, vals) = self.triplets.iter().copied().multiunzip();
    nas::CooMatrix::try_from_triplets(self.nrows, self.ncols, rows, cols, vals).unwrap()
  }

  /// Consolidating conversion: duplicate triplets are summed.
  pub fn to_nalgebra_csr(&self) -> nas::CsrMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }

  pub fn to_nalgebra_dense(&self) -> na::DMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }
}
