//! Sparse direct solve and conversions between nalgebra and faer.

use faer::linalg::solvers::Solve;

type SparseMatrixFaer = faer::sparse::SparseRowMat<usize, f64>;

pub fn nalgebra2faer(m: nas::CsrMatrix<f64>) -> SparseMatrixFaer {
  let nrows = m.nrows();
  let ncols = m.ncols();
  let (row_offsets, col_indices, values) = m.disassemble();

  let symbolic =
    faer::sparse::SymbolicSparseRowMat::new_checked(nrows, ncols, row_offsets, None, col_indices);
  faer::sparse::SparseRowMat::new(symbolic, values)
}

pub struct FaerLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}
impl FaerLu {
  /// Sparse LU factorization. `None` when faer fails to factorize, which
  /// for the systems assembled here means a singular operator.
  pub fn new(a: nas::CsrMatrix<f64>) -> Option<Self> {
    let raw = nalgebra2faer(a).sp_lu().ok()?;
    Some(Self { raw })
  }

  pub fn solve(&self, b: &na::DVector<f64>) -> na::DVector<f64> {
    let b = faer::Col::from_fn(b.nrows(), |i| b[i]);
    let x = self.raw.solve(b);
    na::DVector::from_iterator(x.nrows(), x.iter().copied())
  }
}

/// Elementwise comparison with an absolute tolerance, for tests.
pub fn assert_vec_eq(a: &na::DVector<f64>, b: &na::DVector<f64>, eps: Option<f64>) {
  assert_eq!(a.len(), b.len());
  let eps = eps.unwrap_or(1e-9);
  for i in 0..a.len() {
    approx::assert_abs_diff_eq!(a[i], b[i], epsilon = eps);
  }
}
