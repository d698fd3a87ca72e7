//! Grid interpolation properties: hull fill, nodal round-trip, linear
//! precision of the cubic element.

extern crate nalgebra as na;

use approx::assert_abs_diff_eq;

use thermofin::solver::{ForwardSolver, GridSpec};
use thermofin::sparse::SparseMatrix;
use thermofin::store::{FinFemData, FinMesh};

/// Unit-square mesh sitting inside the fixed physical domain, with an
/// identity operator so the nodal solution equals the load vector.
fn identity_solver(fh: Vec<f64>, grid: Option<GridSpec>) -> ForwardSolver {
  let coords = vec![
    na::Vector2::new(0.0, 0.0),
    na::Vector2::new(1.0, 0.0),
    na::Vector2::new(1.0, 1.0),
    na::Vector2::new(0.0, 1.0),
  ];
  let mesh = FinMesh::new(coords, vec![[0, 1, 2], [0, 2, 3]]);
  let eye = SparseMatrix::new(4, 4, (0..4).map(|i| (i, i, 1.0)).collect());
  let zero = SparseMatrix::zeros(4, 4);
  let data = FinFemData::new(vec![eye, zero], na::DVector::from_vec(fh), mesh).unwrap();
  ForwardSolver::new(data, grid)
}

// Nodal values of 1 + 2x + 3y on the unit square corners.
const LINEAR_FIELD: [f64; 4] = [1.0, 3.0, 6.0, 4.0];

#[test]
fn grid_has_requested_shape() {
  let solver = identity_solver(LINEAR_FIELD.to_vec(), Some(GridSpec::new(7, 5)));
  let field = solver.solve_interpolated(&[1.0, 0.0]).unwrap();
  assert_eq!(field.shape(), (7, 5));
}

#[test]
fn points_outside_hull_are_filled_with_zero() {
  let solver = identity_solver(LINEAR_FIELD.to_vec(), Some(GridSpec::new(7, 5)));
  let field = solver.solve_interpolated(&[1.0, 0.0]).unwrap();

  // Grid x values are -3..3 step 1, y values 0..4 step 1; the mesh only
  // covers [0,1]^2, so e.g. the whole x = -3 column lies outside.
  for j in 0..5 {
    assert_eq!(field[(0, j)], 0.0);
    assert_eq!(field[(6, j)], 0.0);
  }
  for i in 0..7 {
    assert_eq!(field[(i, 4)], 0.0);
  }
}

#[test]
fn interior_grid_points_reproduce_linear_field() {
  let solver = identity_solver(LINEAR_FIELD.to_vec(), Some(GridSpec::new(7, 5)));
  let field = solver.solve_interpolated(&[1.0, 0.0]).unwrap();

  // Grid points landing on mesh nodes: (x=0,y=0), (x=1,y=0), (x=1,y=1), (x=0,y=1).
  assert_abs_diff_eq!(field[(3, 0)], 1.0, epsilon = 1e-9); // x = 0, y = 0
  assert_abs_diff_eq!(field[(4, 0)], 3.0, epsilon = 1e-9); // x = 1, y = 0
  assert_abs_diff_eq!(field[(4, 1)], 6.0, epsilon = 1e-9); // x = 1, y = 1
  assert_abs_diff_eq!(field[(3, 1)], 4.0, epsilon = 1e-9); // x = 0, y = 1
}

#[test]
fn sensor_points_interpolate_and_fill() {
  let solver = identity_solver(LINEAR_FIELD.to_vec(), None);
  let values = solver
    .solve_at_points(&[1.0, 0.0], &[(0.5, 0.5), (0.25, 0.5), (-2.0, 3.5)])
    .unwrap();

  assert_abs_diff_eq!(values[0], 1.0 + 2.0 * 0.5 + 3.0 * 0.5, epsilon = 1e-9);
  assert_abs_diff_eq!(values[1], 1.0 + 2.0 * 0.25 + 3.0 * 0.5, epsilon = 1e-9);
  assert_eq!(values[2], 0.0);
}

#[test]
fn nodal_round_trip_at_node_locations() {
  // Non-linear nodal data; the interpolant must still hit the nodal
  // values exactly at the nodes.
  let fh = vec![0.3, -1.2, 2.7, 0.9];
  let solver = identity_solver(fh.clone(), None);
  let nodes = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
  let values = solver.solve_at_points(&[1.0, 0.0], &nodes).unwrap();
  for (&value, &expected) in values.iter().zip(&fh) {
    assert_abs_diff_eq!(value, expected, epsilon = 1e-9);
  }
}
