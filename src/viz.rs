//! Field export for external visualization.
//!
//! Stateless pass-throughs: a grid field goes out as `x y value` rows, a
//! nodal field as an OBJ surface with the temperature as height, viewable
//! in any mesh tool.

use crate::solver::GridSpec;
use crate::store::FinMesh;

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

pub fn save_grid_field_to_file(
  field: &na::DMatrix<f64>,
  grid: &GridSpec,
  path: impl AsRef<Path>,
) -> std::io::Result<()> {
  let file = File::create(path)?;
  let writer = BufWriter::new(file);
  write_grid_field(writer, field, grid)
}

pub fn write_grid_field<W: Write>(
  mut writer: W,
  field: &na::DMatrix<f64>,
  grid: &GridSpec,
) -> std::io::Result<()> {
  assert_eq!(field.shape(), (grid.nx, grid.ny));
  for i in 0..grid.nx {
    for j in 0..grid.ny {
      writeln!(
        writer,
        "{:.6} {:.6} {:.6}",
        grid.x_coord(i),
        grid.y_coord(j),
        field[(i, j)]
      )?;
    }
  }
  Ok(())
}

pub fn save_nodal_field_to_file(
  field: &na::DVector<f64>,
  mesh: &FinMesh,
  path: impl AsRef<Path>,
) -> std::io::Result<()> {
  let file = File::create(path)?;
  let writer = BufWriter::new(file);
  write_nodal_field(writer, field, mesh)
}

pub fn write_nodal_field<W: Write>(
  mut writer: W,
  field: &na::DVector<f64>,
  mesh: &FinMesh,
) -> std::io::Result<()> {
  assert_eq!(field.len(), mesh.nnodes());
  for (coord, &value) in mesh.coords().iter().zip(field.iter()) {
    writeln!(writer, "v {:.6} {:.6} {:.6}", coord.x, coord.y, value)?;
  }
  for tri in mesh.triangles() {
    // .obj uses 1-indexing.
    writeln!(writer, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1)?;
  }
  Ok(())
}
