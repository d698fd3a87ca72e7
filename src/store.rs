//! FEM data store.
//!
//! The mesh, the region stiffness matrices and the load vector are
//! precomputed offline and shipped as plain tabular files. Everything here
//! is loaded once, validated, and owned immutably by the forward solver.
//!
//! Index tables are written 1-based by the exporting numeric environment
//! and converted to 0-based on load.

use crate::sparse::SparseMatrix;
use crate::NodeIdx;

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Newline-delimited load vector, one value per node.
pub const LOAD_VECTOR_FILE: &str = "Fh.csv";
/// Comma-delimited node coordinates, two columns, one row per node.
pub const COORDS_FILE: &str = "coor.csv";
/// Comma-delimited triangle table, three 1-based node indices per row.
pub const TRIANGLES_FILE: &str = "tri.csv";
/// Region stiffness matrices `Aq1.csv`, `Aq2.csv`, ... as tab-delimited
/// `(column, row, value)` triplets, 1-based.
pub const REGION_MATRIX_PREFIX: &str = "Aq";

#[derive(Debug, Error)]
pub enum DataLoadError {
  #[error("failed to read {file}: {source}")]
  Io {
    file: String,
    #[source]
    source: std::io::Error,
  },
  #[error("{file}:{line}: {detail}")]
  Parse {
    file: String,
    line: usize,
    detail: String,
  },
  #[error("{file}: {detail}")]
  Shape { file: String, detail: String },
  #[error("{file}:{line}: index 0 in 1-based input")]
  IndexBase { file: String, line: usize },
  #[error("{file}:{line}: index {index} exceeds node count {nodes}")]
  IndexRange {
    file: String,
    line: usize,
    index: usize,
    nodes: usize,
  },
  #[error("no region matrix files ({prefix}1.csv, ...) in {dir}")]
  NoRegionMatrices { dir: String, prefix: String },
}

#[derive(Debug, Clone)]
pub struct FinMesh {
  coords: Vec<na::Vector2<f64>>,
  triangles: Vec<[NodeIdx; 3]>,
}

impl FinMesh {
  pub fn new(coords: Vec<na::Vector2<f64>>, triangles: Vec<[NodeIdx; 3]>) -> Self {
    Self { coords, triangles }
  }

  pub fn nnodes(&self) -> usize {
    self.coords.len()
  }
  pub fn ntriangles(&self) -> usize {
    self.triangles.len()
  }
  pub fn coords(&self) -> &[na::Vector2<f64>] {
    &self.coords
  }
  pub fn triangles(&self) -> &[[NodeIdx; 3]] {
    &self.triangles
  }
}

/// The immutable per-process FEM data: `Q` region stiffness matrices, the
/// load vector and the mesh they discretize.
#[derive(Debug, Clone)]
pub struct FinFemData {
  region_matrices: Vec<SparseMatrix>,
  load_vector: na::DVector<f64>,
  mesh: FinMesh,
}

impl FinFemData {
  /// Assembles the store from already-parsed parts, running the same
  /// dimension checks as [`FinFemData::load`]. Used by tests and toy
  /// problems.
  pub fn new(
    region_matrices: Vec<SparseMatrix>,
    load_vector: na::DVector<f64>,
    mesh: FinMesh,
  ) -> Result<Self, DataLoadError> {
    let nnodes = load_vector.len();
    if mesh.nnodes() != nnodes {
      return Err(DataLoadError::Shape {
        file: COORDS_FILE.into(),
        detail: format!(
          "{} coordinate rows for a load vector of length {nnodes}",
          mesh.nnodes()
        ),
      });
    }
    if region_matrices.is_empty() {
      return Err(DataLoadError::NoRegionMatrices {
        dir: String::from("<memory>"),
        prefix: REGION_MATRIX_PREFIX.into(),
      });
    }
    for (q, aq) in region_matrices.iter().enumerate() {
      if aq.nrows() != nnodes || aq.ncols() != nnodes {
        return Err(DataLoadError::Shape {
          file: format!("{REGION_MATRIX_PREFIX}{}.csv", q + 1),
          detail: format!(
            "matrix is {}x{}, expected {nnodes}x{nnodes}",
            aq.nrows(),
            aq.ncols()
          ),
        });
      }
    }
    for (t, tri) in mesh.triangles().iter().enumerate() {
      if let Some(&bad) = tri.iter().find(|&&i| i >= nnodes) {
        return Err(DataLoadError::IndexRange {
          file: TRIANGLES_FILE.into(),
          line: t + 1,
          index: bad,
          nodes: nnodes,
        });
      }
    }
    Ok(Self {
      region_matrices,
      load_vector,
      mesh,
    })
  }

  /// Loads the store from a data directory.
  ///
  /// The load vector defines the node count; every other table is checked
  /// against it. The number of region matrices `Q` is discovered by probing
  /// `Aq1.csv`, `Aq2.csv`, ... upward.
  pub fn load(dir: impl AsRef<Path>) -> Result<Self, DataLoadError> {
    let dir = dir.as_ref();

    let load_vector = read_load_vector(&dir.join(LOAD_VECTOR_FILE))?;
    let nnodes = load_vector.len();

    let coords = read_coords(&dir.join(COORDS_FILE))?;
    let triangles = read_triangles(&dir.join(TRIANGLES_FILE), nnodes)?;
    let region_matrices = read_region_matrices(dir, nnodes)?;

    tracing::info!(
      nodes = nnodes,
      triangles = triangles.len(),
      regions = region_matrices.len(),
      "loaded FEM data store"
    );

    Self::new(region_matrices, load_vector, FinMesh::new(coords, triangles))
  }

  pub fn nnodes(&self) -> usize {
    self.load_vector.len()
  }
  pub fn nregions(&self) -> usize {
    self.region_matrices.len()
  }
  pub fn region_matrices(&self) -> &[SparseMatrix] {
    &self.region_matrices
  }
  pub fn load_vector(&self) -> &na::DVector<f64> {
    &self.load_vector
  }
  pub fn mesh(&self) -> &FinMesh {
    &self.mesh
  }
}

fn read_file(path: &Path) -> Result<String, DataLoadError> {
  fs::read_to_string(path).map_err(|source| DataLoadError::Io {
    file: path.display().to_string(),
    source,
  })
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

/// Non-empty lines with their 1-based line numbers.
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
  content
    .lines()
    .enumerate()
    .map(|(i, line)| (i + 1, line.trim()))
    .filter(|(_, line)| !line.is_empty())
}

fn parse_value(field: &str, file: &str, line: usize) -> Result<f64, DataLoadError> {
  field.parse::<f64>().map_err(|_| DataLoadError::Parse {
    file: file.into(),
    line,
    detail: format!("not a number: {field:?}"),
  })
}

/// Parses a 1-based index field and converts it to 0-based.
fn parse_index(
  field: &str,
  file: &str,
  line: usize,
  nodes: usize,
) -> Result<NodeIdx, DataLoadError> {
  let raw = parse_value(field, file, line)?;
  if raw.fract() != 0.0 || raw < 0.0 {
    return Err(DataLoadError::Parse {
      file: file.into(),
      line,
      detail: format!("not an index: {field:?}"),
    });
  }
  if raw == 0.0 {
    return Err(DataLoadError::IndexBase {
      file: file.into(),
      line,
    });
  }
  let index = raw as usize - 1;
  if index >= nodes {
    return Err(DataLoadError::IndexRange {
      file: file.into(),
      line,
      index,
      nodes,
    });
  }
  Ok(index)
}

fn read_load_vector(path: &Path) -> Result<na::DVector<f64>, DataLoadError> {
  let file = file_name(path);
  let content = read_file(path)?;
  let mut values = Vec::new();
  for (line, text) in data_lines(&content) {
    values.push(parse_value(text, &file, line)?);
  }
  if values.is_empty() {
    return Err(DataLoadError::Shape {
      file,
      detail: "empty load vector".into(),
    });
  }
  Ok(na::DVector::from_vec(values))
}

fn read_coords(path: &Path) -> Result<Vec<na::Vector2<f64>>, DataLoadError> {
  let file = file_name(path);
  let content = read_file(path)?;
  let mut coords = Vec::new();
  for (line, text) in data_lines(&content) {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() != 2 {
      return Err(DataLoadError::Parse {
        file,
        line,
        detail: format!("expected 2 columns, found {}", fields.len()),
      });
    }
    let x = parse_value(fields[0], &file, line)?;
    let y = parse_value(fields[1], &file, line)?;
    coords.push(na::Vector2::new(x, y));
  }
  Ok(coords)
}

fn read_triangles(path: &Path, nodes: usize) -> Result<Vec<[NodeIdx; 3]>, DataLoadError> {
  let file = file_name(path);
  let content = read_file(path)?;
  let mut triangles = Vec::new();
  for (line, text) in data_lines(&content) {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() != 3 {
      return Err(DataLoadError::Parse {
        file,
        line,
        detail: format!("expected 3 columns, found {}", fields.len()),
      });
    }
    let a = parse_index(fields[0], &file, line, nodes)?;
    let b = parse_index(fields[1], &file, line, nodes)?;
    let c = parse_index(fields[2], &file, line, nodes)?;
    triangles.push([a, b, c]);
  }
  Ok(triangles)
}

/// Triplets are written column-first: `(column, row, value)`.
fn read_region_matrix(path: &Path, nodes: usize) -> Result<SparseMatrix, DataLoadError> {
  let file = file_name(path);
  let content = read_file(path)?;
  let mut matrix = SparseMatrix::zeros(nodes, nodes);
  for (line, text) in data_lines(&content) {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 3 {
      return Err(DataLoadError::Parse {
        file,
        line,
        detail: format!("expected 3 columns, found {}", fields.len()),
      });
    }
    let col = parse_index(fields[0], &file, line, nodes)?;
    let row = parse_index(fields[1], &file, line, nodes)?;
    let value = parse_value(fields[2], &file, line)?;
    matrix.push(row, col, value);
  }
  Ok(matrix)
}

fn read_region_matrices(dir: &Path, nodes: usize) -> Result<Vec<SparseMatrix>, DataLoadError> {
  let mut matrices = Vec::new();
  for q in 1.. {
    let path = dir.join(format!("{REGION_MATRIX_PREFIX}{q}.csv"));
    if !path.exists() {
      break;
    }
    matrices.push(read_region_matrix(&path, nodes)?);
  }
  if matrices.is_empty() {
    return Err(DataLoadError::NoRegionMatrices {
      dir: dir.display().to_string(),
      prefix: REGION_MATRIX_PREFIX.into(),
    });
  }
  Ok(matrices)
}
