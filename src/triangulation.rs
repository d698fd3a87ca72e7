//! Triangulation descriptor and field interpolation.
//!
//! The mesh triangulation is fixed for the lifetime of a solver, so point
//! location data and interpolant control nets are built once per field and
//! queried many times (every grid point or sensor location).
//!
//! Two interpolants are provided. [`LinearInterpolant`] evaluates the
//! barycentric (P1) field. [`CubicInterpolant`] is a C1 cubic on the
//! reduced Hsieh-Clough-Tocher element: each triangle is split at its
//! centroid into three cubic Bézier patches, joined C1 across the internal
//! edges, with the transversal derivative along each outer edge constrained
//! to vary linearly. Both reproduce nodal values exactly at the nodes.

use crate::store::FinMesh;
use crate::{NodeIdx, TriangleIdx};

/// Barycentric slack accepted by point location. Points on edges or nodes
/// resolve to the first triangle in mesh order that contains them.
const BARY_TOL: f64 = 1e-10;

/// Degenerate-triangle cutoff on the doubled signed area.
const DEGENERATE_AREA: f64 = 1e-14;

fn cross(a: &na::Vector2<f64>, b: &na::Vector2<f64>) -> f64 {
  a.x * b.y - a.y * b.x
}

#[derive(Debug, Clone)]
pub struct Triangulation {
  coords: Vec<na::Vector2<f64>>,
  triangles: Vec<[NodeIdx; 3]>,
}

impl Triangulation {
  pub fn from_mesh(mesh: &FinMesh) -> Self {
    Self {
      coords: mesh.coords().to_vec(),
      triangles: mesh.triangles().to_vec(),
    }
  }

  pub fn nnodes(&self) -> usize {
    self.coords.len()
  }
  pub fn ntriangles(&self) -> usize {
    self.triangles.len()
  }

  pub fn corners(&self, itri: TriangleIdx) -> [na::Vector2<f64>; 3] {
    self.triangles[itri].map(|i| self.coords[i])
  }

  /// Finds a triangle containing the point together with its barycentric
  /// coordinates. `None` when the point lies outside every triangle, i.e.
  /// outside the mesh hull.
  pub fn locate(&self, point: &na::Vector2<f64>) -> Option<(TriangleIdx, [f64; 3])> {
    for itri in 0..self.triangles.len() {
      let [a, b, c] = self.corners(itri);
      let det = cross(&(b - a), &(c - a));
      if det.abs() < DEGENERATE_AREA {
        continue;
      }
      let l1 = cross(&(point - a), &(c - a)) / det;
      let l2 = cross(&(b - a), &(point - a)) / det;
      let l0 = 1.0 - l1 - l2;
      if l0 >= -BARY_TOL && l1 >= -BARY_TOL && l2 >= -BARY_TOL {
        return Some((itri, [l0, l1, l2]));
      }
    }
    None
  }

  /// Per-node field gradients, estimated as the area-weighted average of
  /// the plane gradients of the incident triangles.
  pub fn node_gradients(&self, values: &na::DVector<f64>) -> Vec<na::Vector2<f64>> {
    assert_eq!(values.len(), self.nnodes());

    let mut gradients = vec![na::Vector2::zeros(); self.nnodes()];
    let mut weights = vec![0.0; self.nnodes()];

    for tri in &self.triangles {
      let [a, b, c] = tri.map(|i| self.coords[i]);
      let det = cross(&(b - a), &(c - a));
      if det.abs() < DEGENERATE_AREA {
        continue;
      }
      let d1 = values[tri[1]] - values[tri[0]];
      let d2 = values[tri[2]] - values[tri[0]];
      let grad = na::Vector2::new(
        (d1 * (c.y - a.y) - d2 * (b.y - a.y)) / det,
        ((b.x - a.x) * d2 - (c.x - a.x) * d1) / det,
      );

      let weight = det.abs() / 2.0;
      for &inode in tri {
        gradients[inode] += weight * grad;
        weights[inode] += weight;
      }
    }

    for (gradient, weight) in gradients.iter_mut().zip(&weights) {
      if *weight > 0.0 {
        *gradient /= *weight;
      }
    }
    gradients
  }
}

/// Barycentric evaluation of the nodal field.
pub struct LinearInterpolant<'a> {
  triangulation: &'a Triangulation,
  values: &'a na::DVector<f64>,
}

impl<'a> LinearInterpolant<'a> {
  pub fn new(triangulation: &'a Triangulation, values: &'a na::DVector<f64>) -> Self {
    assert_eq!(values.len(), triangulation.nnodes());
    Self {
      triangulation,
      values,
    }
  }

  pub fn eval(&self, point: &na::Vector2<f64>) -> Option<f64> {
    let (itri, bary) = self.triangulation.locate(point)?;
    let nodes = self.triangulation.triangles[itri];
    Some(
      bary[0] * self.values[nodes[0]]
        + bary[1] * self.values[nodes[1]]
        + bary[2] * self.values[nodes[2]],
    )
  }
}

/// Bézier control net of one macro triangle on the centroid split.
///
/// Four-digit labels are Bernstein indices over (vertex 1, vertex 2,
/// vertex 3, centroid); each of the three sub-patches uses the ten points
/// whose index for the opposite vertex is zero.
#[derive(Debug, Clone, Copy)]
struct HctPatch {
  c3000: f64,
  c0300: f64,
  c0030: f64,
  c0003: f64,
  c2100: f64,
  c1200: f64,
  c0210: f64,
  c0120: f64,
  c2010: f64,
  c1020: f64,
  c2001: f64,
  c0201: f64,
  c0021: f64,
  c1002: f64,
  c0102: f64,
  c0012: f64,
  c1101: f64,
  c0111: f64,
  c1011: f64,
}

/// Interior control point of the sub-patch over edge (a, b), from the
/// condition that the derivative transversal to the edge varies linearly
/// along it. `ca/cab/cba/cb` are the outer-edge control points, `cas/cbs`
/// the internal-edge points adjacent to the corners.
#[allow(clippy::too_many_arguments)]
fn edge_interior(
  a: na::Vector2<f64>,
  b: na::Vector2<f64>,
  s: na::Vector2<f64>,
  ca: f64,
  cab: f64,
  cba: f64,
  cb: f64,
  cas: f64,
  cbs: f64,
) -> f64 {
  let u = b - a;
  let v = s - a;
  let w = na::Vector2::new(-u.y, u.x);

  // w in directional barycentric coordinates of (a, b, s).
  let det = cross(&u, &v);
  let alpha_b = cross(&w, &v) / det;
  let alpha_s = cross(&u, &w) / det;
  let alpha_a = -alpha_b - alpha_s;

  let q0 = alpha_a * ca + alpha_b * cab + alpha_s * cas;
  let q2 = alpha_a * cba + alpha_b * cb + alpha_s * cbs;

  ((q0 + q2) / 2.0 - alpha_a * cab - alpha_b * cba) / alpha_s
}

fn build_patch(p: [na::Vector2<f64>; 3], f: [f64; 3], g: [na::Vector2<f64>; 3]) -> HctPatch {
  let s = (p[0] + p[1] + p[2]) / 3.0;

  let c3000 = f[0];
  let c0300 = f[1];
  let c0030 = f[2];

  let c2100 = f[0] + g[0].dot(&(p[1] - p[0])) / 3.0;
  let c2010 = f[0] + g[0].dot(&(p[2] - p[0])) / 3.0;
  let c1200 = f[1] + g[1].dot(&(p[0] - p[1])) / 3.0;
  let c0210 = f[1] + g[1].dot(&(p[2] - p[1])) / 3.0;
  let c0120 = f[2] + g[2].dot(&(p[1] - p[2])) / 3.0;
  let c1020 = f[2] + g[2].dot(&(p[0] - p[2])) / 3.0;

  // Corner-adjacent internal-edge points; the centroid split makes these
  // the plain averages of the corner's control triangle.
  let c2001 = (c3000 + c2100 + c2010) / 3.0;
  let c0201 = (c0300 + c1200 + c0210) / 3.0;
  let c0021 = (c0030 + c1020 + c0120) / 3.0;

  let c1101 = edge_interior(p[0], p[1], s, c3000, c2100, c1200, c0300, c2001, c0201);
  let c0111 = edge_interior(p[1], p[2], s, c0300, c0210, c0120, c0030, c0201, c0021);
  let c1011 = edge_interior(p[2], p[0], s, c0030, c1020, c2010, c3000, c0021, c2001);

  // C1 joins across the internal edges fix the remaining net.
  let c1002 = (c1101 + c1011 + c2001) / 3.0;
  let c0102 = (c1101 + c0111 + c0201) / 3.0;
  let c0012 = (c0111 + c1011 + c0021) / 3.0;
  let c0003 = (c1002 + c0102 + c0012) / 3.0;

  HctPatch {
    c3000,
    c0300,
    c0030,
    c0003,
    c2100,
    c1200,
    c0210,
    c0120,
    c2010,
    c1020,
    c2001,
    c0201,
    c0021,
    c1002,
    c0102,
    c0012,
    c1101,
    c0111,
    c1011,
  }
}

#[allow(clippy::too_many_arguments)]
fn bernstein3(
  u: f64,
  v: f64,
  w: f64,
  b300: f64,
  b210: f64,
  b120: f64,
  b030: f64,
  b201: f64,
  b111: f64,
  b021: f64,
  b102: f64,
  b012: f64,
  b003: f64,
) -> f64 {
  u * u * u * b300
    + 3.0 * u * u * v * b210
    + 3.0 * u * v * v * b120
    + v * v * v * b030
    + 3.0 * u * u * w * b201
    + 6.0 * u * v * w * b111
    + 3.0 * v * v * w * b021
    + 3.0 * u * w * w * b102
    + 3.0 * v * w * w * b012
    + w * w * w * b003
}

impl HctPatch {
  /// Evaluates at macro barycentric coordinates. The smallest coordinate
  /// selects the sub-patch; its local coordinates follow from the centroid
  /// having macro coordinates (1/3, 1/3, 1/3).
  fn eval(&self, bary: [f64; 3]) -> f64 {
    let [b1, b2, b3] = bary;
    if b3 <= b1 && b3 <= b2 {
      let (u, v, w) = (b1 - b3, b2 - b3, 3.0 * b3);
      bernstein3(
        u,
        v,
        w,
        self.c3000,
        self.c2100,
        self.c1200,
        self.c0300,
        self.c2001,
        self.c1101,
        self.c0201,
        self.c1002,
        self.c0102,
        self.c0003,
      )
    } else if b1 <= b2 && b1 <= b3 {
      let (u, v, w) = (b2 - b1, b3 - b1, 3.0 * b1);
      bernstein3(
        u,
        v,
        w,
        self.c0300,
        self.c0210,
        self.c0120,
        self.c0030,
        self.c0201,
        self.c0111,
        self.c0021,
        self.c0102,
        self.c0012,
        self.c0003,
      )
    } else {
      let (u, v, w) = (b3 - b2, b1 - b2, 3.0 * b2);
      bernstein3(
        u,
        v,
        w,
        self.c0030,
        self.c1020,
        self.c2010,
        self.c3000,
        self.c0021,
        self.c1011,
        self.c2001,
        self.c0012,
        self.c1002,
        self.c0003,
      )
    }
  }
}

/// C1 cubic interpolant of a nodal field over the triangulation.
pub struct CubicInterpolant<'a> {
  triangulation: &'a Triangulation,
  patches: Vec<HctPatch>,
}

impl<'a> CubicInterpolant<'a> {
  pub fn new(triangulation: &'a Triangulation, values: &na::DVector<f64>) -> Self {
    assert_eq!(values.len(), triangulation.nnodes());
    let gradients = triangulation.node_gradients(values);

    let patches = triangulation
      .triangles
      .iter()
      .map(|tri| {
        build_patch(
          tri.map(|i| triangulation.coords[i]),
          tri.map(|i| values[i]),
          tri.map(|i| gradients[i]),
        )
      })
      .collect();

    Self {
      triangulation,
      patches,
    }
  }

  /// `None` outside the mesh hull.
  pub fn eval(&self, point: &na::Vector2<f64>) -> Option<f64> {
    let (itri, bary) = self.triangulation.locate(point)?;
    Some(self.patches[itri].eval(bary))
  }
}
