extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod linalg;
pub mod model;
pub mod sample;
pub mod solver;
pub mod sparse;
pub mod store;
pub mod triangulation;
pub mod viz;

pub type NodeIdx = usize;
pub type TriangleIdx = usize;
