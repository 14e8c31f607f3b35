//! Core mesh data structures.
//!
//! A hemisphere mesh is a plain face-vertex list: [`SurfaceMesh`] owns the
//! coordinates and triangles, and [`AdjacencyGraph`] derives the
//! vertex-to-vertex relation used by smoothing.
//!
//! ```
//! use sulcus::mesh::{AdjacencyGraph, SurfaceMesh};
//! use nalgebra::Point3;
//!
//! let mesh = SurfaceMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 1.0, 0.0),
//!         Point3::new(0.5, 0.5, 1.0),
//!     ],
//!     vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
//! )
//! .unwrap();
//!
//! let adj = AdjacencyGraph::from_faces(mesh.faces(), mesh.num_vertices()).unwrap();
//! assert_eq!(adj.degree(0), 3);
//! ```

mod adjacency;
mod geometry;

pub use adjacency::{build_adjacency, AdjacencyGraph};
pub use geometry::{compute_normals, normalize_in_place, NormalMode, SurfaceMesh};
