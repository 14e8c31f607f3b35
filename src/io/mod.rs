//! File I/O at the edges of the pipeline.
//!
//! | Module | Load | Save | Contents |
//! |--------|------|------|----------|
//! | [`ply`] | ✓ | ✓ | Geometry in, colored geometry out |
//! | [`text`] | ✓ | ✗ | Per-vertex values and vertex index lists |
//!
//! # Usage
//!
//! ```no_run
//! use sulcus::io::{ply, text};
//! use sulcus::overlay::{map_scalars, OverlayOptions};
//! use sulcus::mesh::AdjacencyGraph;
//!
//! let mesh = ply::load_geometry("lh.inflated.ply").unwrap();
//! let values = text::load_values("lh.stc.txt").unwrap();
//! let vertices = text::load_indices("lh.vertno.txt").unwrap();
//!
//! let adj = AdjacencyGraph::from_faces(mesh.faces(), mesh.num_vertices()).unwrap();
//! let overlay = map_scalars(&adj, &values, Some(&vertices), &OverlayOptions::default()).unwrap();
//!
//! ply::save_colored(&mesh, &overlay.colors_rgba8(), "lh.colored.ply").unwrap();
//! ```

pub mod ply;
pub mod text;
