//! # Sulcus
//!
//! Per-vertex coloring of cortical surface meshes.
//!
//! Sulcus takes a triangulated hemisphere and a scalar field defined on some
//! or all of its vertices, and produces the per-vertex RGBA colors a renderer
//! needs. The field is smoothed over the mesh when it only covers a subset of
//! vertices, rescaled against colormap limits and evaluated through a lookup
//! table.
//!
//! ## Features
//!
//! - **Geometry**: area-weighted vertex normals, vertex adjacency in CSR form
//! - **Smoothing**: iterative neighbor averaging composed into one sparse operator
//! - **Colormaps**: named ramps, color lists and raw tables with fmin/fmid/fmax
//!   limits, sequential or divergent around a center
//! - **Surfaces**: per-hemisphere state with unit conversion, affine
//!   transforms, curvature shading, labels and an operator cache
//! - **I/O**: PLY geometry in, colored PLY out
//!
//! ## Quick Start
//!
//! ```
//! use sulcus::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![
//!     [0, 2, 1], // bottom
//!     [0, 1, 3], // front
//!     [1, 2, 3], // right
//!     [2, 0, 3], // left
//! ];
//!
//! let surf = Surface::from_arrays(Hemisphere::Left, vertices, faces, &SurfaceOptions::default())
//!     .unwrap();
//!
//! // Data known on one vertex, spread until the whole mesh is covered.
//! let options = OverlayOptions::default()
//!     .with_full_coverage()
//!     .with_limits(0.0, 1.0, 2.0);
//! let overlay = map_scalars(&surf, &[2.0], Some(&[3]), &options).unwrap();
//!
//! assert_eq!(overlay.values(), &[2.0, 2.0, 2.0, 2.0]);
//! assert_eq!(overlay.colors().len(), surf.num_vertices());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod color;
pub mod error;
pub mod io;
pub mod mesh;
pub mod overlay;
pub mod surface;

/// Prelude module for convenient imports.
///
/// ```
/// use sulcus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::SmoothingOperator;
    pub use crate::color::{ColorLookupTable, Colormap, LutParams, NamedRamp, Rgba};
    pub use crate::error::{Result, SurfaceError};
    pub use crate::mesh::{AdjacencyGraph, NormalMode, SurfaceMesh};
    pub use crate::overlay::{map_scalars, map_time_course, Overlay, OverlayOptions};
    pub use crate::surface::{Hemisphere, Surface, SurfaceOptions, Units};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{DMatrix, Point3};

    /// A 3 x 3 vertex grid in the z = 0 plane.
    fn grid() -> Surface {
        let mut vertices = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        for j in 0..2 {
            for i in 0..2 {
                let v = j * 3 + i;
                faces.push([v, v + 1, v + 4]);
                faces.push([v, v + 4, v + 3]);
            }
        }
        Surface::from_arrays(Hemisphere::Right, vertices, faces, &SurfaceOptions::default())
            .unwrap()
    }

    #[test]
    fn test_pipeline() {
        let surf = grid();
        assert_eq!(surf.num_vertices(), 9);
        // Flat, consistently wound grid: every normal points along +z.
        for n in surf.normals() {
            assert!(n.x.abs() < 1e-12 && n.y.abs() < 1e-12 && n.z > 0.0);
        }

        // Two corners off the diagonal; the center is two steps away from both.
        let known = [2, 6];
        let data = DMatrix::from_row_slice(2, 2, &[
            1.0, -1.0, //
            2.0, -2.0,
        ]);
        let options = OverlayOptions::default()
            .with_center(0.0)
            .with_smoothing_steps(1)
            .with_time_index(1);
        let overlay = map_time_course(&surf, &data, None, Some(&known), &options).unwrap();

        // One step reaches the edge midpoints only.
        let op = overlay.operator().unwrap();
        assert_eq!(op.num_reached(), 6);
        assert!(!op.is_reached(4));
        assert_eq!(overlay.values()[4], 0.0);
        assert_eq!(overlay.values()[1], -1.0);
        assert_eq!(overlay.values()[7], -2.0);

        // Centered defaults over the whole time course.
        assert_eq!(overlay.limits(), (0.0, 1.0, 2.0));
        // The center vertex sits at the middle of the divergent table.
        assert!((overlay.normalized()[4] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_colored_ply_output() {
        let surf = grid();
        let values: Vec<f64> = (0..9).map(|v| v as f64).collect();
        let overlay = map_scalars(&surf, &values, None, &OverlayOptions::default()).unwrap();

        let mut buf = Vec::new();
        crate::io::ply::write_colored(&mut buf, surf.mesh(), &overlay.colors_rgba8()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("ply\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("3 ")).count(), 8);
    }
}
