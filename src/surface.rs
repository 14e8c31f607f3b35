//! Per-hemisphere surface state.
//!
//! A [`Surface`] is created once per loaded hemisphere and owns everything
//! derived from its geometry: normals, the adjacency graph, curvature shading,
//! label masks and a cache of smoothing operators.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use nalgebra::{Matrix4, Point3, Vector3};

use crate::algo::{Progress, SmoothingOperator};
use crate::error::{Result, SurfaceError};
use crate::mesh::{AdjacencyGraph, SurfaceMesh};

/// Which half of the cortex a surface represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// Left hemisphere (`lh`).
    Left,
    /// Right hemisphere (`rh`).
    Right,
}

impl Hemisphere {
    /// Short FreeSurfer-style name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Hemisphere::Left => "lh",
            Hemisphere::Right => "rh",
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hemisphere {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lh" => Ok(Hemisphere::Left),
            "rh" => Ok(Hemisphere::Right),
            _ => Err(SurfaceError::invalid_param(
                "hemi",
                s,
                "should be either \"lh\" or \"rh\"",
            )),
        }
    }
}

/// Unit of the vertex coordinates after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// Millimeters, the unit surfaces are stored in.
    #[default]
    Millimeters,
    /// Meters: coordinates are divided by 1000.
    Meters,
}

impl FromStr for Units {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mm" => Ok(Units::Millimeters),
            "m" => Ok(Units::Meters),
            _ => Err(SurfaceError::invalid_param("units", s, "should be \"m\" or \"mm\"")),
        }
    }
}

/// Options applied to coordinates when a surface is created.
#[derive(Debug, Clone, Default)]
pub struct SurfaceOptions {
    /// Coordinate units.
    pub units: Units,

    /// Align the medial wall with `x = -offset` (left) or `x = offset`
    /// (right) so two hemispheres do not overlap. `None` leaves coordinates
    /// untouched.
    pub offset: Option<f64>,
}

impl SurfaceOptions {
    /// Set the coordinate units.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Align the medial wall with the given offset.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Binarized curvature and the grey cortex shading derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureShading {
    binary: Vec<u8>,
    grey: Vec<[f64; 3]>,
}

impl CurvatureShading {
    /// Shade from raw curvature: gyri (`curv <= 0`) light, sulci (`curv > 0`) dark.
    pub fn from_curvature(curvature: &[f64]) -> Self {
        let binary: Vec<u8> = curvature.iter().map(|&c| u8::from(c > 0.0)).collect();
        let grey = binary
            .iter()
            .map(|&b| {
                let g = 0.5 - (b as f64 - 0.5) / 3.0;
                [g, g, g]
            })
            .collect();
        Self { binary, grey }
    }

    /// `1` where curvature is positive, else `0`.
    #[inline]
    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    /// Per-vertex grey RGB.
    #[inline]
    pub fn grey(&self) -> &[[f64; 3]] {
        &self.grey
    }
}

type CacheKey = (Vec<usize>, Option<usize>);

/// Append-only cache of smoothing operators for one adjacency graph.
///
/// Readers take a snapshot of the map; a writer copies the map, inserts and
/// swaps the snapshot in. Entries are never removed.
#[derive(Debug, Default)]
pub struct SmoothingCache {
    entries: RwLock<Arc<HashMap<CacheKey, Arc<SmoothingOperator>>>>,
}

impl SmoothingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached operators.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Return the cached operator for `(known_vertices, steps)`, building and
    /// inserting it if missing.
    pub fn get_or_build(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
        adjacency: &AdjacencyGraph,
    ) -> Result<Arc<SmoothingOperator>> {
        self.get_or_build_with_progress(known_vertices, steps, adjacency, &Progress::none())
    }

    /// Same as [`get_or_build`](Self::get_or_build), reporting build progress.
    pub fn get_or_build_with_progress(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
        adjacency: &AdjacencyGraph,
        progress: &Progress,
    ) -> Result<Arc<SmoothingOperator>> {
        let key: CacheKey = (known_vertices.to_vec(), steps);
        if let Some(op) = self.snapshot().get(&key) {
            tracing::info!(known = known_vertices.len(), ?steps, "smoothing cache hit");
            return Ok(Arc::clone(op));
        }

        let built = Arc::new(SmoothingOperator::build_with_progress(
            known_vertices,
            adjacency,
            steps,
            progress,
        )?);

        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = guard.get(&key) {
            // Another writer got there first.
            return Ok(Arc::clone(existing));
        }
        let mut next = HashMap::clone(&**guard);
        next.insert(key, Arc::clone(&built));
        *guard = Arc::new(next);
        Ok(built)
    }

    fn snapshot(&self) -> Arc<HashMap<CacheKey, Arc<SmoothingOperator>>> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }
}

/// A loaded hemisphere.
///
/// # Example
///
/// ```
/// use sulcus::surface::{Hemisphere, Surface, SurfaceOptions};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
///     Point3::new(0.5, 0.5, 1.0),
/// ];
/// let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
///
/// let surf = Surface::from_arrays(Hemisphere::Left, vertices, faces, &SurfaceOptions::default())
///     .unwrap();
/// assert_eq!(surf.num_vertices(), 4);
/// assert_eq!(surf.adjacency().num_edges(), 6);
/// ```
#[derive(Debug)]
pub struct Surface {
    hemi: Hemisphere,
    mesh: SurfaceMesh,
    normals: Vec<Vector3<f64>>,
    adjacency: AdjacencyGraph,
    smoothing: SmoothingCache,
    curvature: Option<CurvatureShading>,
    labels: HashMap<String, Vec<u8>>,
}

impl Surface {
    /// Create a surface from a mesh, applying unit conversion and offset.
    pub fn new(hemi: Hemisphere, mut mesh: SurfaceMesh, options: &SurfaceOptions) -> Result<Self> {
        if options.units == Units::Meters {
            for p in mesh.vertices_mut() {
                *p /= 1000.0;
            }
        }
        if let Some(offset) = options.offset {
            align_medial_wall(mesh.vertices_mut(), hemi, offset);
        }

        let adjacency = AdjacencyGraph::from_faces(mesh.faces(), mesh.num_vertices())?;
        let normals = mesh.normals();
        tracing::debug!(
            %hemi,
            vertices = mesh.num_vertices(),
            faces = mesh.num_faces(),
            edges = adjacency.num_edges(),
            "surface loaded"
        );

        Ok(Self {
            hemi,
            mesh,
            normals,
            adjacency,
            smoothing: SmoothingCache::new(),
            curvature: None,
            labels: HashMap::new(),
        })
    }

    /// Create a surface from raw vertex and face arrays.
    pub fn from_arrays(
        hemi: Hemisphere,
        vertices: Vec<Point3<f64>>,
        faces: Vec<[usize; 3]>,
        options: &SurfaceOptions,
    ) -> Result<Self> {
        Self::new(hemi, SurfaceMesh::new(vertices, faces)?, options)
    }

    /// The hemisphere.
    #[inline]
    pub fn hemi(&self) -> Hemisphere {
        self.hemi
    }

    /// The mesh.
    #[inline]
    pub fn mesh(&self) -> &SurfaceMesh {
        &self.mesh
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.mesh.num_vertices()
    }

    /// Per-vertex normals, kept in sync with the coordinates.
    #[inline]
    pub fn normals(&self) -> &[Vector3<f64>] {
        &self.normals
    }

    /// Vertex adjacency.
    #[inline]
    pub fn adjacency(&self) -> &AdjacencyGraph {
        &self.adjacency
    }

    /// The smoothing operator cache.
    #[inline]
    pub fn smoothing_cache(&self) -> &SmoothingCache {
        &self.smoothing
    }

    /// Cached smoothing operator for data on `known_vertices`.
    pub fn smoothing_operator(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
    ) -> Result<Arc<SmoothingOperator>> {
        self.smoothing.get_or_build(known_vertices, steps, &self.adjacency)
    }

    /// Same as [`smoothing_operator`](Self::smoothing_operator), reporting
    /// build progress on a cache miss.
    pub fn smoothing_operator_with_progress(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
        progress: &Progress,
    ) -> Result<Arc<SmoothingOperator>> {
        self.smoothing
            .get_or_build_with_progress(known_vertices, steps, &self.adjacency, progress)
    }

    /// Apply an affine transform to the coordinates and recompute normals.
    ///
    /// Topology is unchanged, so cached smoothing operators stay valid.
    pub fn apply_transform(&mut self, transform: &Matrix4<f64>) {
        for p in self.mesh.vertices_mut() {
            *p = transform.transform_point(p);
        }
        self.normals = self.mesh.normals();
    }

    /// Store curvature-derived shading.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::LengthMismatch`] unless there is one value per vertex.
    pub fn set_curvature(&mut self, curvature: &[f64]) -> Result<&CurvatureShading> {
        if curvature.len() != self.num_vertices() {
            return Err(SurfaceError::LengthMismatch {
                what: "curvature",
                expected: self.num_vertices(),
                actual: curvature.len(),
            });
        }
        Ok(self.curvature.insert(CurvatureShading::from_curvature(curvature)))
    }

    /// Curvature shading, if curvature has been set.
    #[inline]
    pub fn curvature(&self) -> Option<&CurvatureShading> {
        self.curvature.as_ref()
    }

    /// Store a named label given by its vertex indices.
    pub fn add_label(&mut self, name: impl Into<String>, vertices: &[usize]) -> Result<&[u8]> {
        let mask = label_mask(vertices, self.num_vertices())?;
        let name = name.into();
        self.labels.insert(name.clone(), mask);
        Ok(self.labels.get(&name).map(Vec::as_slice).unwrap_or_default())
    }

    /// A label mask stored with [`add_label`](Self::add_label).
    pub fn label(&self, name: &str) -> Option<&[u8]> {
        self.labels.get(name).map(Vec::as_slice)
    }
}

/// Convert label vertex indices into a 0/1 mask over `vertex_count` vertices.
pub fn label_mask(vertices: &[usize], vertex_count: usize) -> Result<Vec<u8>> {
    let mut mask = vec![0u8; vertex_count];
    for &v in vertices {
        if v >= vertex_count {
            return Err(SurfaceError::InvalidVertex {
                index: v,
                vertex_count,
            });
        }
        mask[v] = 1;
    }
    Ok(mask)
}

fn align_medial_wall(vertices: &mut [Point3<f64>], hemi: Hemisphere, offset: f64) {
    let xs = vertices.iter().map(|p| p.x);
    let shift = match hemi {
        Hemisphere::Left => xs.fold(f64::NEG_INFINITY, f64::max) + offset,
        Hemisphere::Right => xs.fold(f64::INFINITY, f64::min) + offset,
    };
    for p in vertices.iter_mut() {
        p.x -= shift;
    }
}
