//! Triangle mesh geometry and per-vertex normals.

use nalgebra::{Point3, Vector3};

use crate::error::{Result, SurfaceError};

/// How per-vertex normals are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalMode {
    /// Sum of the area-weighted face normals divided by the number of faces
    /// touching the vertex. Vectors are not rescaled to unit length.
    #[default]
    FaceAverage,
    /// [`NormalMode::FaceAverage`] rescaled to unit length. Zero vectors stay zero.
    Unit,
}

/// A triangle mesh: vertex coordinates plus triangle indices.
///
/// The mesh need not be manifold. Construction guarantees at least three
/// vertices and that every face index is in range.
///
/// # Example
///
/// ```
/// use sulcus::mesh::SurfaceMesh;
/// use nalgebra::Point3;
///
/// let mesh = SurfaceMesh::new(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// )
/// .unwrap();
///
/// let normals = mesh.normals();
/// assert_eq!(normals.len(), 3);
/// assert_eq!(normals[0].z, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    /// Build a mesh, validating vertex count and face indices.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(SurfaceError::TooFewVertices {
                count: vertices.len(),
            });
        }
        validate_faces(&faces, vertices.len())?;
        Ok(Self { vertices, faces })
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Vertex coordinates.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Triangle indices.
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Mutable access to the coordinates.
    ///
    /// Topology cannot change through this, so the mesh stays valid.
    #[inline]
    pub fn vertices_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.vertices
    }

    /// Per-vertex normals using [`NormalMode::FaceAverage`].
    pub fn normals(&self) -> Vec<Vector3<f64>> {
        accumulate_normals(&self.vertices, &self.faces)
    }

    /// Per-vertex normals using the given mode.
    pub fn normals_with_mode(&self, mode: NormalMode) -> Vec<Vector3<f64>> {
        let mut normals = accumulate_normals(&self.vertices, &self.faces);
        if mode == NormalMode::Unit {
            normalize_in_place(&mut normals);
        }
        normals
    }

    /// Un-normalized normal of a face (twice its area in magnitude), or
    /// `None` if `face` is out of range.
    pub fn face_normal(&self, face: usize) -> Option<Vector3<f64>> {
        let [a, b, c] = *self.faces.get(face)?;
        Some(triangle_normal(&self.vertices[a], &self.vertices[b], &self.vertices[c]))
    }

    /// Axis-aligned bounding box of the vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.vertices[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    /// Number of faces touching each vertex.
    pub fn vertex_face_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.vertices.len()];
        for face in &self.faces {
            for &v in face {
                counts[v] += 1;
            }
        }
        counts
    }
}

/// Compute per-vertex normals of a triangle mesh.
///
/// Each face contributes the cross product `(v1 - v0) × (v2 - v0)` to its
/// three vertices, so larger faces weigh more. Each vertex sum is then
/// divided by the number of faces touching the vertex. The result is not
/// rescaled to unit length; vertices touched by no face get a zero vector.
/// Degenerate faces contribute zero.
///
/// # Errors
///
/// [`SurfaceError::InvalidVertexIndex`] if a face references a missing vertex.
///
/// # Example
///
/// ```
/// use sulcus::mesh::compute_normals;
/// use nalgebra::Point3;
///
/// let vertices = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
///     Point3::new(0.0, 2.0, 0.0),
///     Point3::new(9.0, 9.0, 9.0), // isolated
/// ];
/// let normals = compute_normals(&vertices, &[[0, 1, 2]]).unwrap();
/// assert_eq!(normals[0].z, 4.0);
/// assert_eq!(normals[3].norm(), 0.0);
/// ```
pub fn compute_normals(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<Vec<Vector3<f64>>> {
    validate_faces(faces, vertices.len())?;
    Ok(accumulate_normals(vertices, faces))
}

/// Rescale every nonzero vector to unit length.
pub fn normalize_in_place(normals: &mut [Vector3<f64>]) {
    for n in normals.iter_mut() {
        let len = n.norm();
        if len > 0.0 {
            *n /= len;
        }
    }
}

pub(crate) fn validate_faces(faces: &[[usize; 3]], vertex_count: usize) -> Result<()> {
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertex_count {
                return Err(SurfaceError::InvalidVertexIndex {
                    face: fi,
                    vertex: vi,
                    vertex_count,
                });
            }
        }
    }
    Ok(())
}

fn accumulate_normals(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Vec<Vector3<f64>> {
    let mut sums = vec![Vector3::zeros(); vertices.len()];
    let mut counts = vec![0u32; vertices.len()];

    for &[a, b, c] in faces {
        let n = triangle_normal(&vertices[a], &vertices[b], &vertices[c]);
        for v in [a, b, c] {
            sums[v] += n;
            counts[v] += 1;
        }
    }

    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            *sum /= count as f64;
        }
    }
    sums
}

#[inline]
fn triangle_normal(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    (p1 - p0).cross(&(p2 - p0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> SurfaceMesh {
        SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_one_normal_per_vertex() {
        let mesh = tetrahedron();
        assert_eq!(mesh.normals().len(), mesh.num_vertices());
    }

    #[test]
    fn test_normals_divide_by_face_count() {
        // Two coplanar triangles sharing edge 1-2; vertices 1 and 2 touch both.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 3, 2]];
        let normals = compute_normals(&vertices, &faces).unwrap();

        // Each face normal is (0, 0, 1): area 0.5, cross product magnitude 1.
        for n in &normals {
            assert!((n - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12, "{:?}", n);
        }
    }

    #[test]
    fn test_normals_are_area_weighted() {
        // Shared vertex 0 touches a big face and a small face in different planes.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [0, 3, 1]];
        let normals = compute_normals(&vertices, &faces).unwrap();

        // face 0: (2,0,0) x (0,2,0) = (0,0,4); face 1: (0,0,1) x (2,0,0) = (0,2,0)
        let n0 = normals[0];
        assert!((n0 - Vector3::new(0.0, 1.0, 2.0)).norm() < 1e-12, "{:?}", n0);
        // Not unit length.
        assert!((n0.norm() - 1.0).abs() > 0.1);
    }

    #[test]
    fn test_isolated_vertex_has_zero_normal() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let normals = compute_normals(&vertices, &[[0, 1, 2]]).unwrap();
        assert_eq!(normals[3], Vector3::zeros());
    }

    #[test]
    fn test_degenerate_face_contributes_zero() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let normals = compute_normals(&vertices, &[[0, 1, 2]]).unwrap();
        assert!(normals.iter().all(|n| n.norm() == 0.0));
    }

    #[test]
    fn test_unit_mode() {
        let mesh = tetrahedron();
        for n in mesh.normals_with_mode(NormalMode::Unit) {
            assert!((n.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_face_index() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let err = SurfaceMesh::new(vertices, vec![[0, 1, 3]]).unwrap_err();
        assert!(matches!(
            err,
            SurfaceError::InvalidVertexIndex { face: 0, vertex: 3, vertex_count: 3 }
        ));
    }

    #[test]
    fn test_too_few_vertices() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let err = SurfaceMesh::new(vertices, vec![]).unwrap_err();
        assert!(matches!(err, SurfaceError::TooFewVertices { count: 2 }));
    }

    #[test]
    fn test_face_normal_and_counts() {
        let mesh = tetrahedron();
        // Bottom face winds clockwise seen from above.
        assert_eq!(mesh.face_normal(0), Some(Vector3::new(0.0, 0.0, -1.0)));
        assert_eq!(mesh.face_normal(mesh.num_faces()), None);
        assert_eq!(mesh.vertex_face_counts(), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_bounding_box() {
        let (min, max) = tetrahedron().bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 1.0));
    }
}
