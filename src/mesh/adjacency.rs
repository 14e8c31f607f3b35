//! Vertex adjacency derived from a triangle list.

use crate::error::Result;

use super::geometry::validate_faces;

/// Symmetric vertex-to-vertex adjacency induced by mesh edges.
///
/// Stored in compressed row form: the neighbors of vertex `v` are
/// `neighbors[offsets[v]..offsets[v + 1]]`, sorted ascending without
/// duplicates. There are no self-loops.
///
/// # Example
///
/// ```
/// use sulcus::mesh::AdjacencyGraph;
///
/// let adj = AdjacencyGraph::from_faces(&[[0, 1, 2], [1, 3, 2]], 4).unwrap();
/// assert_eq!(adj.neighbors(1), &[0, 2, 3]);
/// assert_eq!(adj.num_edges(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyGraph {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
}

impl AdjacencyGraph {
    /// Build the adjacency relation of a triangle list over `vertex_count`
    /// vertices.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::InvalidVertexIndex`](crate::error::SurfaceError::InvalidVertexIndex)
    /// if a face references a vertex `>= vertex_count`.
    pub fn from_faces(faces: &[[usize; 3]], vertex_count: usize) -> Result<Self> {
        validate_faces(faces, vertex_count)?;

        // Count directed edge slots per vertex (upper bound, duplicates included).
        let mut counts = vec![0usize; vertex_count + 1];
        for &[a, b, c] in faces {
            for (i, j) in [(a, b), (b, c), (c, a)] {
                if i != j {
                    counts[i + 1] += 1;
                    counts[j + 1] += 1;
                }
            }
        }
        for v in 0..vertex_count {
            counts[v + 1] += counts[v];
        }

        let mut slots = vec![0usize; counts[vertex_count]];
        let mut fill = counts.clone();
        for &[a, b, c] in faces {
            for (i, j) in [(a, b), (b, c), (c, a)] {
                if i != j {
                    slots[fill[i]] = j;
                    fill[i] += 1;
                    slots[fill[j]] = i;
                    fill[j] += 1;
                }
            }
        }

        // Sort and dedup each row, compacting into the final layout.
        let mut offsets = Vec::with_capacity(vertex_count + 1);
        let mut neighbors = Vec::with_capacity(slots.len() / 2);
        offsets.push(0);
        for v in 0..vertex_count {
            let row = &mut slots[counts[v]..counts[v + 1]];
            row.sort_unstable();
            let mut last = usize::MAX;
            for &n in row.iter() {
                if n != last {
                    neighbors.push(n);
                    last = n;
                }
            }
            offsets.push(neighbors.len());
        }

        Ok(Self { offsets, neighbors })
    }

    /// Number of vertices the relation is defined over.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Sorted neighbors of a vertex.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Number of neighbors of a vertex.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// Whether `i` and `j` share an edge.
    pub fn contains_edge(&self, i: usize, j: usize) -> bool {
        i < self.num_vertices() && self.neighbors(i).binary_search(&j).is_ok()
    }

    /// Iterate over undirected edges `(i, j)` with `i < j`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.num_vertices()).flat_map(move |i| {
            self.neighbors(i)
                .iter()
                .filter(move |&&j| i < j)
                .map(move |&j| (i, j))
        })
    }
}

/// Build the adjacency relation of a triangle list.
///
/// Shorthand for [`AdjacencyGraph::from_faces`].
pub fn build_adjacency(faces: &[[usize; 3]], vertex_count: usize) -> Result<AdjacencyGraph> {
    AdjacencyGraph::from_faces(faces, vertex_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;

    const TETRAHEDRON: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

    #[test]
    fn test_tetrahedron_is_complete_graph() {
        let adj = build_adjacency(&TETRAHEDRON, 4).unwrap();
        assert_eq!(adj.num_edges(), 6);
        for v in 0..4 {
            assert_eq!(adj.degree(v), 3);
            assert!(!adj.neighbors(v).contains(&v));
        }
    }

    #[test]
    fn test_symmetric() {
        // A small fan with an isolated vertex 6.
        let faces = [[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5], [0, 5, 1]];
        let adj = build_adjacency(&faces, 7).unwrap();
        for i in 0..adj.num_vertices() {
            for &j in adj.neighbors(i) {
                assert!(adj.contains_edge(j, i), "edge ({i}, {j}) not symmetric");
            }
        }
        assert_eq!(adj.degree(0), 5);
        assert_eq!(adj.degree(6), 0);
    }

    #[test]
    fn test_duplicate_edges_are_idempotent() {
        let faces = [[0, 1, 2], [0, 1, 2], [2, 1, 0]];
        let adj = build_adjacency(&faces, 3).unwrap();
        assert_eq!(adj.neighbors(0), &[1, 2]);
        assert_eq!(adj.num_edges(), 3);
    }

    #[test]
    fn test_repeated_index_has_no_self_loop() {
        let adj = build_adjacency(&[[0, 0, 1]], 3).unwrap();
        assert_eq!(adj.neighbors(0), &[1]);
        assert_eq!(adj.neighbors(1), &[0]);
        assert!(!adj.contains_edge(0, 0));
    }

    #[test]
    fn test_edges_iterator() {
        let adj = build_adjacency(&[[0, 1, 2]], 3).unwrap();
        let edges: Vec<_> = adj.edges().collect();
        assert_eq!(edges, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_out_of_range_face() {
        let err = build_adjacency(&[[0, 1, 5]], 3).unwrap_err();
        assert!(matches!(err, SurfaceError::InvalidVertexIndex { vertex: 5, .. }));
    }
}
