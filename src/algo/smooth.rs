//! Diffusion smoothing of sparse per-vertex data.
//!
//! Scalar data is often known on a subset of vertices only, for example a
//! source estimate computed on a decimated surface. [`SmoothingOperator`]
//! spreads such data over the full mesh by iterative neighbor averaging:
//!
//! 1. The *active* set starts as the known vertices.
//! 2. Each step, every inactive vertex with at least one active neighbor takes
//!    the unweighted mean of its active neighbors. Active vertices keep their
//!    value.
//! 3. The vertices reached in that step become active.
//!
//! All steps are composed into a single sparse `V x N` matrix, so the graph
//! traversal runs once and any number of fields defined on the same vertex
//! subset can be smoothed by a matrix-vector product.
//!
//! # Example
//!
//! ```
//! use sulcus::algo::smooth::SmoothingOperator;
//! use sulcus::mesh::AdjacencyGraph;
//!
//! // Tetrahedron: every vertex touches every other one.
//! let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let adj = AdjacencyGraph::from_faces(&faces, 4).unwrap();
//!
//! let op = SmoothingOperator::build(&[0, 1], &adj, Some(1)).unwrap();
//! let smoothed = op.apply(&[0.0, 10.0]).unwrap();
//! assert_eq!(smoothed, vec![0.0, 10.0, 5.0, 5.0]);
//! ```

use nalgebra::DMatrix;

use crate::error::{Result, SurfaceError};
use crate::mesh::AdjacencyGraph;

use super::sparse::CsrMatrix;
use super::Progress;

/// Composed diffusion operator mapping values on known vertices to all vertices.
///
/// Row `v` holds the weights of the known-vertex values that make up vertex
/// `v`'s smoothed value. Rows of vertices that were never reached are empty
/// and produce `0.0`.
#[derive(Debug, Clone)]
pub struct SmoothingOperator {
    matrix: CsrMatrix,
    known_vertices: Vec<usize>,
    steps: Option<usize>,
    steps_taken: usize,
    num_reached: usize,
}

impl SmoothingOperator {
    /// Build the operator for data defined on `known_vertices`.
    ///
    /// `steps` is the number of diffusion steps. `None` keeps stepping until
    /// every vertex is reached; on a disconnected mesh it stops once a step
    /// reaches nothing new.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::InvalidVertex`] if a known vertex is out of range.
    /// - [`SurfaceError::InvalidParameter`] if a known vertex is listed twice.
    pub fn build(
        known_vertices: &[usize],
        adjacency: &AdjacencyGraph,
        steps: Option<usize>,
    ) -> Result<Self> {
        Self::build_with_progress(known_vertices, adjacency, steps, &Progress::none())
    }

    /// Build the operator, reporting each diffusion step to `progress`.
    ///
    /// When `steps` is `None` the total passed to the callback is `0`.
    pub fn build_with_progress(
        known_vertices: &[usize],
        adjacency: &AdjacencyGraph,
        steps: Option<usize>,
        progress: &Progress,
    ) -> Result<Self> {
        let num_vertices = adjacency.num_vertices();
        let num_known = known_vertices.len();

        let mut active = vec![false; num_vertices];
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); num_vertices];
        for (k, &v) in known_vertices.iter().enumerate() {
            if v >= num_vertices {
                return Err(SurfaceError::InvalidVertex {
                    index: v,
                    vertex_count: num_vertices,
                });
            }
            if active[v] {
                return Err(SurfaceError::invalid_param(
                    "known_vertices",
                    v,
                    "vertex index listed more than once",
                ));
            }
            active[v] = true;
            rows[v].push((k, 1.0));
        }

        tracing::debug!(
            num_vertices,
            num_known,
            ?steps,
            "building smoothing operator"
        );

        let mut num_active = num_known;
        let mut last_added: Vec<usize> = known_vertices.to_vec();
        let mut queued = vec![false; num_vertices];
        let mut reached: Vec<usize> = Vec::new();
        let mut new_rows: Vec<Vec<(usize, f64)>> = Vec::new();
        // Dense accumulator over seed columns, reset through `touched`.
        let mut accum = vec![0.0f64; num_known];
        let mut touched: Vec<usize> = Vec::new();
        let mut steps_taken = 0usize;
        let total = steps.unwrap_or(0);

        loop {
            match steps {
                Some(n) if steps_taken >= n => break,
                None if num_active >= num_vertices => break,
                _ => {}
            }

            // Only neighbors of the vertices added last step can still be inactive.
            reached.clear();
            for &u in &last_added {
                for &w in adjacency.neighbors(u) {
                    if !active[w] && !queued[w] {
                        queued[w] = true;
                        reached.push(w);
                    }
                }
            }

            if reached.is_empty() {
                if num_active < num_vertices {
                    tracing::warn!(
                        unreached = num_vertices - num_active,
                        step = steps_taken,
                        "smoothing stopped early: remaining vertices are not connected to known data"
                    );
                }
                break;
            }

            new_rows.clear();
            for &w in &reached {
                let mut count = 0usize;
                for &j in adjacency.neighbors(w) {
                    if !active[j] {
                        continue;
                    }
                    count += 1;
                    for &(c, weight) in &rows[j] {
                        if accum[c] == 0.0 {
                            touched.push(c);
                        }
                        accum[c] += weight;
                    }
                }

                touched.sort_unstable();
                touched.dedup();
                let scale = 1.0 / count as f64;
                let row: Vec<(usize, f64)> = touched
                    .iter()
                    .map(|&c| (c, accum[c] * scale))
                    .collect();
                for &c in &touched {
                    accum[c] = 0.0;
                }
                touched.clear();
                new_rows.push(row);
            }

            for (&w, row) in reached.iter().zip(new_rows.drain(..)) {
                rows[w] = row;
                active[w] = true;
                queued[w] = false;
            }
            num_active += reached.len();
            std::mem::swap(&mut last_added, &mut reached);
            steps_taken += 1;

            tracing::debug!(
                step = steps_taken,
                added = last_added.len(),
                active = num_active,
                "smoothing step"
            );
            progress.report(steps_taken, total, "Smoothing");
        }

        let matrix = CsrMatrix::from_rows(num_known, &rows);
        tracing::info!(
            steps = steps_taken,
            reached = num_active,
            nnz = matrix.nnz(),
            "smoothing operator ready"
        );

        Ok(Self {
            matrix,
            known_vertices: known_vertices.to_vec(),
            steps,
            steps_taken,
            num_reached: num_active,
        })
    }

    /// Smooth values given on the known vertices onto every vertex.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::LengthMismatch`] if `values` does not have one entry
    /// per known vertex.
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.check_len(values.len())?;
        Ok(self.matrix.mul_vec(values))
    }

    /// Same as [`apply`](Self::apply), with rows processed in parallel.
    pub fn par_apply(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.check_len(values.len())?;
        Ok(self.matrix.par_mul_vec(values))
    }

    /// Smooth every column of a `known x time` matrix.
    pub fn apply_columns(&self, values: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.check_len(values.nrows())?;
        Ok(self.matrix.mul_dense(values))
    }

    /// The composed sparse matrix.
    #[inline]
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// `(num_vertices, num_known)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.nrows(), self.matrix.ncols())
    }

    /// Number of stored weights.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// The vertices the input data is defined on.
    #[inline]
    pub fn known_vertices(&self) -> &[usize] {
        &self.known_vertices
    }

    /// The requested step count (`None` for full coverage).
    #[inline]
    pub fn steps(&self) -> Option<usize> {
        self.steps
    }

    /// Number of steps that reached new vertices.
    #[inline]
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Number of vertices with a defined value, known vertices included.
    #[inline]
    pub fn num_reached(&self) -> usize {
        self.num_reached
    }

    /// Whether every vertex received a value.
    #[inline]
    pub fn covers_mesh(&self) -> bool {
        self.num_reached == self.matrix.nrows()
    }

    /// Whether vertex `v` received a value.
    #[inline]
    pub fn is_reached(&self, v: usize) -> bool {
        !self.matrix.row_is_empty(v)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.known_vertices.len() {
            return Err(SurfaceError::LengthMismatch {
                what: "smoothing input",
                expected: self.known_vertices.len(),
                actual: len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_adjacency;

    fn tetrahedron() -> AdjacencyGraph {
        build_adjacency(&[[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]], 4).unwrap()
    }

    /// Triangle strip with `columns` vertex pairs: 0-1, 2-3, 4-5, ...
    fn strip(columns: usize) -> AdjacencyGraph {
        let mut faces = Vec::new();
        for i in 0..columns - 1 {
            let a = 2 * i;
            faces.push([a, a + 1, a + 2]);
            faces.push([a + 1, a + 3, a + 2]);
        }
        build_adjacency(&faces, 2 * columns).unwrap()
    }

    #[test]
    fn test_tetrahedron_one_step() {
        let op = SmoothingOperator::build(&[0, 1], &tetrahedron(), Some(1)).unwrap();
        let smoothed = op.apply(&[0.0, 10.0]).unwrap();
        assert_eq!(smoothed, vec![0.0, 10.0, 5.0, 5.0]);
        assert_eq!(op.shape(), (4, 2));
        assert!(op.covers_mesh());
    }

    #[test]
    fn test_full_coverage_is_identity() {
        let adj = tetrahedron();
        let op = SmoothingOperator::build(&[0, 1, 2, 3], &adj, None).unwrap();
        let values = [1.5, -2.0, 7.0, 0.25];
        assert_eq!(op.apply(&values).unwrap(), values.to_vec());
        assert_eq!(op.steps_taken(), 0);

        // Extra steps do not disturb known values either.
        let op = SmoothingOperator::build(&[0, 1, 2, 3], &adj, Some(5)).unwrap();
        assert_eq!(op.apply(&values).unwrap(), values.to_vec());
    }

    #[test]
    fn test_permuted_known_vertices() {
        let op = SmoothingOperator::build(&[3, 1, 0, 2], &tetrahedron(), None).unwrap();
        let smoothed = op.apply(&[30.0, 10.0, 0.0, 20.0]).unwrap();
        assert_eq!(smoothed, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_strip_two_steps() {
        let adj = strip(4);
        let op = SmoothingOperator::build(&[0, 1], &adj, Some(2)).unwrap();
        let smoothed = op.apply(&[0.0, 3.0]).unwrap();

        // Step 1: vertex 2 sees 0 and 1, vertex 3 sees only 1.
        assert!((smoothed[2] - 1.5).abs() < 1e-12);
        assert!((smoothed[3] - 3.0).abs() < 1e-12);
        // Step 2: vertex 4 sees 2 and 3, vertex 5 sees only 3.
        assert!((smoothed[4] - 2.25).abs() < 1e-12);
        assert!((smoothed[5] - 3.0).abs() < 1e-12);
        // Not reached within two steps.
        assert_eq!(smoothed[6].to_bits(), 0.0f64.to_bits());
        assert_eq!(smoothed[7].to_bits(), 0.0f64.to_bits());
        assert!(!op.is_reached(6));
        assert!(!op.covers_mesh());
        assert_eq!(op.num_reached(), 6);
    }

    #[test]
    fn test_until_covered() {
        let adj = strip(6);
        let op = SmoothingOperator::build(&[0], &adj, None).unwrap();
        assert!(op.covers_mesh());
        let smoothed = op.apply(&[4.0]).unwrap();
        assert!(smoothed.iter().all(|&v| (v - 4.0).abs() < 1e-12));
    }

    #[test]
    fn test_rows_sum_to_one_when_reached() {
        let adj = strip(5);
        let op = SmoothingOperator::build(&[0, 5, 9], &adj, Some(1)).unwrap();
        for v in 0..adj.num_vertices() {
            let sum = op.matrix().row_sum(v);
            if op.is_reached(v) {
                assert!((sum - 1.0).abs() < 1e-12, "row {v} sums to {sum}");
            } else {
                assert_eq!(sum, 0.0);
            }
        }
    }

    #[test]
    fn test_disconnected_terminates() {
        // Two separate triangles.
        let adj = build_adjacency(&[[0, 1, 2], [3, 4, 5]], 6).unwrap();
        let op = SmoothingOperator::build(&[0], &adj, None).unwrap();
        assert_eq!(op.num_reached(), 3);
        assert_eq!(op.apply(&[2.0]).unwrap(), vec![2.0, 2.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_steps_keeps_only_known() {
        let op = SmoothingOperator::build(&[2], &tetrahedron(), Some(0)).unwrap();
        assert_eq!(op.apply(&[1.0]).unwrap(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_invalid_known_vertices() {
        let adj = tetrahedron();
        assert!(matches!(
            SmoothingOperator::build(&[0, 9], &adj, None),
            Err(SurfaceError::InvalidVertex { index: 9, vertex_count: 4 })
        ));
        assert!(matches!(
            SmoothingOperator::build(&[1, 1], &adj, None),
            Err(SurfaceError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_apply_length_mismatch() {
        let op = SmoothingOperator::build(&[0, 1], &tetrahedron(), Some(1)).unwrap();
        assert!(matches!(
            op.apply(&[1.0]),
            Err(SurfaceError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_apply_columns_matches_apply() {
        let adj = strip(4);
        let op = SmoothingOperator::build(&[0, 7], &adj, None).unwrap();
        let data = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 5.0, 2.0]);
        let out = op.apply_columns(&data).unwrap();
        let col0 = op.apply(&[1.0, 5.0]).unwrap();
        let col1 = op.par_apply(&[-1.0, 2.0]).unwrap();
        for v in 0..8 {
            assert!((out[(v, 0)] - col0[v]).abs() < 1e-12);
            assert!((out[(v, 1)] - col1[v]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_progress_reports_each_step() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let progress = Progress::new(move |_, total, _| {
            assert_eq!(total, 3);
            seen.fetch_add(1, Ordering::Relaxed);
        });
        let adj = strip(8);
        SmoothingOperator::build_with_progress(&[0], &adj, Some(3), &progress).unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }
}
