//! Error types for sulcus.
//!
//! Every failure in the surface pipeline is a caller input error. Errors are
//! reported synchronously and carry the offending values.

use std::cmp::Ordering;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`SurfaceError`].
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Errors that can occur while preparing a surface overlay.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// Colormap limits are not strictly increasing.
    #[error("{lower} must be < {upper}, got {lower_value} >= {upper_value}")]
    RangeOrder {
        /// Name of the lower limit (`fmin` or `fmid`).
        lower: &'static str,
        /// Name of the upper limit (`fmid` or `fmax`).
        upper: &'static str,
        /// Value of the lower limit.
        lower_value: f64,
        /// Value of the upper limit.
        upper_value: f64,
    },

    /// A scalar field covers fewer vertices than the mesh but no vertex
    /// index mapping was supplied.
    #[error("len(data) < nvtx ({len} < {vertex_count}): the vertex indices must be supplied")]
    MissingIndex {
        /// Length of the scalar field.
        len: usize,
        /// Number of mesh vertices.
        vertex_count: usize,
    },

    /// A face references a vertex index outside the vertex array.
    #[error("face {face} references invalid vertex index {vertex} (mesh has {vertex_count} vertices)")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// The mesh has fewer than three vertices.
    #[error("mesh needs at least 3 vertices, got {count}")]
    TooFewVertices {
        /// Number of vertices supplied.
        count: usize,
    },

    /// A vertex index supplied alongside a scalar field or label is out of range.
    #[error("vertex index {index} is out of range (mesh has {vertex_count} vertices)")]
    InvalidVertex {
        /// The invalid vertex index.
        index: usize,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// Two arrays that must agree in length do not.
    #[error("{what} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// What was being checked.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Unknown colormap name.
    #[error("unknown colormap: {name}")]
    UnknownColormap {
        /// The name that failed to resolve.
        name: String,
    },

    /// A color specification could not be parsed.
    #[error("invalid color specification: {spec}")]
    InvalidColor {
        /// The color string.
        spec: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading geometry from a file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl SurfaceError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        SurfaceError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Returns `true` for errors caused by out-of-order colormap limits.
    pub fn is_range_order(&self) -> bool {
        matches!(self, SurfaceError::RangeOrder { .. })
    }
}

/// Check that `fmin < fmid < fmax`.
///
/// The first violated pair is reported.
///
/// ```
/// use sulcus::error::check_limits;
///
/// assert!(check_limits(0.0, 0.5, 1.0).is_ok());
/// let err = check_limits(2.0, 1.0, 3.0).unwrap_err();
/// assert_eq!(err.to_string(), "fmin must be < fmid, got 2 >= 1");
/// ```
pub fn check_limits(fmin: f64, fmid: f64, fmax: f64) -> Result<()> {
    // Anything but `Less` fails, NaN included.
    if fmin.partial_cmp(&fmid) != Some(Ordering::Less) {
        return Err(SurfaceError::RangeOrder {
            lower: "fmin",
            upper: "fmid",
            lower_value: fmin,
            upper_value: fmid,
        });
    }
    if fmid.partial_cmp(&fmax) != Some(Ordering::Less) {
        return Err(SurfaceError::RangeOrder {
            lower: "fmid",
            upper: "fmax",
            lower_value: fmid,
            upper_value: fmax,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_limits_reports_first_violation() {
        let err = check_limits(2.0, 1.0, 3.0).unwrap_err();
        assert!(err.is_range_order());
        match err {
            SurfaceError::RangeOrder { lower, upper, .. } => {
                assert_eq!(lower, "fmin");
                assert_eq!(upper, "fmid");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = check_limits(0.0, 3.0, 3.0).unwrap_err();
        assert_eq!(err.to_string(), "fmid must be < fmax, got 3 >= 3");
    }

    #[test]
    fn test_check_limits_rejects_nan() {
        assert!(check_limits(f64::NAN, 1.0, 2.0).is_err());
        assert!(check_limits(0.0, f64::NAN, 2.0).is_err());
        assert!(check_limits(0.0, 1.0, f64::NAN).is_err());
        assert!(check_limits(f64::NEG_INFINITY, 0.0, f64::INFINITY).is_ok());
    }

    #[test]
    fn test_missing_index_message() {
        let err = SurfaceError::MissingIndex { len: 2, vertex_count: 4 };
        assert_eq!(
            err.to_string(),
            "len(data) < nvtx (2 < 4): the vertex indices must be supplied"
        );
    }
}
