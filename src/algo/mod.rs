//! Surface data algorithms.
//!
//! - **Smoothing**: diffusion of sparse vertex data over the mesh ([`smooth`])
//! - **Sparse matrices**: the CSR storage behind composed operators ([`sparse`])

pub mod progress;
pub mod smooth;
pub mod sparse;

pub use progress::Progress;
pub use smooth::SmoothingOperator;
pub use sparse::CsrMatrix;
