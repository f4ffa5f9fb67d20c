//! snpsea-linalg: Dense matrix container for SNPSEA-RS
//!
//! Wraps faer's column-major Mat<f64> with the operations the
//! enrichment engine needs: column access, dot products, row norms,
//! and column removal.

pub mod dense;

pub use dense::DenseMatrix;
