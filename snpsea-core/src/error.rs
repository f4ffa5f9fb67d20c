//! Engine error kinds.
//!
//! Fatal conditions surface as one of these variants and terminate the
//! run with a single diagnostic. Per-SNP conditions (absent intervals,
//! zero-gene overlaps) are not errors; they flow through the reports.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnpseaError {
    #[error("Conditions not found in the gene matrix: {}", names.join(", "))]
    MissingCondition { names: Vec<String> },

    #[error("No SNP in the null list overlaps any gene in the matrix")]
    EmptyNullPool,

    #[error("The input SNP set is empty")]
    EmptyInputSnpSet,

    #[error("No null geneset of size {size} is available for matched sampling")]
    EmptyBin { size: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
