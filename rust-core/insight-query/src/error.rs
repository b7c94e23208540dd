// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query and catalog error types.

use thiserror::Error;

/// Errors returned by a single query call.
///
/// Every validation step fails fast: a query produces exactly one error and
/// never a partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed or inconsistent query: wrong shape, unknown clause,
    /// cross-clause mismatch, unknown dataset, type-mismatched operator.
    #[error("invalid query: {0}")]
    Structure(String),

    /// The query is valid but its post-transformation result is over the cap.
    #[error("result too large: {rows} rows exceeds the limit of {limit}")]
    ResultTooLarge { rows: usize, limit: usize },
}

impl QueryError {
    /// Shorthand for a [`QueryError::Structure`] with a formatted message.
    pub fn structure(msg: impl Into<String>) -> Self {
        QueryError::Structure(msg.into())
    }

    /// Whether this is a structure (validation) error.
    pub fn is_structure(&self) -> bool {
        matches!(self, QueryError::Structure(_))
    }

    /// Whether this is a result-too-large error.
    pub fn is_too_large(&self) -> bool {
        matches!(self, QueryError::ResultTooLarge { .. })
    }
}

/// Errors from the dataset catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid dataset id: {0:?}")]
    InvalidId(String),

    #[error("dataset already exists: {0}")]
    DuplicateId(String),

    #[error("dataset not found: {0}")]
    NotFound(String),

    #[error("dataset {0} has no valid records")]
    EmptyDataset(String),

    #[error("Lock poisoned: internal concurrency error")]
    LockPoisoned,
}

/// Convenience alias used throughout the query pipeline.
pub type QueryResult<T> = Result<T, QueryError>;
