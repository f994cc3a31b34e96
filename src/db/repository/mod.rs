//! Repository Module
//!
//! CRUD operations over SQLite, written as free async functions taking a
//! `&SqlitePool`. Multi-row mutations (order creation, cancellation,
//! reactivation, deletion) run inside a single transaction; stock writes
//! use conditional updates so the count can never go negative under
//! concurrent checkouts.

pub mod category;
pub mod member;
pub mod order;
pub mod product;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Database(format!("Corrupt JSON column: {}", err))
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
