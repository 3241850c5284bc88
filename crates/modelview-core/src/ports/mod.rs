//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the CRUD service expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - No HTTP or template engine details
//! - The store is CRUD-only; dispatch policy lives in `CrudService`

pub mod model_store;
pub mod template;

use thiserror::Error;

pub use model_store::ModelStore;
pub use template::{NoopRenderer, RenderError, TemplateRenderer};

/// Domain-specific errors for store operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for the service to handle storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested row was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint on `column` was violated.
    #[error("'{column}' already exists")]
    UniqueViolation { column: String },

    /// Another constraint was violated (e.g., foreign key, not null).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Storage backend error (database, connection pool, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
