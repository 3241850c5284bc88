//! `SQLite` persistence for modelview.
//!
//! [`SqliteModelStore`] implements the core `ModelStore` port for any
//! `ModelDef`, generating SQL from the model definition. [`setup_database`]
//! opens a pool and creates the tables of the given models.

#![deny(unsafe_code)]

pub mod repositories;
pub mod setup;

pub use repositories::SqliteModelStore;

pub use setup::{create_schema, create_table_sql, setup_database};
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

// Linked for its bundled SQLite build only.
use libsqlite3_sys as _;
