//! `SQLite` store implementations.

mod row_mappers;
mod sqlite_model_store;

pub use row_mappers::{SqlValue, quote_ident, row_to_instance, select_columns};
pub use sqlite_model_store::SqliteModelStore;
