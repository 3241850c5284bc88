//! Database setup and initialization.
//!
//! Tables are generated from [`ModelDef`]s, so every model registered with a
//! view gets a table without hand-written migrations.

use std::str::FromStr;

use anyhow::Result;
use modelview_core::{KeyKind, ModelDef};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::repositories::quote_ident;

/// Connects to the `SQLite` database at `database_url` and ensures a table
/// exists for each model.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection URL (e.g. `sqlite://modelview.db`)
/// * `models` - Models whose tables should be created
///
/// # Errors
///
/// Returns an error if:
/// - The URL cannot be parsed
/// - The database file cannot be opened or created
/// - Schema creation fails
///
/// # Example
///
/// ```rust,no_run
/// use modelview_core::{KeyKind, ModelDef};
/// use modelview_db::setup_database;
///
/// # async fn example() -> anyhow::Result<()> {
/// let note = ModelDef::new("Note");
/// let pool = setup_database("sqlite://notes.db", &[&note]).await?;
/// # Ok(())
/// # }
/// ```
pub async fn setup_database(database_url: &str, models: &[&ModelDef]) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // An in-memory database only lives as long as its one connection.
    let pool = if database_url.contains(":memory:") {
        memory_pool_options().connect_with(options).await?
    } else {
        SqlitePoolOptions::new().connect_with(options).await?
    };

    create_schema(&pool, models).await?;
    tracing::info!(models = models.len(), "Database ready");
    Ok(pool)
}

/// Sets up an in-memory `SQLite` database for testing.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database(models: &[&ModelDef]) -> Result<SqlitePool> {
    let pool = memory_pool_options().connect("sqlite::memory:").await?;
    create_schema(&pool, models).await?;
    Ok(pool)
}

fn memory_pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

/// Creates the tables for `models`.
///
/// Safe to call multiple times as all statements use IF NOT EXISTS.
pub async fn create_schema(pool: &SqlitePool, models: &[&ModelDef]) -> Result<()> {
    for model in models {
        sqlx::query(&create_table_sql(model)).execute(pool).await?;
    }
    Ok(())
}

/// `CREATE TABLE` statement for a model.
pub fn create_table_sql(model: &ModelDef) -> String {
    let key = model.key();
    let mut columns = vec![match key.kind {
        // rowid alias, assigned by SQLite when omitted
        KeyKind::Integer => format!("{} INTEGER PRIMARY KEY", quote_ident(&key.name)),
        KeyKind::Text => format!("{} TEXT PRIMARY KEY NOT NULL", quote_ident(&key.name)),
    }];

    for column in model.columns() {
        let mut def = format!("{} {}", quote_ident(&column.name), column.kind.sql_type());
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if column.unique {
            def.push_str(" UNIQUE");
        }
        columns.push(def);
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(model.table_name()),
        columns.join(", ")
    )
}
