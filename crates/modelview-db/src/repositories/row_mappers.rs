//! Conversion between JSON column values and `SQLite` storage values.

use modelview_core::{ColumnKind, Instance, ModelDef, RepositoryError};
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{QueryBuilder, Row};

/// Quote an identifier for use in generated SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated, quoted list of every column of `model`, key first.
pub fn select_columns(model: &ModelDef) -> String {
    model
        .column_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A JSON value converted to one of `SQLite`'s storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Convert `value` for storage in a column of `kind`.
    pub fn from_json(
        column: &str,
        kind: ColumnKind,
        value: &Value,
    ) -> Result<Self, RepositoryError> {
        if value.is_null() {
            return Ok(Self::Null);
        }
        let converted = match kind {
            ColumnKind::Integer => value.as_i64().map(Self::Integer),
            ColumnKind::Real => value.as_f64().map(Self::Real),
            ColumnKind::Boolean => value.as_bool().map(|b| Self::Integer(i64::from(b))),
            ColumnKind::Text | ColumnKind::Timestamp => {
                value.as_str().map(|s| Self::Text(s.to_string()))
            }
            ColumnKind::Json => Some(Self::Text(
                serde_json::to_string(value)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
            )),
        };
        converted.ok_or_else(|| {
            RepositoryError::Serialization(format!(
                "Cannot store {value} in {kind} column '{column}'"
            ))
        })
    }

    /// Append this value to `builder` as a bind parameter.
    pub fn push_bind(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Self::Null => {
                builder.push_bind(Option::<String>::None);
            }
            Self::Integer(i) => {
                builder.push_bind(i);
            }
            Self::Real(f) => {
                builder.push_bind(f);
            }
            Self::Text(s) => {
                builder.push_bind(s);
            }
        }
    }
}

/// Bind the JSON `value` of `model`'s column `column`.
pub fn push_column_value(
    builder: &mut QueryBuilder<'_, Sqlite>,
    model: &ModelDef,
    column: &str,
    value: &Value,
) -> Result<(), RepositoryError> {
    let kind = model.column_kind(column).ok_or_else(|| {
        RepositoryError::Storage(format!("Unknown column '{column}' on {}", model.name()))
    })?;
    SqlValue::from_json(column, kind, value)?.push_bind(builder);
    Ok(())
}

/// Read one column of a row back into JSON.
fn read_column(row: &SqliteRow, name: &str, kind: ColumnKind) -> Result<Value, RepositoryError> {
    let storage = |e: sqlx::Error| RepositoryError::Storage(e.to_string());
    let value = match kind {
        ColumnKind::Integer => row
            .try_get::<Option<i64>, _>(name)
            .map_err(storage)?
            .map_or(Value::Null, Value::from),
        ColumnKind::Real => row
            .try_get::<Option<f64>, _>(name)
            .map_err(storage)?
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        ColumnKind::Boolean => row
            .try_get::<Option<i64>, _>(name)
            .map_err(storage)?
            .map_or(Value::Null, |i| Value::Bool(i != 0)),
        ColumnKind::Text | ColumnKind::Timestamp => row
            .try_get::<Option<String>, _>(name)
            .map_err(storage)?
            .map_or(Value::Null, Value::String),
        ColumnKind::Json => match row.try_get::<Option<String>, _>(name).map_err(storage)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
            None => Value::Null,
        },
    };
    Ok(value)
}

/// Parse a database row into an instance of `model`.
pub fn row_to_instance(model: &ModelDef, row: &SqliteRow) -> Result<Instance, RepositoryError> {
    let mut values = Map::new();
    for name in model.column_names() {
        let kind = model
            .column_kind(name)
            .ok_or_else(|| RepositoryError::Storage(format!("Unknown column '{name}'")))?;
        values.insert(name.to_string(), read_column(row, name, kind)?);
    }
    Ok(Instance::from_values(values))
}

/// Map a failed write to a repository error, recognising constraint
/// violations.
pub fn map_write_error(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return RepositoryError::UniqueViolation {
                column: unique_column(db.message()),
            };
        }
        if db.is_foreign_key_violation() || db.is_check_violation() {
            return RepositoryError::Constraint(db.message().to_string());
        }
        if db.message().starts_with("NOT NULL constraint failed") {
            return RepositoryError::Constraint(db.message().to_string());
        }
    }
    RepositoryError::Storage(error.to_string())
}

// "UNIQUE constraint failed: table.col[, table.col2]"
fn unique_column(message: &str) -> String {
    let columns = message
        .split_once(": ")
        .map_or(message, |(_, rest)| rest);
    let first = columns.split(',').next().unwrap_or(columns).trim();
    first
        .rsplit_once('.')
        .map_or(first, |(_, column)| column)
        .to_string()
}
