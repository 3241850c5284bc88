//! Declarative model definitions.
//!
//! A [`ModelDef`] describes one database-backed entity: its table, its single
//! primary key column, its value columns and the relationships that can be
//! followed when serializing an instance. Composite primary keys cannot be
//! expressed.

use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use serde_json::Value;

/// Storage type of the primary key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Integer key, assigned by the database when not supplied.
    Integer,
    /// Text key, always supplied by the client.
    Text,
}

impl KeyKind {
    /// Parse a raw URL segment into a key of this kind.
    ///
    /// Returns `None` when the segment cannot be converted, which callers
    /// treat the same as a missing row.
    pub fn parse(self, raw: &str) -> Option<KeyValue> {
        match self {
            Self::Integer => raw.parse::<i64>().ok().map(KeyValue::Integer),
            Self::Text if raw.is_empty() => None,
            Self::Text => Some(KeyValue::Text(raw.to_string())),
        }
    }

    /// Read a key of this kind out of a JSON value.
    pub fn from_json(self, value: &Value) -> Option<KeyValue> {
        match (self, value) {
            (Self::Integer, Value::Number(n)) => n.as_i64().map(KeyValue::Integer),
            (Self::Text, Value::String(s)) => Some(KeyValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Column kind used to store this key.
    pub const fn column_kind(self) -> ColumnKind {
        match self {
            Self::Integer => ColumnKind::Integer,
            Self::Text => ColumnKind::Text,
        }
    }
}

/// A primary key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Integer(i64),
    Text(String),
}

impl KeyValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Text(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Storage type of a value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Boolean,
    /// RFC 3339 timestamp stored as text.
    Timestamp,
    /// Arbitrary JSON stored as text.
    Json,
}

impl ColumnKind {
    /// Whether a non-null JSON value can be stored in a column of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Integer, Value::Number(n)) => n.is_i64(),
            (Self::Real, Value::Number(_))
            | (Self::Text, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Json, _) => true,
            (Self::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s).is_ok(),
            _ => false,
        }
    }

    /// SQL type affinity used in generated DDL.
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Text | Self::Timestamp | Self::Json => "TEXT",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// A value column of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            unique: false,
        }
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// The single primary key column of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub name: String,
    pub kind: KeyKind,
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// At most one related row, serialized as an object or null.
    One,
    /// Any number of related rows, serialized as an array.
    Many,
}

/// A followable relationship to another model.
///
/// Related rows are those of `target` whose `remote_column` equals this
/// instance's `local_column`.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub name: String,
    pub target: Arc<ModelDef>,
    pub local_column: String,
    pub remote_column: String,
    pub kind: RelationKind,
}

/// Declarative description of a database-backed model.
#[derive(Debug, Clone)]
pub struct ModelDef {
    name: String,
    table: String,
    route_base: Option<String>,
    primary_key: PrimaryKey,
    columns: Vec<Column>,
    relationships: Vec<Relationship>,
}

impl ModelDef {
    /// Create a model with an integer primary key named `id`.
    ///
    /// The table name defaults to the lowercased model name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.to_lowercase(),
            name,
            route_base: None,
            primary_key: PrimaryKey {
                name: "id".to_string(),
                kind: KeyKind::Integer,
            },
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Override the URL segment routes are registered under.
    #[must_use]
    pub fn route_base(mut self, base: impl Into<String>) -> Self {
        self.route_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn primary_key(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.primary_key = PrimaryKey {
            name: name.into(),
            kind,
        };
        self
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// URL segment for this model's routes.
    pub fn route_segment(&self) -> String {
        self.route_base
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    pub const fn key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Look up a value column by name.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Kind of any column, the primary key included.
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        if name == self.primary_key.name {
            return Some(self.primary_key.kind.column_kind());
        }
        self.find_column(name).map(|c| c.kind)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_kind(name).is_some()
    }

    pub fn find_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// All column names in storage order, primary key first.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_key.name.as_str())
            .chain(self.columns.iter().map(|c| c.name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simple() -> ModelDef {
        ModelDef::new("SimpleModel").column(Column::new("name", ColumnKind::Text))
    }

    #[test]
    fn test_defaults_derive_from_name() {
        let model = simple();
        assert_eq!(model.table_name(), "simplemodel");
        assert_eq!(model.route_segment(), "simplemodel");
        assert_eq!(model.key().name, "id");
        assert_eq!(model.key().kind, KeyKind::Integer);
    }

    #[test]
    fn test_route_base_override() {
        let model = simple().route_base("things");
        assert_eq!(model.route_segment(), "things");
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(KeyKind::Integer.parse("42"), Some(KeyValue::Integer(42)));
        assert_eq!(KeyKind::Integer.parse("a string"), None);
        assert_eq!(
            KeyKind::Text.parse("abc"),
            Some(KeyValue::Text("abc".to_string()))
        );
        assert_eq!(KeyKind::Text.parse(""), None);
    }

    #[test]
    fn test_column_kind_accepts() {
        assert!(ColumnKind::Integer.accepts(&json!(3)));
        assert!(!ColumnKind::Integer.accepts(&json!(3.5)));
        assert!(ColumnKind::Real.accepts(&json!(3)));
        assert!(ColumnKind::Timestamp.accepts(&json!("2024-01-02T03:04:05Z")));
        assert!(!ColumnKind::Timestamp.accepts(&json!("yesterday")));
        assert!(ColumnKind::Json.accepts(&json!({"a": [1, 2]})));
    }

    #[test]
    fn test_column_names_starts_with_key() {
        let model = simple();
        let names: Vec<_> = model.column_names().collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(model.column_kind("id"), Some(ColumnKind::Integer));
        assert!(!model.has_column("missing"));
    }
}
