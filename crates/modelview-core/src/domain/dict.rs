//! Mapping (dict) serialization of model instances.
//!
//! Instances are converted to JSON objects with [`Instance::asdict`], created
//! from validated data with [`ModelDef::construct`] and updated in place with
//! [`Instance::fromdict`]. Which fields take part is controlled by
//! [`DictParams`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use super::instance::Instance;
use super::model::{ColumnKind, KeyKind, ModelDef};

/// Options controlling which fields are read from or written to a mapping.
///
/// `only`, `exclude` and `exclude_pk` restrict output, `follow` embeds
/// relationships (each with its own nested params). `only`, `exclude` and
/// `allow_pk` restrict input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictParams {
    pub only: Option<Vec<String>>,
    pub exclude: Vec<String>,
    pub exclude_pk: bool,
    pub allow_pk: bool,
    pub follow: BTreeMap<String, DictParams>,
}

impl DictParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn exclude_pk(mut self) -> Self {
        self.exclude_pk = true;
        self
    }

    #[must_use]
    pub const fn allow_pk(mut self) -> Self {
        self.allow_pk = true;
        self
    }

    #[must_use]
    pub fn follow(mut self, relationship: impl Into<String>, params: Self) -> Self {
        self.follow.insert(relationship.into(), params);
        self
    }

    /// Whether `field` passes the `only`/`exclude` filters.
    pub fn includes(&self, field: &str) -> bool {
        self.only
            .as_ref()
            .is_none_or(|only| only.iter().any(|f| f == field))
            && !self.exclude.iter().any(|f| f == field)
    }
}

/// Errors raised while building or updating an instance from a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Primary key '{0}' cannot be set from a mapping")]
    PrimaryKeyNotAllowed(String),

    #[error("Column '{0}' is required")]
    MissingColumn(String),

    #[error("Column '{column}' expects a {expected} value")]
    TypeMismatch { column: String, expected: String },

    #[error("Unknown relationship '{0}'")]
    UnknownRelationship(String),
}

impl DictError {
    /// Column or relationship the error is about.
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownColumn(name)
            | Self::PrimaryKeyNotAllowed(name)
            | Self::MissingColumn(name)
            | Self::UnknownRelationship(name)
            | Self::TypeMismatch { column: name, .. } => name,
        }
    }
}

impl ModelDef {
    /// Build a new, not yet persisted instance from validated data.
    ///
    /// Unknown keys are rejected. Keys filtered out by `params` are skipped.
    /// An integer primary key is only accepted with `allow_pk`; text keys are
    /// always client supplied.
    pub fn construct(
        &self,
        data: &Map<String, Value>,
        params: &DictParams,
    ) -> Result<Instance, DictError> {
        let key = self.key();
        let mut values = Map::new();

        for (name, value) in data {
            let Some(kind) = self.column_kind(name) else {
                return Err(DictError::UnknownColumn(name.clone()));
            };
            if !params.includes(name) {
                continue;
            }
            let nullable = if *name == key.name {
                if !params.allow_pk && key.kind == KeyKind::Integer {
                    return Err(DictError::PrimaryKeyNotAllowed(name.clone()));
                }
                false
            } else {
                self.find_column(name).is_some_and(|c| c.nullable)
            };
            check_value(name, kind, nullable, value)?;
            values.insert(name.clone(), value.clone());
        }

        if key.kind == KeyKind::Text && !values.contains_key(&key.name) {
            return Err(DictError::MissingColumn(key.name.clone()));
        }
        if let Some(missing) = self
            .columns()
            .iter()
            .find(|c| !c.nullable && !values.contains_key(&c.name))
        {
            return Err(DictError::MissingColumn(missing.name.clone()));
        }

        Ok(Instance::from_values(values))
    }
}

impl Instance {
    /// Serialize the column values selected by `params`.
    ///
    /// Relationships listed in `params.follow` are not loaded here; the CRUD
    /// service embeds them after fetching from the store.
    pub fn asdict(&self, model: &ModelDef, params: &DictParams) -> Map<String, Value> {
        let pk = model.key().name.as_str();
        model
            .column_names()
            .filter(|name| !(params.exclude_pk && *name == pk))
            .filter(|name| params.includes(name))
            .map(|name| {
                let value = self.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    /// Update this instance from validated data.
    ///
    /// Keys that are not value columns, or are filtered out by `params`, are
    /// ignored. Supplying a primary key other than the current one is an
    /// error unless `allow_pk`.
    pub fn fromdict(
        &mut self,
        model: &ModelDef,
        data: &Map<String, Value>,
        params: &DictParams,
    ) -> Result<(), DictError> {
        let key = model.key();
        if let Some(value) = data.get(&key.name) {
            if !params.allow_pk && self.get(&key.name) != Some(value) {
                return Err(DictError::PrimaryKeyNotAllowed(key.name.clone()));
            }
        }

        for column in model.columns() {
            if !params.includes(&column.name) {
                continue;
            }
            if let Some(value) = data.get(&column.name) {
                check_value(&column.name, column.kind, column.nullable, value)?;
                self.set(column.name.clone(), value.clone());
            }
        }

        if params.allow_pk && params.includes(&key.name) {
            if let Some(value) = data.get(&key.name) {
                check_value(&key.name, key.kind.column_kind(), false, value)?;
                self.set(key.name.clone(), value.clone());
            }
        }

        Ok(())
    }
}

fn check_value(
    column: &str,
    kind: ColumnKind,
    nullable: bool,
    value: &Value,
) -> Result<(), DictError> {
    let ok = if value.is_null() {
        nullable
    } else {
        kind.accepts(value)
    };
    if ok {
        Ok(())
    } else {
        Err(DictError::TypeMismatch {
            column: column.to_string(),
            expected: if value.is_null() {
                format!("non-null {kind}")
            } else {
                kind.to_string()
            },
        })
    }
}
