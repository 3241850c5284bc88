//! Model instances.

use serde_json::{Map, Value};

use super::model::{KeyValue, ModelDef};

/// A row of some [`ModelDef`], as a mapping of column name to value.
///
/// A freshly constructed instance may lack its primary key until the store
/// assigns one on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    values: Map<String, Value>,
}

impl Instance {
    pub const fn from_values(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Primary key of this instance, if it has one.
    pub fn key(&self, model: &ModelDef) -> Option<KeyValue> {
        let key = model.key();
        self.values
            .get(&key.name)
            .and_then(|v| key.kind.from_json(v))
    }
}

impl From<Map<String, Value>> for Instance {
    fn from(values: Map<String, Value>) -> Self {
        Self::from_values(values)
    }
}
