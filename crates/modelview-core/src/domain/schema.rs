//! Mapping schemas for request payload validation.
//!
//! A [`MappingSchema`] turns a raw JSON payload into a tree of
//! [`FieldValue`]s or an [`Invalid`] error keyed by dotted field path.
//! Optional fields that were not supplied come back as
//! [`FieldValue::Absent`], which is distinct from an explicit null: updates
//! strip absent fields so they leave stored values untouched, while nulls are
//! written through.

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use serde_json::{Map, Number, Value};

/// Validates and converts request payloads.
pub trait Schema: Send + Sync {
    /// Validate `data` and convert it into typed field values.
    fn deserialize(&self, data: &Value) -> Result<Deserialized, Invalid>;
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No value was supplied for an optional field.
    Absent,
    Value(Value),
    Mapping(BTreeMap<String, FieldValue>),
    Sequence(Vec<FieldValue>),
}

impl FieldValue {
    /// Convert to plain JSON, dropping absent markers at every depth.
    ///
    /// Returns `None` when the value itself is absent.
    pub fn strip_absent(self) -> Option<Value> {
        match self {
            Self::Absent => None,
            Self::Value(v) => Some(v),
            Self::Mapping(fields) => Some(Value::Object(strip_absent(fields))),
            Self::Sequence(items) => Some(Value::Array(
                items.into_iter().filter_map(Self::strip_absent).collect(),
            )),
        }
    }

    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Remove absent markers from a mapping of field values, recursively.
pub fn strip_absent(fields: BTreeMap<String, FieldValue>) -> Map<String, Value> {
    fields
        .into_iter()
        .filter_map(|(k, v)| v.strip_absent().map(|v| (k, v)))
        .collect()
}

/// Output of a successful [`Schema::deserialize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deserialized(BTreeMap<String, FieldValue>);

impl Deserialized {
    pub const fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub const fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.0
    }

    /// Plain data with absent markers removed and explicit nulls kept.
    pub fn into_data(self) -> Map<String, Value> {
        strip_absent(self.0)
    }
}

/// Field-level validation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalid {
    errors: BTreeMap<String, String>,
}

impl Invalid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for the field at `path`. The first error wins.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors keyed by dotted field path.
    pub const fn asdict(&self) -> &BTreeMap<String, String> {
        &self.errors
    }
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid data")?;
        for (i, (path, message)) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{path}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Invalid {}

/// What to do when a field is not supplied (or is null and not nullable).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Missing {
    #[default]
    Required,
    /// Produce [`FieldValue::Absent`].
    Drop,
    Default(Value),
}

/// Post-conversion checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Character count of strings, item count of sequences.
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    OneOf(Vec<Value>),
}

impl Validator {
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::Length { min, max } => {
                let len = match value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(a) => a.len(),
                    _ => return Ok(()),
                };
                if let Some(min) = min.filter(|m| len < *m) {
                    return Err(format!("Shorter than minimum length {min}"));
                }
                if let Some(max) = max.filter(|m| len > *m) {
                    return Err(format!("Longer than maximum length {max}"));
                }
                Ok(())
            }
            Self::Range { min, max } => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                if let Some(min) = min.filter(|m| n < *m) {
                    return Err(format!("{value} is less than minimum value {min}"));
                }
                if let Some(max) = max.filter(|m| n > *m) {
                    return Err(format!("{value} is greater than maximum value {max}"));
                }
                Ok(())
            }
            Self::OneOf(choices) => {
                if choices.contains(value) {
                    Ok(())
                } else {
                    let listed: Vec<String> = choices.iter().map(display_plain).collect();
                    Err(format!(
                        "\"{}\" is not one of {}",
                        display_plain(value),
                        listed.join(", ")
                    ))
                }
            }
        }
    }
}

/// Type of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 timestamp, normalized on output.
    DateTime,
    Mapping(MappingSchema),
    Sequence(Box<SchemaNode>),
}

/// A single named field of a [`MappingSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    name: String,
    kind: FieldKind,
    missing: Missing,
    nullable: bool,
    validators: Vec<Validator>,
}

impl SchemaNode {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            missing: Missing::Required,
            nullable: false,
            validators: Vec::new(),
        }
    }

    #[must_use]
    pub fn missing(mut self, missing: Missing) -> Self {
        self.missing = missing;
        self
    }

    /// Shorthand for `missing(Missing::Drop)`.
    #[must_use]
    pub fn optional(self) -> Self {
        self.missing(Missing::Drop)
    }

    /// Accept an explicit JSON null as a value.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn deserialize(
        &self,
        raw: Option<&Value>,
        path: &str,
        invalid: &mut Invalid,
    ) -> Option<FieldValue> {
        let raw = match raw {
            Some(Value::Null) if self.nullable => return Some(FieldValue::Value(Value::Null)),
            Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() && matches!(self.kind, FieldKind::String) => {
                None
            }
            other => other,
        };

        let Some(raw) = raw else {
            return match &self.missing {
                Missing::Required => {
                    invalid.add(path, "Required");
                    None
                }
                Missing::Drop => Some(FieldValue::Absent),
                Missing::Default(value) => Some(FieldValue::Value(value.clone())),
            };
        };

        let value = match &self.kind {
            FieldKind::Mapping(schema) => {
                let Value::Object(map) = raw else {
                    invalid.add(
                        path,
                        format!("\"{}\" is not a mapping type", display_plain(raw)),
                    );
                    return None;
                };
                let before = invalid.errors.len();
                let fields = schema.deserialize_fields(map, path, invalid);
                return (invalid.errors.len() == before).then_some(FieldValue::Mapping(fields));
            }
            FieldKind::Sequence(item) => {
                let Value::Array(items) = raw else {
                    invalid.add(path, format!("\"{}\" is not iterable", display_plain(raw)));
                    return None;
                };
                if let Err(message) = self.run_validators(raw) {
                    invalid.add(path, message);
                    return None;
                }
                let before = invalid.errors.len();
                let values: Vec<FieldValue> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| {
                        item.deserialize(Some(v), &join(path, &i.to_string()), invalid)
                    })
                    .collect();
                return (invalid.errors.len() == before).then_some(FieldValue::Sequence(values));
            }
            kind => convert_scalar(kind, raw),
        };

        match value {
            Ok(value) => match self.run_validators(&value) {
                Ok(()) => Some(FieldValue::Value(value)),
                Err(message) => {
                    invalid.add(path, message);
                    None
                }
            },
            Err(message) => {
                invalid.add(path, message);
                None
            }
        }
    }

    fn run_validators(&self, value: &Value) -> Result<(), String> {
        self.validators.iter().try_for_each(|v| v.check(value))
    }
}

/// An ordered set of named fields. Keys not named by the schema are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSchema {
    nodes: Vec<SchemaNode>,
}

impl MappingSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node(mut self, node: SchemaNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    fn deserialize_fields(
        &self,
        data: &Map<String, Value>,
        path: &str,
        invalid: &mut Invalid,
    ) -> BTreeMap<String, FieldValue> {
        self.nodes
            .iter()
            .filter_map(|node| {
                node.deserialize(data.get(&node.name), &join(path, &node.name), invalid)
                    .map(|v| (node.name.clone(), v))
            })
            .collect()
    }
}

impl Schema for MappingSchema {
    fn deserialize(&self, data: &Value) -> Result<Deserialized, Invalid> {
        let mut invalid = Invalid::new();
        let Value::Object(map) = data else {
            invalid.add("", format!("\"{}\" is not a mapping type", display_plain(data)));
            return Err(invalid);
        };
        let fields = self.deserialize_fields(map, "", &mut invalid);
        if invalid.is_empty() {
            Ok(Deserialized(fields))
        } else {
            Err(invalid)
        }
    }
}

fn convert_scalar(kind: &FieldKind, raw: &Value) -> Result<Value, String> {
    match (kind, raw) {
        (FieldKind::String, Value::String(_)) => Ok(raw.clone()),
        (FieldKind::String, _) => Err(format!("{raw} is not a string")),
        (FieldKind::Integer, Value::Number(n)) if n.is_i64() => Ok(raw.clone()),
        (FieldKind::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| not_a_number(raw)),
        (FieldKind::Integer, _) => Err(not_a_number(raw)),
        (FieldKind::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| not_a_number(raw)),
        (FieldKind::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| not_a_number(raw)),
        (FieldKind::Float, _) => Err(not_a_number(raw)),
        (FieldKind::Boolean, Value::Bool(_)) => Ok(raw.clone()),
        (FieldKind::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(not_a_boolean(raw)),
        },
        (FieldKind::Boolean, _) => Err(not_a_boolean(raw)),
        (FieldKind::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Value::String(dt.to_rfc3339()))
            .map_err(|e| format!("Invalid date ({e})")),
        (FieldKind::DateTime, _) => Err("Invalid date".to_string()),
        (FieldKind::Mapping(_) | FieldKind::Sequence(_), _) => {
            unreachable!("container kinds are handled by SchemaNode::deserialize")
        }
    }
}

fn not_a_number(raw: &Value) -> String {
    format!("\"{}\" is not a number", display_plain(raw))
}

fn not_a_boolean(raw: &Value) -> String {
    format!(
        "\"{}\" is neither in (false, 0) nor in (true, 1)",
        display_plain(raw)
    )
}

fn display_plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> MappingSchema {
        MappingSchema::new()
            .node(
                SchemaNode::new("name", FieldKind::String).validator(Validator::Length {
                    min: Some(2),
                    max: Some(20),
                }),
            )
            .node(SchemaNode::new("nickname", FieldKind::String).optional().nullable())
            .node(
                SchemaNode::new("age", FieldKind::Integer)
                    .optional()
                    .validator(Validator::Range {
                        min: Some(0.0),
                        max: Some(150.0),
                    }),
            )
    }

    #[test]
    fn test_required_field_missing() {
        let err = person().deserialize(&json!({})).unwrap_err();
        assert_eq!(err.asdict().get("name").map(String::as_str), Some("Required"));
        assert_eq!(err.asdict().len(), 1);
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let err = person().deserialize(&json!({"name": ""})).unwrap_err();
        assert_eq!(err.asdict()["name"], "Required");
    }

    #[test]
    fn test_optional_fields_are_absent() {
        let out = person().deserialize(&json!({"name": "Ada"})).unwrap();
        assert!(out.get("nickname").unwrap().is_absent());
        assert!(out.get("age").unwrap().is_absent());
        assert_eq!(Value::Object(out.into_data()), json!({"name": "Ada"}));
    }

    #[test]
    fn test_explicit_null_is_preserved() {
        let out = person()
            .deserialize(&json!({"name": "Ada", "nickname": null}))
            .unwrap();
        assert_eq!(
            Value::Object(out.into_data()),
            json!({"name": "Ada", "nickname": null})
        );
    }

    #[test]
    fn test_null_on_non_nullable_is_missing() {
        let out = person().deserialize(&json!({"name": "Ada", "age": null})).unwrap();
        assert!(out.get("age").unwrap().is_absent());
    }

    #[test]
    fn test_integer_coercion_and_errors() {
        let out = person().deserialize(&json!({"name": "Ada", "age": "36"})).unwrap();
        assert_eq!(out.get("age"), Some(&FieldValue::Value(json!(36))));

        let err = person()
            .deserialize(&json!({"name": "Ada", "age": "old"}))
            .unwrap_err();
        assert_eq!(err.asdict()["age"], "\"old\" is not a number");
    }

    #[test]
    fn test_validators() {
        let err = person()
            .deserialize(&json!({"name": "A", "age": 200}))
            .unwrap_err();
        assert_eq!(err.asdict()["name"], "Shorter than minimum length 2");
        assert_eq!(err.asdict()["age"], "200 is greater than maximum value 150");
    }

    #[test]
    fn test_one_of() {
        let schema = MappingSchema::new().node(
            SchemaNode::new("color", FieldKind::String)
                .validator(Validator::OneOf(vec![json!("red"), json!("blue")])),
        );
        let err = schema.deserialize(&json!({"color": "green"})).unwrap_err();
        assert_eq!(err.asdict()["color"], "\"green\" is not one of red, blue");
    }

    #[test]
    fn test_not_a_mapping() {
        let err = person().deserialize(&json!([1, 2])).unwrap_err();
        assert!(err.asdict()[""].contains("is not a mapping type"));
    }

    #[test]
    fn test_nested_absent_is_stripped_recursively() {
        let address = MappingSchema::new()
            .node(SchemaNode::new("city", FieldKind::String))
            .node(SchemaNode::new("zip", FieldKind::String).optional());
        let schema = MappingSchema::new()
            .node(SchemaNode::new("address", FieldKind::Mapping(address)))
            .node(
                SchemaNode::new(
                    "tags",
                    FieldKind::Sequence(Box::new(SchemaNode::new("tag", FieldKind::String))),
                )
                .optional(),
            );

        let out = schema
            .deserialize(&json!({"address": {"city": "Oslo"}, "tags": ["a", "b"]}))
            .unwrap();
        assert_eq!(
            Value::Object(out.into_data()),
            json!({"address": {"city": "Oslo"}, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_nested_error_paths() {
        let address = MappingSchema::new().node(SchemaNode::new("city", FieldKind::String));
        let schema = MappingSchema::new()
            .node(SchemaNode::new("address", FieldKind::Mapping(address)))
            .node(SchemaNode::new(
                "scores",
                FieldKind::Sequence(Box::new(SchemaNode::new("score", FieldKind::Integer))),
            ));

        let err = schema
            .deserialize(&json!({"address": {}, "scores": [1, "x"]}))
            .unwrap_err();
        assert_eq!(err.asdict()["address.city"], "Required");
        assert_eq!(err.asdict()["scores.1"], "\"x\" is not a number");
    }

    #[test]
    fn test_strip_absent_in_sequences() {
        let value = FieldValue::Sequence(vec![
            FieldValue::Value(json!(1)),
            FieldValue::Absent,
            FieldValue::Value(json!(3)),
        ]);
        assert_eq!(value.strip_absent(), Some(json!([1, 3])));
        assert_eq!(FieldValue::Absent.strip_absent(), None);
    }

    #[test]
    fn test_datetime_and_boolean() {
        let schema = MappingSchema::new()
            .node(SchemaNode::new("at", FieldKind::DateTime))
            .node(
                SchemaNode::new("done", FieldKind::Boolean)
                    .missing(Missing::Default(json!(false))),
            );

        let out = schema
            .deserialize(&json!({"at": "2024-05-01T10:00:00+00:00"}))
            .unwrap();
        assert_eq!(
            Value::Object(out.into_data()),
            json!({"at": "2024-05-01T10:00:00+00:00", "done": false})
        );

        let err = schema.deserialize(&json!({"at": "soon", "done": "maybe"})).unwrap_err();
        assert!(err.asdict()["at"].starts_with("Invalid date"));
        assert!(err.asdict()["done"].contains("is neither in"));
    }
}
