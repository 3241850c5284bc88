//! Domain types for model views.
//!
//! These are pure data types with no storage or HTTP dependencies.

pub mod dict;
pub mod instance;
pub mod listing;
pub mod model;
pub mod schema;

pub use dict::{DictError, DictParams};
pub use instance::Instance;
pub use listing::{
    BaseQuery, DEFAULT_MAX_PAGE_LIMIT, DEFAULT_PAGE_LIMIT, Direction, Filter, ListParamError,
    ListQuery, ListSettings, Ordering, Page, PageRequest, SortExpr, SortMap,
};
pub use model::{
    Column, ColumnKind, KeyKind, KeyValue, ModelDef, PrimaryKey, RelationKind, Relationship,
};
pub use schema::{
    Deserialized, FieldKind, FieldValue, Invalid, MappingSchema, Missing, Schema, SchemaNode,
    Validator, strip_absent,
};
