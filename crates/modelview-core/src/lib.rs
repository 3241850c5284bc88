//! Core domain types, ports and CRUD dispatch for modelview.
//!
//! A [`ModelView`] describes how one declarative [`ModelDef`] is exposed:
//! which schema validates input, which fields are serialized, how listings
//! are paged and sorted. [`CrudService`] runs the five CRUD operations for a
//! view against any [`ModelStore`]. HTTP and storage live in adapter crates.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;
pub mod view;

pub use domain::{
    BaseQuery, Column, ColumnKind, Deserialized, DictError, DictParams, Direction, FieldKind,
    FieldValue, Filter, Instance, Invalid, KeyKind, KeyValue, ListParamError, ListQuery,
    ListSettings, MappingSchema, Missing, ModelDef, Ordering, Page, PageRequest, PrimaryKey,
    RelationKind, Relationship, Schema, SchemaNode, SortExpr, SortMap, Validator,
};
pub use ports::{ModelStore, NoopRenderer, RenderError, RepositoryError, TemplateRenderer};
pub use services::{CrudError, CrudService, Listing, Saved};
pub use view::{Action, ModelView};
