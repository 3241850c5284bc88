//! Model store trait definition.
//!
//! This port defines the interface for instance persistence. Implementations
//! must handle all query construction and storage details internally.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{BaseQuery, Instance, KeyValue, ModelDef, Page, PageRequest, Relationship};

/// Persistence for instances of any [`ModelDef`].
///
/// Every read goes through the caller's [`BaseQuery`], so views can narrow
/// what is visible without the store knowing about views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Fetch one instance by primary key, or `None` when it is not visible.
    async fn get(
        &self,
        model: &ModelDef,
        scope: &BaseQuery,
        key: &KeyValue,
    ) -> Result<Option<Instance>, RepositoryError>;

    /// Fetch one page of instances plus the unpaginated count.
    async fn list(
        &self,
        model: &ModelDef,
        scope: &BaseQuery,
        page: &PageRequest,
    ) -> Result<Page, RepositoryError>;

    /// Persist a new instance and return it as stored, key included.
    async fn insert(&self, model: &ModelDef, instance: &Instance)
    -> Result<Instance, RepositoryError>;

    /// Persist changes to the row stored under `key` and return it as stored.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the row doesn't exist.
    async fn update(
        &self,
        model: &ModelDef,
        key: &KeyValue,
        instance: &Instance,
    ) -> Result<Instance, RepositoryError>;

    /// Delete an instance by primary key.
    ///
    /// Returns `Err(RepositoryError::NotFound)` if the row doesn't exist.
    async fn delete(&self, model: &ModelDef, key: &KeyValue) -> Result<(), RepositoryError>;

    /// Load the rows of `relationship.target` related to `instance`.
    async fn load_related(
        &self,
        model: &ModelDef,
        instance: &Instance,
        relationship: &Relationship,
    ) -> Result<Vec<Instance>, RepositoryError>;
}
