//! CRUD dispatch for a single model view.
//!
//! Each operation reads the view's configuration, validates input through
//! its schema, and delegates persistence to the injected [`ModelStore`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    DictError, DictParams, Instance, Invalid, KeyValue, ListParamError, ListQuery, ModelDef,
    RelationKind,
};
use crate::ports::{ModelStore, RepositoryError};
use crate::view::ModelView;

/// Errors surfaced by [`CrudService`].
#[derive(Debug, Error)]
pub enum CrudError {
    /// No visible row matches the requested id, or the id cannot be parsed.
    #[error("{0} not found")]
    NotFound(String),

    /// The request body failed schema validation.
    #[error(transparent)]
    Invalid(#[from] Invalid),

    /// A list query parameter was rejected.
    #[error(transparent)]
    BadRequest(#[from] ListParamError),

    /// Validated data did not fit the model.
    #[error(transparent)]
    Dict(#[from] DictError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One page of serialized items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub items: Vec<Value>,
    pub count: u64,
    pub limit: u32,
    pub offset: u64,
}

/// A newly created item together with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Saved {
    pub key: KeyValue,
    pub item: Value,
}

type SerializeFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, CrudError>> + Send + 'a>>;

/// Service implementing the five CRUD operations of a [`ModelView`].
pub struct CrudService {
    store: Arc<dyn ModelStore>,
    view: Arc<dyn ModelView>,
}

impl CrudService {
    pub fn new(store: Arc<dyn ModelStore>, view: Arc<dyn ModelView>) -> Self {
        Self { store, view }
    }

    pub fn view(&self) -> &dyn ModelView {
        self.view.as_ref()
    }

    /// Fetch and serialize one item.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::NotFound` when `raw_id` does not parse as the
    /// model's key or no visible row has it.
    pub async fn get(&self, raw_id: &str) -> Result<Value, CrudError> {
        let (_, instance) = self.fetch(raw_id).await?;
        self.serialize(&instance).await
    }

    /// List one page of items.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::BadRequest` for a malformed `limit`, `offset`,
    /// `sortby` or `direction`.
    pub async fn list(&self, query: &ListQuery) -> Result<Listing, CrudError> {
        let model = self.view.model();
        let page = query.resolve(&self.view.list_settings(), model, self.view.sortby_map())?;
        tracing::debug!(
            model = model.name(),
            limit = page.limit,
            offset = page.offset,
            "Listing items"
        );

        let result = self
            .store
            .list(model, &self.view.base_query(), &page)
            .await?;

        let mut items = Vec::with_capacity(result.items.len());
        for instance in &result.items {
            items.push(self.serialize(instance).await?);
        }

        Ok(Listing {
            items,
            count: result.count,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Validate `payload`, build a new instance and persist it.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::Invalid` when the create schema rejects the
    /// payload; nothing is constructed or stored in that case.
    pub async fn create(&self, payload: &Value) -> Result<Saved, CrudError> {
        let model = self.view.model();
        let data = self
            .view
            .resolved_create_schema()
            .deserialize(payload)
            .inspect_err(|e| tracing::debug!(model = model.name(), "Create rejected: {e}"))?
            .into_data();

        let instance = model.construct(&data, &self.view.resolved_fromdict_params())?;
        let stored = self.store.insert(model, &instance).await?;
        let key = stored.key(model).ok_or_else(|| {
            RepositoryError::Storage(format!("Inserted {} has no primary key", model.name()))
        })?;
        tracing::info!(model = model.name(), %key, "Created item");

        Ok(Saved {
            item: self.serialize(&stored).await?,
            key,
        })
    }

    /// Validate `payload` and apply it to an existing item.
    ///
    /// Fields absent from the payload keep their stored value; an explicit
    /// null clears a nullable column.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::NotFound` before validating when the item does
    /// not exist, and `CrudError::Invalid` when the update schema rejects
    /// the payload or the model cannot take it (for example a changed
    /// primary key).
    pub async fn update(&self, raw_id: &str, payload: &Value) -> Result<Value, CrudError> {
        let model = self.view.model();
        let (key, mut instance) = self.fetch(raw_id).await?;
        let data = self
            .view
            .resolved_update_schema()
            .deserialize(payload)
            .inspect_err(|e| tracing::debug!(model = model.name(), %key, "Update rejected: {e}"))?
            .into_data();

        instance
            .fromdict(model, &data, &self.view.resolved_fromdict_params())
            .map_err(rejected_update)?;
        let stored = self.store.update(model, &key, &instance).await?;
        tracing::info!(model = model.name(), %key, "Updated item");

        self.serialize(&stored).await
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns `CrudError::NotFound` when no visible row has `raw_id`.
    pub async fn delete(&self, raw_id: &str) -> Result<(), CrudError> {
        let model = self.view.model();
        let (key, _) = self.fetch(raw_id).await?;
        self.store.delete(model, &key).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => not_found(model, raw_id),
            other => CrudError::from(other),
        })?;
        tracing::info!(model = model.name(), %key, "Deleted item");
        Ok(())
    }

    async fn fetch(&self, raw_id: &str) -> Result<(KeyValue, Instance), CrudError> {
        let model = self.view.model();
        let key = model
            .key()
            .kind
            .parse(raw_id)
            .ok_or_else(|| not_found(model, raw_id))?;
        let instance = self
            .store
            .get(model, &self.view.base_query(), &key)
            .await?
            .ok_or_else(|| not_found(model, raw_id))?;
        Ok((key, instance))
    }

    async fn serialize(&self, instance: &Instance) -> Result<Value, CrudError> {
        let params = self.view.resolved_asdict_params();
        self.serialize_with(self.view.model(), instance, &params)
            .await
    }

    // Boxed so that followed relationships can recurse.
    fn serialize_with<'a>(
        &'a self,
        model: &'a ModelDef,
        instance: &'a Instance,
        params: &'a DictParams,
    ) -> SerializeFuture<'a> {
        Box::pin(async move {
            let mut out = instance.asdict(model, params);
            for (name, nested) in &params.follow {
                let relationship = model
                    .find_relationship(name)
                    .ok_or_else(|| DictError::UnknownRelationship(name.clone()))?;
                let related = self
                    .store
                    .load_related(model, instance, relationship)
                    .await?;
                let target = relationship.target.as_ref();

                let value = match relationship.kind {
                    RelationKind::One => match related.first() {
                        Some(row) => self.serialize_with(target, row, nested).await?,
                        None => Value::Null,
                    },
                    RelationKind::Many => {
                        let mut rows = Vec::with_capacity(related.len());
                        for row in &related {
                            rows.push(self.serialize_with(target, row, nested).await?);
                        }
                        Value::Array(rows)
                    }
                };
                out.insert(name.clone(), value);
            }
            Ok(Value::Object(out))
        })
    }
}

fn not_found(model: &ModelDef, raw_id: &str) -> CrudError {
    CrudError::NotFound(format!("{} '{raw_id}'", model.name()))
}

// Reports what the model refused as a field error on the payload.
fn rejected_update(err: DictError) -> CrudError {
    let mut invalid = Invalid::new();
    invalid.add(err.field(), err.to_string());
    CrudError::Invalid(invalid)
}
