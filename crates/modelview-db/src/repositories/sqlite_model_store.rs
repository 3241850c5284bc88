//! `SQLite` implementation of the `ModelStore` trait.
//!
//! Queries are generated from the [`ModelDef`] at call time, so one store
//! serves every registered model.

use async_trait::async_trait;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, Row, SqlitePool};

use modelview_core::{
    BaseQuery, Filter, Instance, KeyValue, ModelDef, ModelStore, Page, PageRequest,
    RelationKind, Relationship, RepositoryError, SortExpr,
};

use super::row_mappers::{
    SqlValue, map_write_error, push_column_value, quote_ident, row_to_instance, select_columns,
};

/// `SQLite` implementation of the `ModelStore` trait.
///
/// This struct holds a connection pool; the model to operate on is passed
/// with every call.
pub struct SqliteModelStore {
    pool: SqlitePool,
}

impl SqliteModelStore {
    /// Create a new `SQLite` model store.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn key_value(key: &KeyValue) -> SqlValue {
    match key {
        KeyValue::Integer(i) => SqlValue::Integer(*i),
        KeyValue::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn push_conjunction(builder: &mut QueryBuilder<'_, Sqlite>, first: &mut bool) {
    builder.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

/// Append `WHERE` conditions for the scope filters plus an optional key match.
fn push_where(
    builder: &mut QueryBuilder<'_, Sqlite>,
    model: &ModelDef,
    scope: &BaseQuery,
    key: Option<&KeyValue>,
) -> Result<(), RepositoryError> {
    let mut first = true;
    for filter in scope.filters() {
        push_conjunction(builder, &mut first);
        match filter {
            Filter::Eq(column, value) if value.is_null() => {
                builder.push(quote_ident(column)).push(" IS NULL");
            }
            Filter::Eq(column, value) => {
                builder.push(quote_ident(column)).push(" = ");
                push_column_value(builder, model, column, value)?;
            }
            Filter::IsNull(column) => {
                builder.push(quote_ident(column)).push(" IS NULL");
            }
            Filter::NotNull(column) => {
                builder.push(quote_ident(column)).push(" IS NOT NULL");
            }
        }
    }

    if let Some(key) = key {
        push_conjunction(builder, &mut first);
        builder.push(quote_ident(&model.key().name)).push(" = ");
        key_value(key).push_bind(builder);
    }
    Ok(())
}

fn select_from(model: &ModelDef) -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(format!(
        "SELECT {} FROM {}",
        select_columns(model),
        quote_ident(model.table_name())
    ))
}

#[async_trait]
impl ModelStore for SqliteModelStore {
    async fn get(
        &self,
        model: &ModelDef,
        scope: &BaseQuery,
        key: &KeyValue,
    ) -> Result<Option<Instance>, RepositoryError> {
        let mut builder = select_from(model);
        push_where(&mut builder, model, scope, Some(key))?;

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(|r| row_to_instance(model, &r)).transpose()
    }

    async fn list(
        &self,
        model: &ModelDef,
        scope: &BaseQuery,
        page: &PageRequest,
    ) -> Result<Page, RepositoryError> {
        let mut count_query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT COUNT(*) FROM {}",
            quote_ident(model.table_name())
        ));
        push_where(&mut count_query, model, scope, None)?;
        let count: i64 = count_query
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?
            .try_get(0)
            .map_err(storage)?;

        let mut builder = select_from(model);
        push_where(&mut builder, model, scope, None)?;
        if let Some(order) = &page.order {
            builder.push(" ORDER BY ");
            match &order.expr {
                SortExpr::Column(column) => builder.push(quote_ident(column)),
                SortExpr::Raw(expr) => builder.push(expr),
            };
            builder.push(" ").push(order.direction.as_sql());
        }
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        Ok(Page {
            items: rows
                .iter()
                .map(|r| row_to_instance(model, r))
                .collect::<Result<_, _>>()?,
            count: u64::try_from(count).unwrap_or_default(),
        })
    }

    async fn insert(
        &self,
        model: &ModelDef,
        instance: &Instance,
    ) -> Result<Instance, RepositoryError> {
        let table = quote_ident(model.table_name());
        let present: Vec<&str> = model
            .column_names()
            .filter(|name| instance.get(name).is_some())
            .collect();

        let mut builder = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {table}"));
        if present.is_empty() {
            builder.push(" DEFAULT VALUES");
        } else {
            builder.push(" (");
            builder.push(
                present
                    .iter()
                    .map(|name| quote_ident(name))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            builder.push(") VALUES (");
            for (i, name) in present.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                let value = instance.get(name).unwrap_or(&serde_json::Value::Null);
                push_column_value(&mut builder, model, name, value)?;
            }
            builder.push(")");
        }
        builder.push(" RETURNING ").push(select_columns(model));

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        let stored = row_to_instance(model, &row)?;
        tracing::debug!(table = model.table_name(), "Inserted row");
        Ok(stored)
    }

    async fn update(
        &self,
        model: &ModelDef,
        key: &KeyValue,
        instance: &Instance,
    ) -> Result<Instance, RepositoryError> {
        let present: Vec<&str> = model
            .column_names()
            .filter(|name| instance.get(name).is_some())
            .collect();
        if present.is_empty() {
            return self
                .get(model, &BaseQuery::new(), key)
                .await?
                .ok_or_else(|| RepositoryError::NotFound(format!("{} {key}", model.name())));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE {} SET ",
            quote_ident(model.table_name())
        ));
        for (i, name) in present.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(quote_ident(name)).push(" = ");
            let value = instance.get(name).unwrap_or(&serde_json::Value::Null);
            push_column_value(&mut builder, model, name, value)?;
        }
        push_where(&mut builder, model, &BaseQuery::new(), Some(key))?;
        builder.push(" RETURNING ").push(select_columns(model));

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| RepositoryError::NotFound(format!("{} {key}", model.name())))?;

        row_to_instance(model, &row)
    }

    async fn delete(&self, model: &ModelDef, key: &KeyValue) -> Result<(), RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "DELETE FROM {}",
            quote_ident(model.table_name())
        ));
        push_where(&mut builder, model, &BaseQuery::new(), Some(key))?;

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("{} {key}", model.name())));
        }

        Ok(())
    }

    async fn load_related(
        &self,
        model: &ModelDef,
        instance: &Instance,
        relationship: &Relationship,
    ) -> Result<Vec<Instance>, RepositoryError> {
        let Some(local) = instance
            .get(&relationship.local_column)
            .filter(|v| !v.is_null())
        else {
            return Ok(Vec::new());
        };
        let target = relationship.target.as_ref();
        tracing::trace!(
            model = model.name(),
            relationship = %relationship.name,
            "Loading related rows"
        );

        let mut builder = select_from(target);
        builder
            .push(" WHERE ")
            .push(quote_ident(&relationship.remote_column))
            .push(" = ");
        push_column_value(&mut builder, target, &relationship.remote_column, local)?;
        builder
            .push(" ORDER BY ")
            .push(quote_ident(&target.key().name));
        if relationship.kind == RelationKind::One {
            builder.push(" LIMIT 1");
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter().map(|r| row_to_instance(target, r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::setup::setup_test_database;
    use modelview_core::{Column, ColumnKind, Direction, Ordering};
    use serde_json::{Value, json};

    fn author() -> ModelDef {
        ModelDef::new("Author")
            .column(Column::new("name", ColumnKind::Text).not_null().unique())
            .column(Column::new("rating", ColumnKind::Real))
            .column(Column::new("active", ColumnKind::Boolean))
            .column(Column::new("tags", ColumnKind::Json))
    }

    fn book() -> ModelDef {
        ModelDef::new("Book")
            .column(Column::new("title", ColumnKind::Text).not_null())
            .column(Column::new("author_id", ColumnKind::Integer))
    }

    fn instance(value: Value) -> Instance {
        match value {
            Value::Object(m) => Instance::from(m),
            other => panic!("not an object: {other}"),
        }
    }

    async fn store() -> SqliteModelStore {
        let pool = setup_test_database(&[&author(), &book()]).await.unwrap();
        SqliteModelStore::new(pool)
    }

    fn page(limit: u32, offset: u64, order: Option<Ordering>) -> PageRequest {
        PageRequest {
            limit,
            offset,
            order,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_key_and_round_trips_kinds() {
        let store = store().await;
        let model = author();

        let stored = store
            .insert(
                &model,
                &instance(json!({"name": "Ada", "rating": 4.5, "active": true, "tags": ["x", 1]})),
            )
            .await
            .unwrap();

        assert_eq!(stored.key(&model), Some(KeyValue::Integer(1)));
        assert_eq!(stored.get("active"), Some(&json!(true)));
        assert_eq!(stored.get("tags"), Some(&json!(["x", 1])));
        assert_eq!(stored.get("rating"), Some(&json!(4.5)));

        let fetched = store
            .get(&model, &BaseQuery::new(), &KeyValue::Integer(1))
            .await
            .unwrap();
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = store().await;
        let found = store
            .get(&author(), &BaseQuery::new(), &KeyValue::Integer(99))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_unique_violation_names_column() {
        let store = store().await;
        let model = author();
        store
            .insert(&model, &instance(json!({"name": "Ada"})))
            .await
            .unwrap();

        let err = store
            .insert(&model, &instance(json!({"name": "Ada"})))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation { column } if column == "name"));
    }

    #[tokio::test]
    async fn test_list_orders_pages_and_counts() {
        let store = store().await;
        let model = book();
        for title in ["c", "a", "d", "b"] {
            store
                .insert(&model, &instance(json!({"title": title})))
                .await
                .unwrap();
        }

        let order = Ordering {
            expr: SortExpr::Column("title".to_string()),
            direction: Direction::Desc,
        };
        let result = store
            .list(&model, &BaseQuery::new(), &page(2, 1, Some(order)))
            .await
            .unwrap();

        assert_eq!(result.count, 4);
        let titles: Vec<_> = result.items.iter().map(|i| i.get("title").cloned()).collect();
        assert_eq!(titles, vec![Some(json!("c")), Some(json!("b"))]);
    }

    #[tokio::test]
    async fn test_base_query_scopes_reads() {
        let store = store().await;
        let model = author();
        store
            .insert(&model, &instance(json!({"name": "Ada", "active": true})))
            .await
            .unwrap();
        store
            .insert(&model, &instance(json!({"name": "Bob", "active": false})))
            .await
            .unwrap();

        let scope = BaseQuery::new().filter_eq("active", json!(true));
        let result = store.list(&model, &scope, &page(10, 0, None)).await.unwrap();
        assert_eq!(result.count, 1);

        let hidden = store
            .get(&model, &scope, &KeyValue::Integer(2))
            .await
            .unwrap();
        assert!(hidden.is_none());

        let scope = BaseQuery::new().filter(Filter::IsNull("rating".to_string()));
        let result = store.list(&model, &scope, &page(10, 0, None)).await.unwrap();
        assert_eq!(result.count, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = store().await;
        let model = author();
        let mut stored = store
            .insert(&model, &instance(json!({"name": "Ada", "rating": 3.0})))
            .await
            .unwrap();

        stored.set("rating", Value::Null);
        let updated = store
            .update(&model, &KeyValue::Integer(1), &stored)
            .await
            .unwrap();
        assert_eq!(updated.get("rating"), Some(&Value::Null));
        assert_eq!(updated.get("name"), Some(&json!("Ada")));

        store.delete(&model, &KeyValue::Integer(1)).await.unwrap();
        assert!(matches!(
            store.delete(&model, &KeyValue::Integer(1)).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            store.update(&model, &KeyValue::Integer(1), &stored).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_related() {
        let store = store().await;
        let authors = author();
        let books = Arc::new(book());
        let ada = store
            .insert(&authors, &instance(json!({"name": "Ada"})))
            .await
            .unwrap();
        for title in ["Notes", "Sketches"] {
            store
                .insert(&books, &instance(json!({"title": title, "author_id": 1})))
                .await
                .unwrap();
        }
        store
            .insert(&books, &instance(json!({"title": "Other", "author_id": 2})))
            .await
            .unwrap();

        let many = Relationship {
            name: "books".to_string(),
            target: Arc::clone(&books),
            local_column: "id".to_string(),
            remote_column: "author_id".to_string(),
            kind: RelationKind::Many,
        };
        let related = store.load_related(&authors, &ada, &many).await.unwrap();
        assert_eq!(related.len(), 2);

        let one = Relationship {
            kind: RelationKind::One,
            ..many
        };
        let related = store.load_related(&authors, &ada, &one).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].get("title"), Some(&json!("Notes")));
    }
}
