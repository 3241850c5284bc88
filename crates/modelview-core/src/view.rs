//! The `ModelView` trait: per-entity view configuration.
//!
//! A view is implemented once per exposed model. Only [`ModelView::model`]
//! and [`ModelView::schema`] are required; everything else has a default
//! that can be overridden. All of it is static configuration and is read
//! fresh on every request.

use std::fmt;

use serde_json::{Map, Value};

use crate::domain::{
    BaseQuery, DEFAULT_MAX_PAGE_LIMIT, DEFAULT_PAGE_LIMIT, DictParams, Direction, ListSettings,
    ModelDef, Schema, SortMap,
};

/// A CRUD action handled by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Get,
    Index,
    Post,
    Put,
    Delete,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Index => "index",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of a CRUD view over one model.
pub trait ModelView: Send + Sync + 'static {
    /// The model this view exposes.
    fn model(&self) -> &ModelDef;

    /// Schema used for both create and update unless overridden.
    fn schema(&self) -> &dyn Schema;

    fn create_schema(&self) -> Option<&dyn Schema> {
        None
    }

    fn update_schema(&self) -> Option<&dyn Schema> {
        None
    }

    /// Params used for both directions when the specific ones are unset.
    fn dict_params(&self) -> Option<&DictParams> {
        None
    }

    /// Params used when serializing instances.
    fn asdict_params(&self) -> Option<&DictParams> {
        None
    }

    /// Params used when constructing or updating instances.
    fn fromdict_params(&self) -> Option<&DictParams> {
        None
    }

    fn page_limit(&self) -> u32 {
        DEFAULT_PAGE_LIMIT
    }

    fn max_page_limit(&self) -> u32 {
        DEFAULT_MAX_PAGE_LIMIT
    }

    /// Default sort key for listings. `None` leaves listings unsorted.
    fn sortby(&self) -> Option<&str> {
        None
    }

    fn sort_direction(&self) -> Direction {
        Direction::Asc
    }

    fn sortby_map(&self) -> Option<&SortMap> {
        None
    }

    /// The query all lookups and listings build on.
    fn base_query(&self) -> BaseQuery {
        BaseQuery::default()
    }

    /// Template rendered for HTML clients.
    fn template(&self, action: Action) -> String {
        format!("{}/{}.html", self.model().route_segment(), action)
    }

    /// Extra variables merged into the template context of a successful
    /// HTML response.
    fn template_context(&self, _action: Action, _data: &Value) -> Map<String, Value> {
        Map::new()
    }

    fn resolved_create_schema(&self) -> &dyn Schema {
        self.create_schema().unwrap_or_else(|| self.schema())
    }

    fn resolved_update_schema(&self) -> &dyn Schema {
        self.update_schema().unwrap_or_else(|| self.schema())
    }

    fn resolved_asdict_params(&self) -> DictParams {
        self.asdict_params()
            .or_else(|| self.dict_params())
            .cloned()
            .unwrap_or_default()
    }

    fn resolved_fromdict_params(&self) -> DictParams {
        self.fromdict_params()
            .or_else(|| self.dict_params())
            .cloned()
            .unwrap_or_default()
    }

    fn list_settings(&self) -> ListSettings {
        ListSettings {
            page_limit: self.page_limit(),
            max_page_limit: self.max_page_limit(),
            sortby: self.sortby().map(str::to_string),
            direction: self.sort_direction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnKind, FieldKind, MappingSchema, SchemaNode};
    use serde_json::json;

    struct Plain {
        model: ModelDef,
        schema: MappingSchema,
    }

    impl ModelView for Plain {
        fn model(&self) -> &ModelDef {
            &self.model
        }
        fn schema(&self) -> &dyn Schema {
            &self.schema
        }
    }

    struct Tuned {
        inner: Plain,
        update: MappingSchema,
        dict: DictParams,
        out: DictParams,
    }

    impl ModelView for Tuned {
        fn model(&self) -> &ModelDef {
            &self.inner.model
        }
        fn schema(&self) -> &dyn Schema {
            &self.inner.schema
        }
        fn update_schema(&self) -> Option<&dyn Schema> {
            Some(&self.update)
        }
        fn dict_params(&self) -> Option<&DictParams> {
            Some(&self.dict)
        }
        fn asdict_params(&self) -> Option<&DictParams> {
            Some(&self.out)
        }
        fn sortby(&self) -> Option<&str> {
            Some("name")
        }
    }

    fn plain() -> Plain {
        Plain {
            model: ModelDef::new("Widget").column(Column::new("name", ColumnKind::Text)),
            schema: MappingSchema::new().node(SchemaNode::new("name", FieldKind::String)),
        }
    }

    #[test]
    fn test_defaults() {
        let view = plain();
        assert_eq!(view.template(Action::Index), "widget/index.html");
        assert_eq!(view.list_settings(), ListSettings::default());
        assert_eq!(view.resolved_asdict_params(), DictParams::default());
        assert!(view.template_context(Action::Get, &json!({})).is_empty());
    }

    #[test]
    fn test_schema_fallbacks() {
        let view = Tuned {
            inner: plain(),
            update: MappingSchema::new()
                .node(SchemaNode::new("name", FieldKind::String).optional()),
            dict: DictParams::new().exclude(["secret"]),
            out: DictParams::new().exclude_pk(),
        };

        // general schema requires name, the update schema does not
        assert!(view.resolved_create_schema().deserialize(&json!({})).is_err());
        assert!(view.resolved_update_schema().deserialize(&json!({})).is_ok());

        assert_eq!(view.resolved_asdict_params(), DictParams::new().exclude_pk());
        assert_eq!(
            view.resolved_fromdict_params(),
            DictParams::new().exclude(["secret"])
        );
        assert_eq!(view.list_settings().sortby.as_deref(), Some("name"));
    }
}
