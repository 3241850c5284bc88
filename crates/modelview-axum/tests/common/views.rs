//! Views and renderer used by the integration tests.

use modelview_core::{
    Action, Column, ColumnKind, FieldKind, KeyKind, MappingSchema, ModelDef, ModelView,
    RenderError, Schema, SchemaNode, SortMap, TemplateRenderer, Validator,
};
use serde_json::{Map, Value};

/// Largest page `PersonView` will return.
pub const PERSON_MAX_PAGE: u32 = 3;

/// People with a unique email, listed by id.
pub struct PersonView {
    model: ModelDef,
    schema: MappingSchema,
    update_schema: MappingSchema,
    sort_map: SortMap,
}

impl PersonView {
    pub fn new() -> Self {
        let model = ModelDef::new("Person")
            .column(Column::new("name", ColumnKind::Text).not_null())
            .column(Column::new("email", ColumnKind::Text).unique())
            .column(Column::new("nickname", ColumnKind::Text))
            .column(Column::new("age", ColumnKind::Integer));

        let name = || {
            SchemaNode::new("name", FieldKind::String).validator(Validator::Length {
                min: Some(1),
                max: Some(50),
            })
        };
        let rest = |schema: MappingSchema| {
            schema
                .node(SchemaNode::new("email", FieldKind::String).optional())
                .node(
                    SchemaNode::new("nickname", FieldKind::String)
                        .optional()
                        .nullable(),
                )
                .node(
                    SchemaNode::new("age", FieldKind::Integer)
                        .optional()
                        .validator(Validator::Range {
                            min: Some(0.0),
                            max: None,
                        }),
                )
        };

        Self {
            model,
            schema: rest(MappingSchema::new().node(name())),
            update_schema: rest(MappingSchema::new().node(name().optional())),
            sort_map: SortMap::new().raw("newest", "\"id\" DESC"),
        }
    }
}

impl ModelView for PersonView {
    fn model(&self) -> &ModelDef {
        &self.model
    }

    fn schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn update_schema(&self) -> Option<&dyn Schema> {
        Some(&self.update_schema)
    }

    fn max_page_limit(&self) -> u32 {
        PERSON_MAX_PAGE
    }

    fn sortby(&self) -> Option<&str> {
        Some("id")
    }

    fn sortby_map(&self) -> Option<&SortMap> {
        Some(&self.sort_map)
    }

    fn template_context(&self, action: Action, _data: &Value) -> Map<String, Value> {
        Map::from_iter([("title".to_string(), Value::from(format!("people {action}")))])
    }
}

/// Tags keyed by a client supplied slug.
pub struct TagView {
    model: ModelDef,
    schema: MappingSchema,
}

impl TagView {
    pub fn new() -> Self {
        Self {
            model: ModelDef::new("Tag")
                .table("tags")
                .primary_key("slug", KeyKind::Text)
                .column(Column::new("label", ColumnKind::Text)),
            schema: MappingSchema::new()
                .node(SchemaNode::new("slug", FieldKind::String))
                .node(SchemaNode::new("label", FieldKind::String).optional()),
        }
    }
}

impl ModelView for TagView {
    fn model(&self) -> &ModelDef {
        &self.model
    }

    fn schema(&self) -> &dyn Schema {
        &self.schema
    }
}

/// Knows a single template, `person/get.html`.
pub struct PersonPageRenderer;

impl TemplateRenderer for PersonPageRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        if template != "person/get.html" {
            return Err(RenderError::TemplateNotFound(template.to_string()));
        }
        Ok(format!(
            "<h1>{}</h1><p>{}</p>",
            context["title"].as_str().unwrap_or_default(),
            context["item"]["name"].as_str().unwrap_or_default()
        ))
    }
}
