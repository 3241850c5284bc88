//! A small notes view served by the `modelview` binary.

use modelview_core::{
    Column, ColumnKind, Direction, FieldKind, MappingSchema, Missing, ModelDef, ModelView,
    Schema, SchemaNode, SortMap, Validator,
};
use serde_json::Value;

/// Notes with a title, optional body and a pinned flag.
pub struct NoteView {
    model: ModelDef,
    schema: MappingSchema,
    update_schema: MappingSchema,
    sort_map: SortMap,
}

fn title() -> SchemaNode {
    SchemaNode::new("title", FieldKind::String).validator(Validator::Length {
        min: Some(1),
        max: Some(200),
    })
}

impl NoteView {
    pub fn new() -> Self {
        let model = ModelDef::new("Note")
            .table("notes")
            .column(Column::new("title", ColumnKind::Text).not_null())
            .column(Column::new("body", ColumnKind::Text))
            .column(Column::new("pinned", ColumnKind::Boolean).not_null())
            .column(Column::new("created_at", ColumnKind::Timestamp));

        let schema = MappingSchema::new()
            .node(title())
            .node(SchemaNode::new("body", FieldKind::String).optional().nullable())
            .node(
                SchemaNode::new("pinned", FieldKind::Boolean)
                    .missing(Missing::Default(Value::Bool(false))),
            )
            .node(SchemaNode::new("created_at", FieldKind::DateTime).optional());

        let update_schema = MappingSchema::new()
            .node(title().optional())
            .node(SchemaNode::new("body", FieldKind::String).optional().nullable())
            .node(SchemaNode::new("pinned", FieldKind::Boolean).optional());

        Self {
            model,
            schema,
            update_schema,
            sort_map: SortMap::new().raw("pinned_first", "\"pinned\" DESC, \"id\""),
        }
    }
}

impl Default for NoteView {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelView for NoteView {
    fn model(&self) -> &ModelDef {
        &self.model
    }

    fn schema(&self) -> &dyn Schema {
        &self.schema
    }

    fn update_schema(&self) -> Option<&dyn Schema> {
        Some(&self.update_schema)
    }

    fn sortby(&self) -> Option<&str> {
        Some("id")
    }

    fn sort_direction(&self) -> Direction {
        Direction::Desc
    }

    fn sortby_map(&self) -> Option<&SortMap> {
        Some(&self.sort_map)
    }
}
