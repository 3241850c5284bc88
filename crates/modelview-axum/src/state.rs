//! Shared state types.
//!
//! Each registered view gets its own router with a `ViewState`.

use std::sync::Arc;

use modelview_core::{CrudService, TemplateRenderer};

/// Everything a view's handlers need.
pub struct ViewContext {
    /// CRUD operations bound to the view and the store.
    pub service: CrudService,
    /// Renderer used for HTML clients.
    pub renderer: Arc<dyn TemplateRenderer>,
    /// URL path of the view's collection, e.g. `/note`.
    pub base_path: String,
}

impl ViewContext {
    /// URL of a single item, with the key percent-encoded.
    pub fn item_url(&self, key: &impl std::fmt::Display) -> String {
        format!(
            "{}/{}",
            self.base_path,
            urlencoding::encode(&key.to_string())
        )
    }
}

/// State shared across the handlers of one view.
pub type ViewState = Arc<ViewContext>;
