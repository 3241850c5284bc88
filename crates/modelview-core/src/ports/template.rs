//! Template rendering port.
//!
//! Views only choose a template name and build its context; turning that into
//! HTML is up to whatever engine the application plugs in here.

use serde_json::Value;
use thiserror::Error;

/// Errors from a template engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No template with this name is registered.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Render failed: {0}")]
    Failed(String),
}

/// Renders a named template with a JSON context.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError>;
}

/// Renderer for JSON-only applications: every template is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

impl TemplateRenderer for NoopRenderer {
    fn render(&self, template: &str, _context: &Value) -> Result<String, RenderError> {
        Err(RenderError::TemplateNotFound(template.to_string()))
    }
}
