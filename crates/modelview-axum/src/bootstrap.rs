//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where the store, renderer and views are
//! wired together for the web adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use modelview_core::{
    CrudService, ModelDef, ModelStore, ModelView, NoopRenderer, TemplateRenderer,
};
use modelview_db::{SqliteModelStore, setup_database};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://modelview.db";

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// `SQLite` connection URL.
    pub database_url: String,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Create config with default values.
    pub fn with_defaults() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            cors: CorsConfig::default(),
        }
    }

    /// Create config from `MODELVIEW_PORT`, `MODELVIEW_DATABASE_URL` and
    /// `MODELVIEW_CORS_ORIGINS` (comma separated), falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `MODELVIEW_PORT` is set but not a valid port.
    pub fn from_env() -> Result<Self> {
        let vars: BTreeMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with("MODELVIEW_"))
            .collect();
        Self::from_vars(&vars)
    }

    fn from_vars(vars: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = Self::with_defaults();
        if let Some(port) = vars.get("MODELVIEW_PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid MODELVIEW_PORT: {port}"))?;
        }
        if let Some(url) = vars.get("MODELVIEW_DATABASE_URL") {
            config.database_url.clone_from(url);
        }
        if let Some(origins) = vars.get("MODELVIEW_CORS_ORIGINS") {
            config = config.with_allowed_origins(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        Ok(config)
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

/// Application context for the Axum adapter.
///
/// Holds the store and renderer shared by all views, plus the views
/// themselves in registration order.
pub struct AxumContext {
    store: Arc<dyn ModelStore>,
    renderer: Arc<dyn TemplateRenderer>,
    views: Vec<Arc<dyn ModelView>>,
}

impl AxumContext {
    /// Create a context with no views and a renderer that has no templates.
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            renderer: Arc::new(NoopRenderer),
            views: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Register a view; its routes are added by `create_router`.
    #[must_use]
    pub fn register<V: ModelView>(self, view: V) -> Self {
        self.register_arc(Arc::new(view))
    }

    #[must_use]
    pub fn register_arc(mut self, view: Arc<dyn ModelView>) -> Self {
        self.views.push(view);
        self
    }

    pub fn views(&self) -> &[Arc<dyn ModelView>] {
        &self.views
    }

    pub fn renderer(&self) -> Arc<dyn TemplateRenderer> {
        Arc::clone(&self.renderer)
    }

    /// CRUD service for `view` over the shared store.
    pub fn service_for(&self, view: Arc<dyn ModelView>) -> CrudService {
        CrudService::new(Arc::clone(&self.store), view)
    }

    /// Every model reachable from the registered views.
    pub fn models(&self) -> Vec<&ModelDef> {
        reachable_models(&self.views)
    }
}

/// Models of `views` plus their relationship targets, deduplicated by table.
pub fn reachable_models(views: &[Arc<dyn ModelView>]) -> Vec<&ModelDef> {
    let mut models: Vec<&ModelDef> = Vec::new();
    let mut pending: Vec<&ModelDef> = views.iter().map(|v| v.model()).collect();
    while let Some(model) = pending.pop() {
        if models.iter().any(|m| m.table_name() == model.table_name()) {
            continue;
        }
        pending.extend(model.relationships().iter().map(|r| r.target.as_ref()));
        models.push(model);
    }
    models
}

/// Bootstrap the Axum context: open the database, create the tables of
/// every view's model, and register the views.
pub async fn bootstrap(
    config: &ServerConfig,
    views: Vec<Arc<dyn ModelView>>,
    renderer: Arc<dyn TemplateRenderer>,
) -> Result<AxumContext> {
    tracing::info!(
        database_url = %config.database_url,
        views = views.len(),
        "Axum bootstrap"
    );

    let pool = setup_database(&config.database_url, &reachable_models(&views)).await?;

    let ctx = views.into_iter().fold(
        AxumContext::new(Arc::new(SqliteModelStore::new(pool))).with_renderer(renderer),
        AxumContext::register_arc,
    );
    Ok(ctx)
}

/// Start the Axum server with the given views.
///
/// This is the main entry point for running the web server.
pub async fn start_server(
    config: ServerConfig,
    views: Vec<Arc<dyn ModelView>>,
    renderer: Arc<dyn TemplateRenderer>,
) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let ctx = bootstrap(&config, views, renderer).await?;
    let app = crate::routes::create_router(&ctx, &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("modelview server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
