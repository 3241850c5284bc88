//! Route definitions and router construction.
//!
//! Every registered view contributes its own sub-router, derived from the
//! model's route segment:
//!
//! | method | path | handler |
//! |--------|------|---------|
//! | GET | `/{segment}/` | list |
//! | POST | `/{segment}/` | create |
//! | GET | `/{segment}/{id}` | get |
//! | PUT | `/{segment}/{id}` | update |
//! | DELETE | `/{segment}/{id}` | delete |

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::bootstrap::{AxumContext, CorsConfig};
use crate::handlers;
use crate::state::{ViewContext, ViewState};

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Build the routes of one view, with its state applied.
pub fn view_routes(state: ViewState) -> Router {
    let base = state.base_path.clone();
    let collection = get(handlers::views::index).post(handlers::views::create);

    Router::new()
        .route(&format!("{base}/"), collection.clone())
        .route(&base, collection)
        .route(
            &format!("{base}/{{id}}"),
            get(handlers::views::get)
                .put(handlers::views::update)
                .delete(handlers::views::remove),
        )
        .with_state(state)
}

/// Create the main router with all registered views.
///
/// # Arguments
///
/// * `ctx` - Store, renderer and registered views
/// * `cors_config` - CORS configuration
pub fn create_router(ctx: &AxumContext, cors_config: &CorsConfig) -> Router {
    let mut router = Router::new().route("/health", get(handlers::health_check));

    for view in ctx.views() {
        let base_path = format!("/{}", view.model().route_segment());
        tracing::debug!(%base_path, model = view.model().name(), "Registering view");
        let state = Arc::new(ViewContext {
            service: ctx.service_for(Arc::clone(view)),
            renderer: ctx.renderer(),
            base_path,
        });
        router = router.merge(view_routes(state));
    }

    router
        .layer(build_cors_layer(cors_config))
        .layer(TraceLayer::new_for_http())
}
