//! Shared fixtures for modelview-axum integration tests.
//!
//! Each test gets its own router over a fresh in-memory database.

// Not every test binary uses every helper.
#![allow(dead_code)]

pub mod views;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use modelview_axum::bootstrap::reachable_models;
use modelview_axum::{AxumContext, CorsConfig, create_router};
use modelview_core::{ModelView, NoopRenderer, TemplateRenderer};
use modelview_db::{SqliteModelStore, setup_test_database};

use views::{PersonView, TagView};

/// Router with the person and tag views and the given renderer.
pub async fn app_with(renderer: Arc<dyn TemplateRenderer>) -> Router {
    let views: Vec<Arc<dyn ModelView>> =
        vec![Arc::new(PersonView::new()), Arc::new(TagView::new())];
    let pool = setup_test_database(&reachable_models(&views))
        .await
        .expect("Failed to set up test database");

    let ctx = views.into_iter().fold(
        AxumContext::new(Arc::new(SqliteModelStore::new(pool))).with_renderer(renderer),
        AxumContext::register_arc,
    );
    create_router(&ctx, &CorsConfig::AllowAll)
}

/// Router for JSON clients; HTML requests find no templates.
pub async fn app() -> Router {
    app_with(Arc::new(NoopRenderer)).await
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Send one request through the router.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Body>,
    accept: Option<&str>,
) -> TestResponse {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(accept) = accept {
        request = request.header(header::ACCEPT, accept);
    }
    if body.is_some() {
        request = request.header(header::CONTENT_TYPE, "application/json");
    }
    let request = request.body(body.unwrap_or_else(Body::empty)).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> TestResponse {
    send(app, Method::POST, uri, Some(Body::from(body.to_string())), None).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> TestResponse {
    send(app, Method::PUT, uri, Some(Body::from(body.to_string())), None).await
}

pub async fn delete(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::DELETE, uri, None, None).await
}
