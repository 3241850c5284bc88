//! View handlers - the five CRUD endpoints of a registered view.
//!
//! Handlers are thin: they negotiate the response format, delegate to the
//! view's `CrudService` and shape the result as JSON or rendered HTML.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use modelview_core::{Action, ListQuery};
use serde_json::{Map, Value};

use crate::error::HttpError;
use crate::negotiate::Format;
use crate::state::{ViewContext, ViewState};

/// Get a single item.
pub async fn get(
    State(state): State<ViewState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let format = Format::from_headers(&headers);
    dispatching(&state, Action::Get);

    let item = state.service.get(&id).await.map_err(|e| fail(format, e))?;
    reply(&state, format, Action::Get, StatusCode::OK, item)
}

/// List items with paging and sorting.
pub async fn index(
    State(state): State<ViewState>,
    query: Result<Query<ListQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let format = Format::from_headers(&headers);
    dispatching(&state, Action::Index);

    let Query(query) =
        query.map_err(|rejection| fail(format, HttpError::bad_request(rejection.body_text())))?;

    let listing = state
        .service
        .list(&query)
        .await
        .map_err(|e| fail(format, e))?;
    let data = serde_json::to_value(listing)
        .map_err(|e| fail(format, HttpError::Internal(e.to_string())))?;
    reply(&state, format, Action::Index, StatusCode::OK, data)
}

/// Create an item from the JSON body.
pub async fn create(
    State(state): State<ViewState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let format = Format::from_headers(&headers);
    dispatching(&state, Action::Post);

    let payload = parse_body(&body).map_err(|e| fail(format, e))?;
    let saved = state
        .service
        .create(&payload)
        .await
        .map_err(|e| fail(format, e))?;

    let location = state.item_url(&saved.key);
    let mut response = reply(&state, format, Action::Post, StatusCode::CREATED, saved.item)?;
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(e) => tracing::warn!(%location, "Location header dropped: {e}"),
    }
    Ok(response)
}

/// Update an item from the JSON body.
pub async fn update(
    State(state): State<ViewState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    let format = Format::from_headers(&headers);
    dispatching(&state, Action::Put);

    let payload = parse_body(&body).map_err(|e| fail(format, e))?;
    let item = state
        .service
        .update(&id, &payload)
        .await
        .map_err(|e| fail(format, e))?;
    reply(&state, format, Action::Put, StatusCode::OK, item)
}

/// Delete an item.
pub async fn remove(
    State(state): State<ViewState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    let format = Format::from_headers(&headers);
    dispatching(&state, Action::Delete);

    state
        .service
        .delete(&id)
        .await
        .map_err(|e| fail(format, e))?;
    Ok(StatusCode::NO_CONTENT)
}

fn dispatching(state: &ViewContext, action: Action) {
    tracing::debug!(view = %state.base_path, %action, "Dispatching");
}

fn parse_body(body: &Bytes) -> Result<Value, HttpError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| HttpError::bad_request(format!("Invalid JSON: {e}")))
}

fn fail(format: Format, err: impl Into<HttpError>) -> HttpError {
    let err = err.into();
    if err.status().is_client_error() {
        tracing::warn!(status = %err.status(), "{err}");
    }
    if format.is_html() { err.for_html() } else { err }
}

fn reply(
    state: &ViewContext,
    format: Format,
    action: Action,
    status: StatusCode,
    data: Value,
) -> Result<Response, HttpError> {
    match format {
        Format::Json => Ok((status, Json(data)).into_response()),
        Format::Html => {
            let html = render(state, action, data)?;
            Ok((status, Html(html)).into_response())
        }
    }
}

/// Render the view's template for `action`.
///
/// Listings expose their fields at the top level of the context; single
/// items are available as `item`. A missing template is a 406 response.
fn render(state: &ViewContext, action: Action, data: Value) -> Result<String, HttpError> {
    let view = state.service.view();
    let extra = view.template_context(action, &data);

    let mut context = match (action, data) {
        (Action::Index, Value::Object(fields)) => fields,
        (_, item) => Map::from_iter([("item".to_string(), item)]),
    };
    context.extend(extra);

    let template = view.template(action);
    state
        .renderer
        .render(&template, &Value::Object(context))
        .map_err(|e| {
            tracing::warn!(%template, "{e}");
            HttpError::from(e).for_html()
        })
}
