//! Axum web adapter for modelview.
//!
//! Register [`ModelView`](modelview_core::ModelView)s on an [`AxumContext`]
//! and turn it into a router with [`create_router`]. Each view gets
//! `GET`/`POST` on its collection and `GET`/`PUT`/`DELETE` on items.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings; used by tests/
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tower as _;

// Used by main.rs binary
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod cli;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod negotiate;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, bootstrap, start_server};
pub use error::HttpError;
pub use negotiate::Format;
pub use routes::{create_router, view_routes};
pub use state::{ViewContext, ViewState};
