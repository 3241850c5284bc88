//! HTTP handlers.

pub mod views;

/// Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}
