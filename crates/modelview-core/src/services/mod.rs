//! Core services - the request-independent business logic layer.
//!
//! Services orchestrate between ports (trait interfaces) and domain logic.
//! They don't know about concrete store implementations or HTTP.

mod crud;

pub use crud::{CrudError, CrudService, Listing, Saved};
