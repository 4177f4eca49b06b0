//! Request, response and persisted models
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies, and the
//! record shape written to the store.

pub mod record;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use record::Record;
pub use requests::RegisterRequest;
pub use responses::{ErrorResponse, HealthResponse, RecordResponse};
