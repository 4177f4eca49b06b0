//! Request DTOs for the REST API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use super::Record;

/// Request body for POST /register
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// The key to store the record under
    pub key: String,
    /// The value to store
    pub value: String,
}

impl RegisterRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

impl From<RegisterRequest> for Record {
    fn from(req: RegisterRequest) -> Self {
        Record::new(req.key, req.value)
    }
}
