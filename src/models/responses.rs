//! Response DTOs for the REST API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use super::Record;

/// Response body for GET /register/:key
///
/// `value` is null when nothing is stored under the key.
#[derive(Debug, Clone, Serialize)]
pub struct RecordResponse {
    pub key: String,
    pub value: Option<String>,
}

impl RecordResponse {
    /// Maps a lookup result, echoing the requested key on a miss.
    pub fn from_lookup(key: impl Into<String>, record: Option<Record>) -> Self {
        match record {
            Some(record) => Self {
                key: record.key,
                value: Some(record.value),
            },
            None => Self {
                key: key.into(),
                value: None,
            },
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Storage backend in use ("redis" or "memory")
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_response_hit() {
        let resp = RecordResponse::from_lookup("k", Some(Record::new("k", "v")));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "k");
        assert_eq!(json["value"], "v");
    }

    #[test]
    fn test_record_response_miss_serializes_null() {
        let resp = RecordResponse::from_lookup("missing", None);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "missing");
        assert!(json["value"].is_null());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy("memory");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("memory"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
