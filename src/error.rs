//! Error types for the caching facade
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for storage, cache and request handling.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value carries a different type tag than the one requested
    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    /// Null values are never written to a cache
    #[error("Cache '{0}' does not allow null values")]
    NullValue(String),

    /// Redis rejected the command or the connection failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// No pooled connection could be obtained
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Command exceeded the configured timeout
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Node is skipped after a recent failed connect
    #[error("Node {0} is unavailable after a failed connect")]
    NodeDown(String),

    /// The read policy has no node to route to
    #[error("No node available for read policy '{0}'")]
    NoReadNode(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True when the failure comes from the backend rather than the caller or the data.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::Redis(_)
                | CacheError::Pool(_)
                | CacheError::Timeout(_)
                | CacheError::NodeDown(_)
                | CacheError::NoReadNode(_)
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) | CacheError::NullValue(_) => StatusCode::BAD_REQUEST,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Redis(_)
            | CacheError::Pool(_)
            | CacheError::NodeDown(_)
            | CacheError::NoReadNode(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_)
            | CacheError::TypeMismatch { .. }
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_classification() {
        assert!(CacheError::Timeout(Duration::from_millis(10)).is_backend());
        assert!(CacheError::NoReadNode("replica".into()).is_backend());
        assert!(CacheError::NodeDown("127.0.0.1:2".into()).is_backend());
        assert!(!CacheError::InvalidRequest("empty".into()).is_backend());
        assert!(!CacheError::NullValue("zone".into()).is_backend());
    }

    #[test]
    fn test_status_codes() {
        let resp = CacheError::InvalidRequest("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = CacheError::Timeout(Duration::from_secs(1)).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

        let resp = CacheError::NoReadNode("replica".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = CacheError::NodeDown("127.0.0.1:2".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = CacheError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
