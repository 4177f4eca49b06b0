//! API Handlers
//!
//! HTTP request handlers for the register/retrieve endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheManager;
use crate::config::CacheProperties;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, Record, RecordResponse, RegisterRequest};
use crate::service::KeyValueService;
use crate::store::KeyValueStore;

/// Application state shared across all handlers.
///
/// Built once at startup; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: KeyValueService,
    /// Named caches (`zone` and the 60 s default) over the same store and
    /// key prefix as `service`. No route reads it; it is the shared cache
    /// handle for code embedding this crate's state.
    pub cache_manager: Arc<CacheManager>,
}

impl AppState {
    /// Wires the service and the cache manager over one store.
    pub fn new(store: Arc<dyn KeyValueStore>, properties: &CacheProperties) -> Self {
        let service = KeyValueService::new(Arc::clone(&store), properties);
        let cache_manager = Arc::new(CacheManager::standard(store, &properties.key_prefix));
        Self {
            service,
            cache_manager,
        }
    }
}

/// Handler for POST /register
///
/// Stores the record and answers "Success".
pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<&'static str> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.service.register(&Record::from(req)).await?;
    Ok("Success")
}

/// Handler for GET /register/:key
///
/// Answers the stored record, or the key with a null value on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RecordResponse>> {
    let record = state.service.retrieve(&key).await?;
    Ok(Json(RecordResponse::from_lookup(key, record)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.service.backend()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::UnreachableStore;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn memory_state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()), &CacheProperties::default())
    }

    #[tokio::test]
    async fn test_register_and_get_handler() {
        let state = memory_state();

        let req = RegisterRequest {
            key: "test_key".to_string(),
            value: "test_value".to_string(),
        };
        let result = register_handler(State(state.clone()), Json(req)).await;
        assert_eq!(result.unwrap(), "Success");

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.key, "test_key");
        assert_eq!(response.value.as_deref(), Some("test_value"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = memory_state();

        let response = get_handler(State(state), Path("nonexistent".to_string()))
            .await
            .unwrap();
        assert_eq!(response.key, "nonexistent");
        assert!(response.value.is_none());
    }

    #[tokio::test]
    async fn test_register_invalid_request() {
        let state = memory_state();

        let req = RegisterRequest {
            key: "".to_string(),
            value: "value".to_string(),
        };
        let result = register_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces() {
        let state = AppState::new(Arc::new(UnreachableStore), &CacheProperties::default());

        let req = RegisterRequest {
            key: "k".to_string(),
            value: "v".to_string(),
        };
        let result = register_handler(State(state.clone()), Json(req)).await;
        assert!(matches!(result, Err(ref err) if err.is_backend()));

        let result = get_handler(State(state), Path("k".to_string())).await;
        assert!(matches!(result, Err(ref err) if err.is_backend()));
    }

    #[tokio::test]
    async fn test_cache_manager_shares_store_and_prefix() {
        let store = Arc::new(MemoryStore::new());
        let properties = CacheProperties {
            key_prefix: "green:".to_string(),
            ..Default::default()
        };
        let state = AppState::new(store.clone(), &properties);

        let zone = state.cache_manager.cache("zone");
        zone.put("eu", Some(&"west".to_string())).await.unwrap();

        assert!(store.get("green:zone::eu").await.unwrap().is_some());
        let ttl = store.ttl("green:zone::eu").await.unwrap();
        assert!(ttl <= Duration::from_secs(30));
        assert_eq!(
            zone.get::<String>("eu").await.unwrap().as_deref(),
            Some("west")
        );
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(memory_state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.backend, "memory");
    }
}
