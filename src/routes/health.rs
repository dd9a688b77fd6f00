//! Health Check Endpoint
//!
//! 프로세스 생존 + 저장소 응답 확인. 저장소가 응답하지 않으면 503

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{config::StorageBackend, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    /// "healthy" | "degraded"
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreStatus,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StoreStatus {
    /// "postgres" | "memory"
    pub backend: &'static str,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = match state.config.storage {
        StorageBackend::Postgres => "postgres",
        StorageBackend::Memory => "memory",
    };

    let started = Instant::now();
    let store = match state.store.health_check().await {
        Ok(()) => StoreStatus {
            backend,
            reachable: true,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(backend, error = %e, "store health check failed");
            StoreStatus {
                backend,
                reachable: false,
                latency_ms: None,
            }
        }
    };

    let (code, status) = if store.reachable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}
