//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that probes every configured file store

use crate::services::registry::FileStoreRegistry;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;

/// `GET /healthz`
///
/// Liveness probe. Never touches the stores.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Runs [`health_check`](crate::services::file_store::FileStore::health_check)
/// on each store. HTTP 200 when all pass, HTTP 503 when any fails.
pub async fn readyz(State(stores): State<FileStoreRegistry>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    for (name, store) in stores.iter() {
        let check = match store.health_check().await {
            Ok(()) => CheckStatus {
                ok: true,
                error: None,
            },
            Err(err) => {
                tracing::warn!("readiness check failed for store '{}': {}", name, err);
                CheckStatus {
                    ok: false,
                    error: Some(err.to_string()),
                }
            }
        };
        checks.insert(name.to_string(), check);
    }

    let overall_ok = checks.values().all(|c| c.ok);
    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: BTreeMap<String, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
