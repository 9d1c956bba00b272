//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the item database and photo directory

use crate::services::AppStore;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Liveness probe. Never performs I/O.
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
/// Readiness probe that:
/// 1. Runs `SELECT 1` against the SQLite record store.
/// 2. Writes, reads back and deletes a scratch file in the photo directory.
///
/// HTTP 200 when all checks pass, HTTP 503 otherwise.
pub async fn readyz(State(store): State<AppStore>) -> impl IntoResponse {
    let sqlite_check = match store.records().ping().await {
        Ok(()) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let tmp_path = store
        .photos()
        .base_path
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) if bytes == b"readyz" => match fs::remove_file(&tmp_path).await {
                Ok(_) => (true, None::<String>),
                Err(e) => (true, Some(format!("could not remove tmp file: {}", e))),
            },
            Ok(_) => {
                let _ = fs::remove_file(&tmp_path).await;
                (false, Some("file content mismatch".to_string()))
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                (false, Some(format!("could not read tmp file: {}", e)))
            }
        },
        Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
    };

    let overall_ok = sqlite_check.0 && disk_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "sqlite",
        CheckStatus {
            ok: sqlite_check.0,
            error: sqlite_check.1,
        },
    );
    checks.insert(
        "photos",
        CheckStatus {
            ok: disk_check.0,
            error: disk_check.1,
        },
    );

    let body = ReadyResponse {
        status: (if overall_ok { "ok" } else { "error" }).into(),
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
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
