use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::Result;
use crate::state::AppState;

/// Pool, cache and session statistics for health reporting.
pub async fn status(State(state): State<AppState>) -> Result<Json<Value>> {
    let pool = state.db.pool_status();
    let (total_entries, valid_entries) = state.cache.row_counts().await?;
    let session_phase = state.sessions.phase().await;

    Ok(Json(json!({
        "pool": pool,
        "cache": {
            "totalEntries": total_entries,
            "validEntries": valid_entries,
            "ttlHours": state.config.cache_ttl_hours,
        },
        "session": {
            "phase": session_phase,
            "ttlMinutes": state.config.session_ttl_minutes,
        },
    })))
}

/// Round-trip health probe; 503 when unhealthy.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let report = state.db.health_check().await;
    let code = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(json!(report)))
}
