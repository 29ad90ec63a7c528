use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::cache::{AuditLogEntry, CacheStatus};
use crate::models::snapshot::FinancialSnapshot;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct SnapshotQuery {
    pub email: String,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub email: String,
    #[serde(default = "default_audit_limit")]
    pub limit: i64,
}

fn default_audit_limit() -> i64 {
    20
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.len() > 320 {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    Ok(())
}

/// Returns the cached snapshot for a user, fetching from the provider and
/// caching on a miss.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<Value>> {
    validate_email(&query.email)?;

    if let Some(snapshot) = state.cache.retrieve(&query.email).await? {
        return Ok(Json(json!({"source": "cache", "snapshot": snapshot})));
    }

    let snapshot = fetch_and_store(&state, &query.email).await?;
    Ok(Json(json!({"source": "provider", "snapshot": snapshot})))
}

/// Forces a fresh provider fetch and replaces the cached snapshot.
pub async fn refresh_snapshot(
    State(state): State<AppState>,
    Json(body): Json<UserRequest>,
) -> Result<Json<Value>> {
    validate_email(&body.email)?;

    let snapshot = fetch_and_store(&state, &body.email).await?;
    Ok(Json(json!({"source": "provider", "snapshot": snapshot})))
}

async fn fetch_and_store(state: &AppState, email: &str) -> Result<FinancialSnapshot> {
    let snapshot = state.client.fetch_all().await?;
    state.cache.store(email, &snapshot).await?;
    Ok(snapshot)
}

/// Read-only cache state for a user.
pub async fn cache_status(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<CacheStatus>> {
    validate_email(&query.email)?;
    let status = state.cache.status(&query.email).await?;
    Ok(Json(status))
}

/// Unconditionally drops any cached snapshot for a user.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Json(body): Json<UserRequest>,
) -> Result<Json<Value>> {
    validate_email(&body.email)?;
    state.cache.invalidate(&body.email).await?;
    Ok(Json(json!({"message": "Cache invalidated"})))
}

/// Manual trigger for the expired-entry sweep.
pub async fn cleanup_cache(State(state): State<AppState>) -> Result<Json<Value>> {
    let deleted = state.cache.cleanup_expired().await?;
    Ok(Json(json!({"deleted": deleted})))
}

/// Recent audit rows for a user, newest first.
pub async fn cache_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLogEntry>>> {
    validate_email(&query.email)?;
    let limit = query.limit.clamp(1, 200);
    let entries = state.cache.recent_audit(&query.email, limit).await?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_obviously_invalid_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@x.com").is_ok());
    }
}
