use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::Result;
use crate::provider::session::{AuthStatus, InitiateOutcome};
use crate::state::AppState;

/// Starts a login attempt against the provider.
///
/// Returns the provider's login URL when the user must finish a browser
/// login, or reports that the session authenticated on the first probe.
pub async fn initiate_login(State(state): State<AppState>) -> Result<Json<InitiateOutcome>> {
    let outcome = state.sessions.initiate().await?;
    Ok(Json(outcome))
}

/// Polls whether the out-of-band login has completed.
pub async fn auth_status(State(state): State<AppState>) -> Result<Json<AuthStatus>> {
    let status = state.sessions.check_status().await?;
    Ok(Json(status))
}

/// Best-effort remote logout and unconditional local session clearing.
pub async fn logout(State(state): State<AppState>) -> Json<Value> {
    state.sessions.logout().await;
    Json(json!({"message": "Logged out"}))
}
