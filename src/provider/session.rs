use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::session::{AuthSession, SessionPhase};
use crate::provider::envelope::{tools, ToolEnvelope};
use crate::provider::transport::ToolTransport;

/// The outcome of initiating a login.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InitiateOutcome {
    /// The user must finish a browser login at `login_url`.
    LoginRequired {
        session_id: String,
        login_url: String,
    },
    /// The provider returned real data on the first probe.
    AlreadyAuthenticated { session_id: String },
}

/// The result of polling authentication state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<i64>,
    pub message: String,
}

impl AuthStatus {
    fn unauthenticated(message: &str) -> Self {
        Self {
            authenticated: false,
            expires_in_minutes: None,
            message: message.to_string(),
        }
    }

    fn authenticated(expires_in_minutes: i64) -> Self {
        Self {
            authenticated: true,
            expires_in_minutes: Some(expires_in_minutes),
            message: "Session active".to_string(),
        }
    }
}

/// The session id and credential an authenticated call must carry.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub session_id: String,
    pub credential: String,
}

/// Owns the single live `AuthSession` and drives its state machine:
/// Unauthenticated → LoginInitiated → Authenticated → Expired.
///
/// The provider's login is a web redirect completed out of band, so the
/// authentication signal is a probe call returning real data; callers poll
/// `check_status` until the human finishes the browser login. An expired
/// session is never resurrected: recovery is a fresh `initiate`.
pub struct SessionManager {
    session: RwLock<Option<AuthSession>>,
    transport: Arc<dyn ToolTransport>,
    ttl_minutes: i64,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn ToolTransport>, ttl_minutes: i64) -> Self {
        Self {
            session: RwLock::new(None),
            transport,
            ttl_minutes,
        }
    }

    /// Creates a fresh session and issues one provisional probe.
    ///
    /// Replacing the held session invalidates it; no two valid sessions
    /// coexist. A transport failure clears the new session and surfaces a
    /// typed error — never a silent retry.
    pub async fn initiate(&self) -> Result<InitiateOutcome> {
        let session = AuthSession::new(self.ttl_minutes);
        let session_id = session.session_id.clone();
        {
            let mut guard = self.session.write().await;
            if guard.is_some() {
                tracing::info!("Replacing existing session with a fresh login attempt");
            }
            *guard = Some(session);
        }

        match self
            .transport
            .call_tool(&session_id, None, tools::NET_WORTH, json!({}))
            .await
        {
            Ok(ToolEnvelope::LoginRequired { login_url }) => {
                tracing::info!("Login initiated; awaiting out-of-band browser login");
                Ok(InitiateOutcome::LoginRequired {
                    session_id,
                    login_url,
                })
            }
            Ok(ToolEnvelope::Success(_)) => {
                let mut guard = self.session.write().await;
                if let Some(session) = guard
                    .as_mut()
                    .filter(|s| s.session_id == session_id)
                {
                    session.mark_authenticated();
                }
                tracing::info!("Provider returned data on first probe; session authenticated");
                Ok(InitiateOutcome::AlreadyAuthenticated { session_id })
            }
            Err(e) => {
                let mut guard = self.session.write().await;
                if guard.as_ref().is_some_and(|s| s.session_id == session_id) {
                    *guard = None;
                }
                tracing::warn!("Login initiation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Polls authentication state.
    ///
    /// No network call is made when there is no session, the session is
    /// expired, or it is already authenticated. Otherwise one probe is
    /// issued: real data flips the session to authenticated, a
    /// `login_required` response changes nothing.
    pub async fn check_status(&self) -> Result<AuthStatus> {
        let session_id = {
            let mut guard = self.session.write().await;
            match guard.as_mut() {
                None => {
                    return Ok(AuthStatus::unauthenticated(
                        "No active session. Initiate a login first",
                    ))
                }
                Some(session) if session.is_expired() => {
                    session.authenticated = false;
                    return Ok(AuthStatus::unauthenticated(
                        "Session expired. Initiate a new login",
                    ));
                }
                Some(session) if session.authenticated => {
                    return Ok(AuthStatus::authenticated(session.expires_in_minutes()));
                }
                Some(session) => session.session_id.clone(),
            }
        };

        match self
            .transport
            .call_tool(&session_id, None, tools::NET_WORTH, json!({}))
            .await?
        {
            ToolEnvelope::Success(_) => {
                let mut guard = self.session.write().await;
                match guard.as_mut().filter(|s| s.session_id == session_id) {
                    Some(session) => {
                        session.mark_authenticated();
                        tracing::info!("Login completed; session authenticated");
                        Ok(AuthStatus::authenticated(session.expires_in_minutes()))
                    }
                    // Session was replaced or cleared while probing.
                    None => Ok(AuthStatus::unauthenticated(
                        "No active session. Initiate a login first",
                    )),
                }
            }
            ToolEnvelope::LoginRequired { .. } => Ok(AuthStatus::unauthenticated(
                "Login not yet completed. Finish the login in your browser and poll again",
            )),
        }
    }

    /// Local precondition check before every authenticated call.
    ///
    /// Fails fast with `NoSession`, `SessionExpired` or
    /// `NotYetAuthenticated` — no network call in any of the three cases.
    pub async fn ensure_authenticated(&self) -> Result<SessionToken> {
        let guard = self.session.read().await;
        match guard.as_ref() {
            None => Err(AppError::NoSession),
            Some(session) if session.is_expired() => Err(AppError::SessionExpired),
            Some(session) if !session.authenticated => Err(AppError::NotYetAuthenticated),
            Some(session) => Ok(SessionToken {
                session_id: session.session_id.clone(),
                credential: session.credential.clone(),
            }),
        }
    }

    /// Destroys the held session locally (the 401 side effect).
    ///
    /// A rejected session is gone, not pending: subsequent status polls
    /// report unauthenticated without a network call, and recovery requires
    /// a fresh `initiate`.
    pub async fn invalidate(&self) {
        let mut guard = self.session.write().await;
        if guard.take().is_some() {
            tracing::warn!("Provider rejected the session; cleared locally");
        }
    }

    /// Best-effort remote logout followed by unconditional local clearing.
    pub async fn logout(&self) {
        let session_id = {
            let mut guard = self.session.write().await;
            guard.take().map(|s| s.session_id)
        };

        if let Some(session_id) = session_id {
            if let Err(e) = self.transport.end_session(&session_id).await {
                tracing::debug!("Remote logout failed (ignored): {}", e);
            }
            tracing::info!("Session cleared");
        }
    }

    /// The current lifecycle phase, for status reporting.
    pub async fn phase(&self) -> SessionPhase {
        let guard = self.session.read().await;
        guard
            .as_ref()
            .map(|s| s.phase())
            .unwrap_or(SessionPhase::Unauthenticated)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted transport: pops one response per call and counts traffic.
    pub struct MockTransport {
        script: Mutex<Vec<Result<ToolEnvelope>>>,
        pub calls: AtomicUsize,
        pub logouts: AtomicUsize,
    }

    impl MockTransport {
        pub fn new(script: Vec<Result<ToolEnvelope>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                logouts: AtomicUsize::new(0),
            }
        }

        pub fn empty() -> Self {
            Self::new(Vec::new())
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolTransport for MockTransport {
        async fn call_tool(
            &self,
            _session_id: &str,
            _credential: Option<&str>,
            _name: &str,
            _arguments: Value,
        ) -> Result<ToolEnvelope> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                panic!("mock transport called with an empty script");
            }
            script.remove(0)
        }

        async fn end_session(&self, _session_id: &str) -> Result<()> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub fn success_envelope() -> ToolEnvelope {
        ToolEnvelope::Success(serde_json::json!({
            "netWorthResponse": {"totalNetWorthValue": {"units": "500000"}}
        }))
    }

    pub fn login_envelope(url: &str) -> ToolEnvelope {
        ToolEnvelope::LoginRequired {
            login_url: url.to_string(),
        }
    }
}
