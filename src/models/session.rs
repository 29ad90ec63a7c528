use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Marker credential for sessions proven valid by a successful data call.
///
/// The provider's login is a web redirect, not a token exchange: there is no
/// discrete credential handed back, so receiving real data is the proof of
/// authentication and this marker records it.
const AUTHENTICATED_MARKER: &str = "authenticated";

/// The lifecycle phase of an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unauthenticated,
    LoginInitiated,
    Authenticated,
    Expired,
}

/// One time-bounded authentication attempt against the remote provider.
///
/// Exactly one `AuthSession` is live per session manager; creating a new one
/// replaces (and thereby invalidates) the old one.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Opaque id sent as a correlation header on every remote call.
    pub session_id: String,
    /// Passcode or authenticated marker; never empty once authenticated.
    pub credential: String,
    /// Whether the provider has confirmed real data access.
    pub authenticated: bool,
    /// When this session was created.
    pub created_at: DateTime<Utc>,
    /// Hard expiry, fixed at creation.
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Creates a fresh, unauthenticated session expiring after `ttl_minutes`.
    pub fn new(ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: format!("mcp-session-{}", Uuid::new_v4()),
            credential: String::new(),
            authenticated: false,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    /// Whether the hard expiry has passed.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// A session is usable iff authenticated and not expired.
    pub fn is_valid(&self) -> bool {
        self.authenticated && !self.is_expired()
    }

    /// Records the provider's confirmation of real data access.
    pub fn mark_authenticated(&mut self) {
        self.authenticated = true;
        if self.credential.is_empty() {
            self.credential = AUTHENTICATED_MARKER.to_string();
        }
    }

    /// Whole minutes until expiry; zero once expired.
    pub fn expires_in_minutes(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }

    /// The lifecycle phase this session is currently in.
    pub fn phase(&self) -> SessionPhase {
        if self.is_expired() {
            SessionPhase::Expired
        } else if self.authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::LoginInitiated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_not_valid() {
        let session = AuthSession::new(30);
        assert!(!session.is_valid());
        assert!(!session.is_expired());
        assert_eq!(session.phase(), SessionPhase::LoginInitiated);
        assert!(session.session_id.starts_with("mcp-session-"));
    }

    #[test]
    fn authenticated_session_is_valid_with_nonempty_credential() {
        let mut session = AuthSession::new(30);
        session.mark_authenticated();

        assert!(session.is_valid());
        assert!(!session.credential.is_empty());
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        assert!(session.expires_in_minutes() > 0);
    }

    #[test]
    fn expiry_invalidates_even_when_authenticated() {
        let mut session = AuthSession::new(0);
        session.mark_authenticated();

        assert!(session.is_expired());
        assert!(!session.is_valid());
        assert_eq!(session.phase(), SessionPhase::Expired);
        assert_eq!(session.expires_in_minutes(), 0);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(AuthSession::new(30).session_id, AuthSession::new(30).session_id);
    }
}
