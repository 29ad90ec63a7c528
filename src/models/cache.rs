use chrono::{DateTime, Utc};
use serde::Serialize;

/// Current layout version of the encrypted payload.
pub const SCHEMA_VERSION: i32 = 1;

/// One encrypted, TTL-bound snapshot row. At most one non-expired row exists
/// per `user_key_hash`; writes replace, never append.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Irreversible hash of the user's email; primary key.
    pub user_key_hash: String,
    /// AES-GCM output over the JSON-serialized snapshot.
    pub payload_ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub auth_tag: Vec<u8>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Plaintext size before encryption.
    pub size_bytes: i64,
    pub schema_version: i32,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The cache operation an audit row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Store,
    Retrieve,
    Invalidate,
    Cleanup,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Store => "store",
            AuditOperation::Retrieve => "retrieve",
            AuditOperation::Invalidate => "invalidate",
            AuditOperation::Cleanup => "cleanup",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "store" => Some(AuditOperation::Store),
            "retrieve" => Some(AuditOperation::Retrieve),
            "invalidate" => Some(AuditOperation::Invalidate),
            "cleanup" => Some(AuditOperation::Cleanup),
            _ => None,
        }
    }
}

/// One immutable record of a cache operation's occurrence and outcome.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_key_hash: String,
    pub operation: AuditOperation,
    pub success: bool,
    pub error_message: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Read-only cache state for one user; produced without touching
/// `last_accessed_at` or the audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub has_valid_cache: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub time_remaining_minutes: Option<i64>,
}
