use std::env;
use std::str::FromStr;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

/// The required AES-256 key length in bytes.
const KEY_LEN: usize = 32;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The remote financial-data provider endpoint.
    pub provider_url: String,
    /// Per-request timeout for provider tool calls, in seconds.
    pub provider_timeout_secs: u64,
    /// Bound on the best-effort remote logout, in seconds.
    pub logout_timeout_secs: u64,
    /// Maximum number of pooled database connections.
    pub pool_max_size: usize,
    /// How long a caller may wait for a pooled connection, in seconds.
    pub pool_wait_timeout_secs: u64,
    /// How long a new connection may take to establish, in seconds.
    pub pool_create_timeout_secs: u64,
    /// How long recycling an idle connection may take, in seconds.
    pub pool_recycle_timeout_secs: u64,
    /// Maximum retries on transient storage failures.
    pub retry_max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Cap on the backoff delay, in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Lifetime of a cached financial snapshot, in hours.
    pub cache_ttl_hours: i64,
    /// Lifetime of an authentication session, in minutes.
    pub session_ttl_minutes: i64,
    /// Port the operational API listens on.
    pub port: u16,
    /// The 32-byte key used to encrypt cached payloads.
    pub encryption_key: Zeroizing<Vec<u8>>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        let encryption_key = load_encryption_key()?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            provider_url: env::var("PROVIDER_MCP_URL")
                .unwrap_or_else(|_| "https://mcp.fi.money:8080/mcp/stream".to_string()),
            provider_timeout_secs: env_or("PROVIDER_TIMEOUT_SECS", 30)?,
            logout_timeout_secs: env_or("LOGOUT_TIMEOUT_SECS", 5)?,
            pool_max_size: env_or("POOL_MAX_SIZE", 16)?,
            pool_wait_timeout_secs: env_or("POOL_WAIT_TIMEOUT_SECS", 5)?,
            pool_create_timeout_secs: env_or("POOL_CREATE_TIMEOUT_SECS", 2)?,
            pool_recycle_timeout_secs: env_or("POOL_RECYCLE_TIMEOUT_SECS", 1)?,
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", 200)?,
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", 5000)?,
            cache_ttl_hours: env_or("CACHE_TTL_HOURS", 24)?,
            session_ttl_minutes: env_or("SESSION_TTL_MINUTES", 30)?,
            port: env_or("PORT", 8000)?,
            encryption_key,
        })
    }
}

/// Parses an environment variable, falling back to a default when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

/// Loads and length-normalizes the cache encryption key.
///
/// The key is preferably 64 hex characters (32 bytes). Any other material is
/// deterministically derived to 32 bytes with a single SHA-256 pass; it is
/// never truncated or padded. The raw value is zeroized after decoding and
/// never logged.
fn load_encryption_key() -> Result<Zeroizing<Vec<u8>>> {
    let mut raw = env::var("ENCRYPTION_KEY")
        .context("ENCRYPTION_KEY must be set (generate with: openssl rand -hex 32)")?;

    let mut material = match hex::decode(&raw) {
        Ok(bytes) => Zeroizing::new(bytes),
        Err(_) => Zeroizing::new(raw.as_bytes().to_vec()),
    };
    raw.zeroize();

    if material.len() != KEY_LEN {
        tracing::warn!(
            "ENCRYPTION_KEY is not {} bytes; deriving a fixed-length key from it",
            KEY_LEN
        );
        let digest = Sha256::digest(material.as_slice());
        material = Zeroizing::new(digest.to_vec());
    }

    Ok(material)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var manipulation is process-global, so key handling is exercised
    // through the derivation path rather than from_env.

    #[test]
    fn short_key_material_is_derived_not_truncated() {
        let digest = Sha256::digest(b"short-key");
        assert_eq!(digest.len(), KEY_LEN);

        let again = Sha256::digest(b"short-key");
        assert_eq!(digest, again);
    }

    #[test]
    fn env_or_falls_back_to_default() {
        let value: u64 = env_or("FINVAULT_TEST_UNSET_KNOB", 42).unwrap();
        assert_eq!(value, 42);
    }
}
