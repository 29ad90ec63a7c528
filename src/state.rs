use std::sync::Arc;

use crate::config::Config;
use crate::crypto::aes::Cipher;
use crate::db::ConnectionManager;
use crate::error::Result;
use crate::provider::client::DataClient;
use crate::provider::session::SessionManager;
use crate::provider::transport::{HttpTransport, ToolTransport};
use crate::services::cache::SecureCacheStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The pooled-connection manager with retry/backoff.
    pub db: ConnectionManager,
    /// The encrypted cache store.
    pub cache: Arc<SecureCacheStore>,
    /// The session lifecycle manager (one live session per process).
    pub sessions: Arc<SessionManager>,
    /// The authenticated remote data client.
    pub client: Arc<DataClient>,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Wires config → pool → cipher → transport → session manager → data
    /// client → cache store.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = ConnectionManager::new(config)?;
        tracing::info!("✅ PostgreSQL pool initialized (max {})", config.pool_max_size);

        db.ensure_schema().await?;

        let cipher = Arc::new(Cipher::new(&config.encryption_key)?);
        tracing::info!("✅ Cache cipher initialized");

        let transport: Arc<dyn ToolTransport> = Arc::new(HttpTransport::new(config)?);
        let sessions = Arc::new(SessionManager::new(
            transport.clone(),
            config.session_ttl_minutes,
        ));
        let client = Arc::new(DataClient::new(transport, sessions.clone()));
        tracing::info!("✅ Provider client initialized ({})", config.provider_url);

        let cache = Arc::new(SecureCacheStore::new(
            db.clone(),
            cipher,
            config.cache_ttl_hours,
        ));
        tracing::info!(
            "✅ Secure cache store initialized (TTL {}h)",
            config.cache_ttl_hours
        );

        Ok(AppState {
            db,
            cache,
            sessions,
            client,
            config: config.clone(),
        })
    }
}
