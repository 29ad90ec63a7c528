use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::provider::envelope::{parse_envelope, ToolEnvelope};

/// Header carrying the session-correlation id on every provider call.
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// The wire-level seam to the provider.
///
/// The session manager and data client are written against this trait so
/// tests can script responses and count calls without a network.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Issues one `tools/call` invocation and decodes the envelope.
    async fn call_tool(
        &self,
        session_id: &str,
        credential: Option<&str>,
        name: &str,
        arguments: Value,
    ) -> Result<ToolEnvelope>;

    /// Best-effort remote session termination, bounded by a short timeout.
    async fn end_session(&self, session_id: &str) -> Result<()>;
}

/// Reusable provider transport (connection-pooled reqwest client).
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    logout_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.provider_url.clone(),
            logout_timeout: Duration::from_secs(config.logout_timeout_secs),
        })
    }
}

#[async_trait]
impl ToolTransport for HttpTransport {
    async fn call_tool(
        &self,
        session_id: &str,
        credential: Option<&str>,
        name: &str,
        arguments: Value,
    ) -> Result<ToolEnvelope> {
        let body = json!({
            "id": Uuid::new_v4().to_string(),
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": arguments,
            },
        });

        tracing::debug!("Calling provider tool {}", name);

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(SESSION_HEADER, session_id)
            .json(&body);

        if let Some(credential) = credential {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await.map_err(AppError::from)?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => {
                let text = response.text().await.map_err(AppError::from)?;
                parse_envelope(&text)
            }
            401 => Err(AppError::InvalidCredential),
            403 => Err(AppError::PermissionDenied),
            code => {
                // Bodies of failed responses are logged, never surfaced.
                let detail = response.text().await.unwrap_or_default();
                tracing::error!("Provider returned status {}: {}", code, detail);
                Err(AppError::Transport(code))
            }
        }
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        let body = json!({
            "id": Uuid::new_v4().to_string(),
            "method": "tools/call",
            "params": {
                "name": "logout",
                "arguments": {},
            },
        });

        self.client
            .post(&self.endpoint)
            .header(SESSION_HEADER, session_id)
            .timeout(self.logout_timeout)
            .json(&body)
            .send()
            .await
            .map_err(AppError::from)?
            .error_for_status()
            .map_err(AppError::from)?;

        Ok(())
    }
}
