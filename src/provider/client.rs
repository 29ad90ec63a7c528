use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::snapshot::FinancialSnapshot;
use crate::provider::envelope::{tools, ToolEnvelope};
use crate::provider::session::SessionManager;
use crate::provider::transport::ToolTransport;

/// Issues authenticated tool invocations and normalizes provider results.
pub struct DataClient {
    transport: Arc<dyn ToolTransport>,
    sessions: Arc<SessionManager>,
}

impl DataClient {
    pub fn new(transport: Arc<dyn ToolTransport>, sessions: Arc<SessionManager>) -> Self {
        Self { transport, sessions }
    }

    /// One authenticated tool call.
    ///
    /// Requires a locally valid session before touching the network. A 401,
    /// or a `login_required` envelope on a call that carried a credential,
    /// destroys the held session before the error is returned; timeouts and
    /// connection failures leave the session untouched.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let token = self.sessions.ensure_authenticated().await?;

        let outcome = self
            .transport
            .call_tool(&token.session_id, Some(&token.credential), name, arguments)
            .await;

        match outcome {
            Ok(ToolEnvelope::Success(value)) => Ok(value),
            Ok(ToolEnvelope::LoginRequired { .. }) => {
                // The provider evicted the session upstream.
                self.sessions.invalidate().await;
                Err(AppError::InvalidCredential)
            }
            Err(AppError::InvalidCredential) => {
                self.sessions.invalidate().await;
                Err(AppError::InvalidCredential)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches the provider's full set of data feeds concurrently.
    ///
    /// Individual feed failures degrade that field to `None`; only an
    /// authentication failure aborts the aggregate.
    pub async fn fetch_all(&self) -> Result<FinancialSnapshot> {
        self.sessions.ensure_authenticated().await?;

        let (net_worth, credit_report, epf_details, bank_transactions, mf_transactions) = tokio::join!(
            self.try_fetch(tools::NET_WORTH),
            self.try_fetch(tools::CREDIT_REPORT),
            self.try_fetch(tools::EPF_DETAILS),
            self.try_fetch(tools::BANK_TRANSACTIONS),
            self.try_fetch(tools::MF_TRANSACTIONS),
        );

        let snapshot = FinancialSnapshot {
            net_worth: net_worth?,
            credit_report: credit_report?,
            epf_details: epf_details?,
            bank_transactions: bank_transactions?,
            mf_transactions: mf_transactions?,
            fetched_at: Utc::now(),
        };

        if snapshot.is_empty() {
            tracing::warn!("All provider feeds failed or returned nothing");
        }

        Ok(snapshot)
    }

    /// One feed fetch that degrades non-auth failures to `None`.
    async fn try_fetch(&self, name: &'static str) -> Result<Option<Value>> {
        match self.call(name, json!({})).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_auth_failure() => Err(e),
            Err(e) => {
                tracing::warn!("Feed {} degraded to absent: {}", name, e);
                Ok(None)
            }
        }
    }
}
