use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One user's aggregated financial data, as returned by the provider.
///
/// The individual payloads are provider-defined and treated as opaque JSON;
/// this service only serializes the whole snapshot for encryption. A field
/// is `None` when its feed failed or returned nothing during `fetch_all`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_worth: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_report: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epf_details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_transactions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mf_transactions: Option<Value>,
    pub fetched_at: DateTime<Utc>,
}

impl FinancialSnapshot {
    /// Whether every feed came back empty.
    pub fn is_empty(&self) -> bool {
        self.net_worth.is_none()
            && self.credit_report.is_none()
            && self.epf_details.is_none()
            && self.bank_transactions.is_none()
            && self.mf_transactions.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_snapshot_reports_empty() {
        let snapshot = FinancialSnapshot {
            fetched_at: Utc::now(),
            ..Default::default()
        };
        assert!(snapshot.is_empty());
    }

    #[test]
    fn serialization_round_trip_preserves_fields() {
        let snapshot = FinancialSnapshot {
            net_worth: Some(json!({"totalNetWorthValue": {"units": "500000"}})),
            bank_transactions: Some(json!([{"amount": -1200}])),
            fetched_at: Utc::now(),
            ..Default::default()
        };

        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let back: FinancialSnapshot = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back.net_worth, snapshot.net_worth);
        assert_eq!(back.bank_transactions, snapshot.bank_transactions);
        assert!(back.credit_report.is_none());
        assert!(!back.is_empty());
    }

    #[test]
    fn absent_feeds_are_omitted_from_json() {
        let snapshot = FinancialSnapshot {
            net_worth: Some(json!({})),
            fetched_at: Utc::now(),
            ..Default::default()
        };
        let text = serde_json::to_string(&snapshot).unwrap();
        assert!(text.contains("netWorth"));
        assert!(!text.contains("creditReport"));
    }
}
