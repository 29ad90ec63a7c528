use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Provider tool names, fixed by the remote contract.
pub mod tools {
    pub const NET_WORTH: &str = "fetch_net_worth";
    pub const CREDIT_REPORT: &str = "fetch_credit_report";
    pub const EPF_DETAILS: &str = "fetch_epf_details";
    pub const BANK_TRANSACTIONS: &str = "fetch_bank_transactions";
    pub const MF_TRANSACTIONS: &str = "fetch_mf_transactions";
}

/// A decoded provider response.
///
/// The provider wraps every payload twice: the HTTP body is
/// `{"result": {"content": [{"text": "<json>"}]}}` and the inner text must
/// be parsed again. Known shapes are decoded explicitly; anything else is a
/// `ResponseFormat` error, never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEnvelope {
    /// The provider wants the user to complete a browser login.
    LoginRequired { login_url: String },
    /// Real data came back; the session is proven authenticated.
    Success(Value),
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<RpcResult>,
}

#[derive(Deserialize)]
struct RpcResult {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ContentItem {
    text: Option<String>,
}

#[derive(Deserialize)]
struct LoginProbe {
    status: Option<String>,
    login_url: Option<String>,
}

/// Decodes a raw 200-response body into a `ToolEnvelope`.
pub fn parse_envelope(body: &str) -> Result<ToolEnvelope> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| AppError::ResponseFormat(format!("response body is not JSON: {}", e)))?;

    let result = response
        .result
        .ok_or_else(|| AppError::ResponseFormat("missing result field".to_string()))?;

    let text = result
        .content
        .first()
        .ok_or_else(|| AppError::ResponseFormat("empty content array".to_string()))?
        .text
        .as_deref()
        .ok_or_else(|| AppError::ResponseFormat("content item has no text".to_string()))?;

    let inner: Value = serde_json::from_str(text)
        .map_err(|e| AppError::ResponseFormat(format!("inner payload is not JSON: {}", e)))?;

    let probe: LoginProbe = serde_json::from_value(inner.clone()).unwrap_or(LoginProbe {
        status: None,
        login_url: None,
    });

    if probe.status.as_deref() == Some("login_required") {
        let login_url = probe.login_url.ok_or_else(|| {
            AppError::ResponseFormat("login_required response without login_url".to_string())
        })?;
        return Ok(ToolEnvelope::LoginRequired { login_url });
    }

    Ok(ToolEnvelope::Success(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(inner: &Value) -> String {
        json!({
            "result": {
                "content": [{"text": inner.to_string()}]
            }
        })
        .to_string()
    }

    #[test]
    fn decodes_login_required() {
        let body = wrap(&json!({
            "status": "login_required",
            "login_url": "https://provider.example/login/abc"
        }));

        let envelope = parse_envelope(&body).unwrap();
        assert_eq!(
            envelope,
            ToolEnvelope::LoginRequired {
                login_url: "https://provider.example/login/abc".to_string()
            }
        );
    }

    #[test]
    fn decodes_real_data_as_success() {
        let inner = json!({"netWorthResponse": {"totalNetWorthValue": {"units": "500000"}}});
        let envelope = parse_envelope(&wrap(&inner)).unwrap();
        assert_eq!(envelope, ToolEnvelope::Success(inner));
    }

    #[test]
    fn login_required_without_url_is_a_format_error() {
        let body = wrap(&json!({"status": "login_required"}));
        assert!(matches!(
            parse_envelope(&body),
            Err(AppError::ResponseFormat(_))
        ));
    }

    #[test]
    fn missing_result_is_a_format_error() {
        assert!(matches!(
            parse_envelope(r#"{"id": "1"}"#),
            Err(AppError::ResponseFormat(_))
        ));
    }

    #[test]
    fn empty_content_is_a_format_error() {
        assert!(matches!(
            parse_envelope(r#"{"result": {"content": []}}"#),
            Err(AppError::ResponseFormat(_))
        ));
    }

    #[test]
    fn non_json_inner_text_is_a_format_error() {
        let body = json!({
            "result": {"content": [{"text": "<html>login page</html>"}]}
        })
        .to_string();
        assert!(matches!(
            parse_envelope(&body),
            Err(AppError::ResponseFormat(_))
        ));
    }

    #[test]
    fn non_json_body_is_a_format_error() {
        assert!(matches!(
            parse_envelope("not json at all"),
            Err(AppError::ResponseFormat(_))
        ));
    }

    #[test]
    fn non_object_inner_payload_is_success() {
        // Some feeds return bare arrays; they are data, not login prompts.
        let inner = json!([{"txnAmount": -1200}]);
        let envelope = parse_envelope(&wrap(&inner)).unwrap();
        assert_eq!(envelope, ToolEnvelope::Success(inner));
    }
}
