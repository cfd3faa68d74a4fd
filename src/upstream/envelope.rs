//! Envelope validation and failure classification.
//!
//! # Decision order
//! ```text
//! HTTP 402/403               → FeatureUnavailable
//! HTTP 404                   → Http(404)          (fallback-eligible)
//! other non-2xx              → Http(status)
//! body not an envelope       → InvalidFormat
//! restriction marker         → FeatureUnavailable
//! status "0" + invalid action → InvalidAction     (fallback-eligible)
//! status "0" + benign message → Empty
//! status "0" otherwise       → Status(message)
//! status "1"                 → Result(result)
//! ```
//!
//! JSON-RPC shaped bodies (`proxy` module) carry `result` or `error`
//! instead of `status`/`message`.

use serde::Deserialize;
use serde_json::Value;

use crate::upstream::error::{CallFailure, UpstreamFailure};

/// Messages that mean "nothing matched", not "something broke".
const BENIGN_EMPTY_MESSAGES: &[&str] = &[
    "no records found",
    "no transactions found",
    "no token transfers found",
];

const RESTRICTION_MARKERS: &[&str] = &[
    "api pro",
    "pro endpoint",
    "upgrade your plan",
    "not supported for this chain",
    "not available on your plan",
    "premium",
];

const INVALID_ACTION_MARKERS: &[&str] = &["invalid action", "missing or invalid action"];

/// Validated envelope contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Result(Value),
    /// Benign "no records" answer.
    Empty,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: String,
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[allow(dead_code)]
    jsonrpc: String,
    /// `null` is a valid result (unknown tx, pending receipt); only an
    /// absent key is malformed, which `open` checks on the raw object.
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_ascii_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

fn is_benign(message: &str) -> bool {
    let lower = message.trim().to_ascii_lowercase();
    BENIGN_EMPTY_MESSAGES.iter().any(|m| lower == *m)
}

/// Map a non-success HTTP status; `Ok` for 2xx.
pub fn check_http_status(status: u16) -> Result<(), CallFailure> {
    match status {
        200..=299 => Ok(()),
        402 | 403 => Err(CallFailure::FeatureUnavailable(format!(
            "upstream denied access (HTTP {})",
            status
        ))),
        _ => Err(UpstreamFailure::Http { status }.into()),
    }
}

/// Validate a raw upstream response and extract its payload.
pub fn open(http_status: u16, body: &str) -> Result<Payload, CallFailure> {
    check_http_status(http_status)?;

    let value: Value =
        serde_json::from_str(body).map_err(|_| UpstreamFailure::InvalidFormat)?;
    let Some(obj) = value.as_object() else {
        return Err(UpstreamFailure::InvalidFormat.into());
    };

    if obj.contains_key("status") {
        let envelope: StatusEnvelope =
            serde_json::from_value(value).map_err(|_| UpstreamFailure::InvalidFormat)?;
        return open_status_envelope(envelope);
    }

    if obj.contains_key("jsonrpc") {
        let has_result = obj.contains_key("result");
        let envelope: RpcEnvelope =
            serde_json::from_value(value).map_err(|_| UpstreamFailure::InvalidFormat)?;
        return open_rpc_envelope(envelope, has_result);
    }

    Err(UpstreamFailure::InvalidFormat.into())
}

fn open_status_envelope(envelope: StatusEnvelope) -> Result<Payload, CallFailure> {
    // NOTOK-style answers put the human text in `result`.
    let detail = match &envelope.result {
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => envelope.message.clone(),
    };

    if contains_any(&envelope.message, RESTRICTION_MARKERS) {
        return Err(CallFailure::FeatureUnavailable(envelope.message));
    }

    match envelope.status.as_str() {
        "1" => Ok(Payload::Result(envelope.result)),
        "0" => {
            if contains_any(&detail, RESTRICTION_MARKERS) {
                return Err(CallFailure::FeatureUnavailable(detail));
            }
            if contains_any(&envelope.message, INVALID_ACTION_MARKERS)
                || contains_any(&detail, INVALID_ACTION_MARKERS)
            {
                return Err(UpstreamFailure::InvalidAction { message: detail }.into());
            }
            if is_benign(&envelope.message) {
                return Ok(Payload::Empty);
            }
            let message = if envelope.message.eq_ignore_ascii_case("notok") {
                detail
            } else {
                envelope.message
            };
            Err(UpstreamFailure::Status { message }.into())
        }
        _ => Err(UpstreamFailure::InvalidFormat.into()),
    }
}

fn open_rpc_envelope(envelope: RpcEnvelope, has_result: bool) -> Result<Payload, CallFailure> {
    if let Some(error) = envelope.error {
        let message = error.message.unwrap_or_else(|| "rpc error".to_string());
        if contains_any(&message, RESTRICTION_MARKERS) {
            return Err(CallFailure::FeatureUnavailable(message));
        }
        return Err(UpstreamFailure::Status { message }.into());
    }
    if !has_result {
        return Err(UpstreamFailure::InvalidFormat.into());
    }
    Ok(Payload::Result(envelope.result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure(result: Result<Payload, CallFailure>) -> CallFailure {
        result.expect_err("expected failure")
    }

    #[test]
    fn test_success_envelope() {
        let body = json!({"status": "1", "message": "OK", "result": [1, 2]}).to_string();
        assert_eq!(open(200, &body).unwrap(), Payload::Result(json!([1, 2])));
    }

    #[test]
    fn test_http_status_mapping() {
        assert!(matches!(failure(open(403, "")), CallFailure::FeatureUnavailable(_)));
        assert!(matches!(failure(open(402, "")), CallFailure::FeatureUnavailable(_)));
        assert_eq!(
            failure(open(404, "")),
            CallFailure::Upstream(UpstreamFailure::Http { status: 404 })
        );
        assert_eq!(
            failure(open(502, "")),
            CallFailure::Upstream(UpstreamFailure::Http { status: 502 })
        );
    }

    #[test]
    fn test_structural_failures() {
        for body in ["not json", "[]", "{}", r#"{"status": 1, "message": "OK"}"#, r#"{"status":"1"}"#] {
            assert_eq!(
                failure(open(200, body)),
                CallFailure::Upstream(UpstreamFailure::InvalidFormat),
                "body: {}",
                body
            );
        }
        let odd_status = json!({"status": "2", "message": "OK", "result": []}).to_string();
        assert_eq!(
            failure(open(200, &odd_status)),
            CallFailure::Upstream(UpstreamFailure::InvalidFormat)
        );
    }

    #[test]
    fn test_benign_empty() {
        let body = json!({"status": "0", "message": "No transactions found", "result": []}).to_string();
        assert_eq!(open(200, &body).unwrap(), Payload::Empty);
        let body = json!({"status": "0", "message": "No records found", "result": []}).to_string();
        assert_eq!(open(200, &body).unwrap(), Payload::Empty);
    }

    #[test]
    fn test_error_status_uses_detail_for_notok() {
        let body = json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"}).to_string();
        assert_eq!(
            failure(open(200, &body)),
            CallFailure::Upstream(UpstreamFailure::Status {
                message: "Invalid API Key".into()
            })
        );

        let body = json!({"status": "0", "message": "Max rate limit reached", "result": null}).to_string();
        assert_eq!(
            failure(open(200, &body)),
            CallFailure::Upstream(UpstreamFailure::Status {
                message: "Max rate limit reached".into()
            })
        );
    }

    #[test]
    fn test_invalid_action() {
        let body = json!({"status": "0", "message": "Invalid action", "result": null}).to_string();
        assert!(matches!(
            failure(open(200, &body)),
            CallFailure::Upstream(UpstreamFailure::InvalidAction { .. })
        ));

        let body = json!({"status": "0", "message": "NOTOK", "result": "Error! Missing Or invalid Action name"})
            .to_string();
        assert!(matches!(
            failure(open(200, &body)),
            CallFailure::Upstream(UpstreamFailure::InvalidAction { .. })
        ));
    }

    #[test]
    fn test_plan_restriction() {
        let body = json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Sorry, it looks like you are trying to access an API Pro endpoint."
        })
        .to_string();
        assert!(matches!(failure(open(200, &body)), CallFailure::FeatureUnavailable(_)));

        let body = json!({"status": "1", "message": "Upgrade your plan to use this endpoint", "result": []})
            .to_string();
        assert!(matches!(failure(open(200, &body)), CallFailure::FeatureUnavailable(_)));
    }

    #[test]
    fn test_rpc_envelope() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": {"hash": "0x1"}}).to_string();
        assert_eq!(open(200, &body).unwrap(), Payload::Result(json!({"hash": "0x1"})));

        let body = json!({"jsonrpc": "2.0", "id": 1, "result": null}).to_string();
        assert_eq!(open(200, &body).unwrap(), Payload::Result(Value::Null));

        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "invalid argument"}})
            .to_string();
        assert_eq!(
            failure(open(200, &body)),
            CallFailure::Upstream(UpstreamFailure::Status {
                message: "invalid argument".into()
            })
        );

        let body = json!({"jsonrpc": "2.0", "id": 1}).to_string();
        assert_eq!(
            failure(open(200, &body)),
            CallFailure::Upstream(UpstreamFailure::InvalidFormat)
        );
    }

    #[test]
    fn test_rpc_null_result_is_payload_not_format_error() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        assert_eq!(open(200, body).unwrap(), Payload::Result(Value::Null));

        // An error object still wins over a null result.
        let body = r#"{"jsonrpc":"2.0","id":1,"result":null,"error":{"message":"boom"}}"#;
        assert_eq!(
            failure(open(200, body)),
            CallFailure::Upstream(UpstreamFailure::Status { message: "boom".into() })
        );
    }
}
