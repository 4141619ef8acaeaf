//! Exchange request/outcome types and upstream reply classification
//!
//! The upstream is a loosely documented black box: the error code may be a
//! number or a numeric string, and the phone number has been observed both
//! nested under `data` and at the top level, named `number` or `phone`.
//! [`classify_reply`] accepts all of those shapes.

use std::fmt;

use common::redact::{excerpt, obscure};
use serde_json::Value;

use crate::constants::BODY_EXCERPT_CHARS;
use crate::error::{InvalidRequest, TransportError};
use crate::transport::UpstreamReply;

/// Phone fields in lookup order: nested shapes first, then top level.
const PHONE_FIELD_PATHS: &[&[&str]] = &[
    &["data", "number"],
    &["data", "phone"],
    &["number"],
    &["phone"],
];

/// Caller-supplied credentials for one resolution attempt.
///
/// Both fields are guaranteed non-empty. `Debug` obscures them.
#[derive(Clone)]
pub struct ExchangeRequest {
    authorization_code: String,
    access_token: String,
}

impl ExchangeRequest {
    pub fn new(
        authorization_code: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, InvalidRequest> {
        let authorization_code = authorization_code.into();
        let access_token = access_token.into();
        if authorization_code.trim().is_empty() {
            return Err(InvalidRequest::EmptyAuthorizationCode);
        }
        if access_token.trim().is_empty() {
            return Err(InvalidRequest::EmptyAccessToken);
        }
        // Codes and tokens may travel as header values
        if authorization_code.chars().any(char::is_control) {
            return Err(InvalidRequest::ControlCharacters("token"));
        }
        if access_token.chars().any(char::is_control) {
            return Err(InvalidRequest::ControlCharacters("access_token"));
        }
        Ok(Self {
            authorization_code,
            access_token,
        })
    }

    pub fn authorization_code(&self) -> &str {
        &self.authorization_code
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for ExchangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeRequest")
            .field("authorization_code", &obscure(&self.authorization_code))
            .field("access_token", &obscure(&self.access_token))
            .finish()
    }
}

/// Failure categories of one exchange attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The call exceeded its time budget; the code has likely expired too.
    Timeout,
    /// Connection refused, DNS failure, reset.
    UpstreamUnreachable,
    /// Non-2xx HTTP status, or a request that could not be encoded.
    UpstreamRejected,
    /// 2xx body that is not a JSON object.
    MalformedResponse,
    /// Parsed body carrying a non-zero provider error code.
    ProviderError,
    /// Successful body without a usable phone number.
    PhoneNotFound,
}

impl FailureKind {
    /// Transient failures may be retried with a freshly obtained code.
    /// Everything else requires restarting the authorization flow.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::UpstreamUnreachable)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::UpstreamUnreachable => "upstream_unreachable",
            Self::UpstreamRejected => "upstream_rejected",
            Self::MalformedResponse => "malformed_response",
            Self::ProviderError => "provider_error",
            Self::PhoneNotFound => "phone_not_found",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure with a caller-safe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ExchangeFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of one exchange attempt: exactly one of resolved or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Resolved { phone_number: String },
    Failed(ExchangeFailure),
}

impl ExchangeOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed(ExchangeFailure::new(kind, message))
    }

    /// Label used for metrics: `resolved` or the failure kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolved { .. } => "resolved",
            Self::Failed(failure) => failure.kind.as_str(),
        }
    }
}

/// Map a transport-level error to a failed outcome.
pub fn classify_transport_error(err: &TransportError) -> ExchangeOutcome {
    match err {
        TransportError::Timeout => {
            ExchangeOutcome::failed(FailureKind::Timeout, "Zalo API did not respond in time")
        }
        TransportError::Unreachable(detail) => ExchangeOutcome::failed(
            FailureKind::UpstreamUnreachable,
            format!("could not reach Zalo API: {detail}"),
        ),
        TransportError::Encode(detail) => ExchangeOutcome::failed(
            FailureKind::UpstreamRejected,
            format!("request could not be encoded: {detail}"),
        ),
    }
}

/// Classify an upstream reply that arrived with a status line.
pub fn classify_reply(reply: &UpstreamReply) -> ExchangeOutcome {
    if !(200..300).contains(&reply.status) {
        return ExchangeOutcome::failed(
            FailureKind::UpstreamRejected,
            format!(
                "HTTP {}: {}",
                reply.status,
                excerpt(&reply.body, BODY_EXCERPT_CHARS)
            ),
        );
    }

    let payload = match serde_json::from_str::<Value>(&reply.body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            return ExchangeOutcome::failed(
                FailureKind::MalformedResponse,
                "Zalo API response is not a JSON object",
            );
        }
        Err(e) => {
            return ExchangeOutcome::failed(
                FailureKind::MalformedResponse,
                format!("invalid JSON from Zalo API: {e}"),
            );
        }
    };

    let code = match provider_error_code(&payload) {
        Some(code) => code,
        None => {
            return ExchangeOutcome::failed(
                FailureKind::MalformedResponse,
                "Zalo API error field is not an integer",
            );
        }
    };
    if code != 0 {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("unknown provider error");
        return ExchangeOutcome::failed(FailureKind::ProviderError, format!("{code}: {message}"));
    }

    match find_phone(&payload) {
        Some(phone_number) => ExchangeOutcome::Resolved { phone_number },
        None => ExchangeOutcome::failed(
            FailureKind::PhoneNotFound,
            "phone number not found in Zalo API response",
        ),
    }
}

/// Provider error code: absent or null means 0.
///
/// Any number or numeric string whose value is a whole number is accepted,
/// including `3.0` and values beyond `i64`. `None` if present but not integral.
fn provider_error_code(payload: &Value) -> Option<i128> {
    match payload.get("error") {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().and_then(whole_number)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i128>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        Some(_) => None,
    }
}

fn whole_number(value: f64) -> Option<i128> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 1e38).then(|| value as i128)
}

fn find_phone(payload: &Value) -> Option<String> {
    PHONE_FIELD_PATHS.iter().find_map(|path| {
        let value = path
            .iter()
            .try_fold(payload, |node, key| node.get(*key))?;
        let phone = match value {
            Value::String(s) => s.trim().to_owned(),
            // some provider versions return the number unquoted
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!phone.is_empty()).then_some(phone)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> UpstreamReply {
        UpstreamReply {
            status: 200,
            body: body.to_string(),
        }
    }

    fn kind(outcome: &ExchangeOutcome) -> Option<FailureKind> {
        match outcome {
            ExchangeOutcome::Failed(f) => Some(f.kind),
            ExchangeOutcome::Resolved { .. } => None,
        }
    }

    #[test]
    fn request_rejects_empty_fields() {
        assert_eq!(
            ExchangeRequest::new("", "xyz789").unwrap_err(),
            InvalidRequest::EmptyAuthorizationCode
        );
        assert_eq!(
            ExchangeRequest::new("abc123", "  ").unwrap_err(),
            InvalidRequest::EmptyAccessToken
        );
    }

    #[test]
    fn request_rejects_control_characters() {
        assert_eq!(
            ExchangeRequest::new("abc\n123", "xyz789").unwrap_err(),
            InvalidRequest::ControlCharacters("token")
        );
        assert_eq!(
            ExchangeRequest::new("abc123", "xyz\r789").unwrap_err(),
            InvalidRequest::ControlCharacters("access_token")
        );
        assert!(ExchangeRequest::new("abc-123_đ", "xyz.789").is_ok());
    }

    #[test]
    fn request_debug_obscures_tokens() {
        let request = ExchangeRequest::new("code-abcdef-123456", "token-zyxwvu-987654").unwrap();
        let debug = format!("{request:?}");
        assert!(!debug.contains("code-abcdef-123456"), "got: {debug}");
        assert!(!debug.contains("token-zyxwvu-987654"), "got: {debug}");
    }

    #[test]
    fn nested_number_resolves() {
        let outcome = classify_reply(&ok(r#"{"error":0,"data":{"number":"+84901234567"}}"#));
        assert_eq!(
            outcome,
            ExchangeOutcome::Resolved {
                phone_number: "+84901234567".into()
            }
        );
    }

    #[test]
    fn alternative_phone_shapes_resolve() {
        for body in [
            r#"{"error":0,"data":{"phone":"84901234567"}}"#,
            r#"{"error":0,"number":"84901234567"}"#,
            r#"{"phone":"84901234567"}"#,
            r#"{"error":"0","data":{"number":84901234567}}"#,
        ] {
            assert_eq!(
                classify_reply(&ok(body)),
                ExchangeOutcome::Resolved {
                    phone_number: "84901234567".into()
                },
                "body: {body}"
            );
        }
    }

    #[test]
    fn empty_nested_number_falls_through_to_other_shapes() {
        let outcome = classify_reply(&ok(r#"{"error":0,"data":{"number":""},"phone":"0901"}"#));
        assert_eq!(
            outcome,
            ExchangeOutcome::Resolved {
                phone_number: "0901".into()
            }
        );
    }

    #[test]
    fn provider_error_carries_code_and_message() {
        let outcome = classify_reply(&ok(r#"{"error":3,"message":"access token expired"}"#));
        assert_eq!(
            outcome,
            ExchangeOutcome::failed(FailureKind::ProviderError, "3: access token expired")
        );
    }

    #[test]
    fn provider_error_wins_even_when_phone_present() {
        let outcome = classify_reply(&ok(
            r#"{"error":-201,"message":"invalid code","data":{"number":"0901"}}"#,
        ));
        assert_eq!(
            outcome,
            ExchangeOutcome::failed(FailureKind::ProviderError, "-201: invalid code")
        );
    }

    #[test]
    fn provider_error_without_message_uses_placeholder() {
        let outcome = classify_reply(&ok(r#"{"error":"-14"}"#));
        assert_eq!(
            outcome,
            ExchangeOutcome::failed(FailureKind::ProviderError, "-14: unknown provider error")
        );
    }

    #[test]
    fn integral_error_codes_in_any_numeric_form_are_provider_errors() {
        for (body, expected) in [
            (r#"{"error":3.0,"message":"expired"}"#, "3: expired"),
            (r#"{"error":"-14.0","message":"expired"}"#, "-14: expired"),
            (
                r#"{"error":18446744073709551615,"message":"expired"}"#,
                "18446744073709551615: expired",
            ),
        ] {
            assert_eq!(
                classify_reply(&ok(body)),
                ExchangeOutcome::failed(FailureKind::ProviderError, expected),
                "body: {body}"
            );
        }
    }

    #[test]
    fn zero_as_float_is_success() {
        assert_eq!(
            classify_reply(&ok(r#"{"error":0.0,"data":{"number":"0901"}}"#)),
            ExchangeOutcome::Resolved {
                phone_number: "0901".into()
            }
        );
    }

    #[test]
    fn missing_phone_is_phone_not_found() {
        for body in [
            r#"{"error":0,"data":{}}"#,
            r#"{"error":0,"data":{"number":"   "}}"#,
            r#"{"error":0,"data":{"number":null}}"#,
            r#"{}"#,
        ] {
            assert_eq!(
                kind(&classify_reply(&ok(body))),
                Some(FailureKind::PhoneNotFound),
                "body: {body}"
            );
        }
    }

    #[test]
    fn unparseable_body_is_malformed() {
        for body in [
            "<html>oops</html>",
            "",
            "[1,2,3]",
            r#"{"error":true}"#,
            r#"{"error":2.5}"#,
            r#"{"error":"abc"}"#,
        ] {
            assert_eq!(
                kind(&classify_reply(&ok(body))),
                Some(FailureKind::MalformedResponse),
                "body: {body}"
            );
        }
    }

    #[test]
    fn non_success_status_is_rejected_with_status_and_body() {
        let outcome = classify_reply(&UpstreamReply {
            status: 403,
            body: "forbidden".into(),
        });
        assert_eq!(
            outcome,
            ExchangeOutcome::failed(FailureKind::UpstreamRejected, "HTTP 403: forbidden")
        );
    }

    #[test]
    fn transport_errors_map_to_distinct_kinds() {
        assert_eq!(
            kind(&classify_transport_error(&TransportError::Timeout)),
            Some(FailureKind::Timeout)
        );
        assert_eq!(
            kind(&classify_transport_error(&TransportError::Unreachable(
                "connection refused".into()
            ))),
            Some(FailureKind::UpstreamUnreachable)
        );
        let encode = classify_transport_error(&TransportError::Encode("builder error".into()));
        assert_eq!(kind(&encode), Some(FailureKind::UpstreamRejected));
        assert!(!FailureKind::UpstreamRejected.is_transient());
    }

    #[test]
    fn only_connectivity_failures_are_transient() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::UpstreamUnreachable.is_transient());
        assert!(!FailureKind::UpstreamRejected.is_transient());
        assert!(!FailureKind::MalformedResponse.is_transient());
        assert!(!FailureKind::ProviderError.is_transient());
        assert!(!FailureKind::PhoneNotFound.is_transient());
    }
}
