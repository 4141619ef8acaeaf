//! Service-specific error types
//!
//! [`ApiError`] is the single boundary where configuration faults, request
//! validation failures and exchange failures become HTTP responses. Every
//! response carries a `detail` string; none of them include secret material
//! or full token values.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};
use zalo_auth::{ConfigurationFault, ExchangeFailure, FailureKind, InvalidRequest};

/// Errors surfaced to callers of the phone exchange endpoint.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Zalo configuration missing: {0}")]
    Configuration(#[from] ConfigurationFault),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{}", describe(.0))]
    Exchange(ExchangeFailure),
}

impl From<InvalidRequest> for ApiError {
    fn from(err: InvalidRequest) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<ExchangeFailure> for ApiError {
    fn from(failure: ExchangeFailure) -> Self {
        Self::Exchange(failure)
    }
}

fn describe(failure: &ExchangeFailure) -> String {
    match failure.kind {
        FailureKind::Timeout => format!("Zalo API timeout: {}", failure.message),
        FailureKind::UpstreamUnreachable => format!("Zalo API unreachable: {}", failure.message),
        FailureKind::UpstreamRejected => format!("Zalo API error: {}", failure.message),
        FailureKind::MalformedResponse => {
            format!("Invalid response from Zalo API: {}", failure.message)
        }
        FailureKind::ProviderError => format!("Zalo API error {}", failure.message),
        FailureKind::PhoneNotFound => "Phone number not found in response".to_string(),
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Exchange(failure) => match failure.kind {
                FailureKind::Timeout => StatusCode::REQUEST_TIMEOUT,
                FailureKind::UpstreamUnreachable => StatusCode::BAD_GATEWAY,
                FailureKind::UpstreamRejected
                | FailureKind::MalformedResponse
                | FailureKind::ProviderError
                | FailureKind::PhoneNotFound => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(%status, %detail, "phone exchange request failed");
        } else {
            warn!(%status, %detail, "phone exchange request rejected");
        }
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(kind: FailureKind, message: &str) -> ApiError {
        ApiError::Exchange(ExchangeFailure::new(kind, message))
    }

    #[test]
    fn status_codes_follow_failure_kind() {
        assert_eq!(
            ApiError::from(ConfigurationFault::MissingSecret).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(InvalidRequest::EmptyAccessToken).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            exchange(FailureKind::Timeout, "slow").status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            exchange(FailureKind::UpstreamUnreachable, "refused").status(),
            StatusCode::BAD_GATEWAY
        );
        for kind in [
            FailureKind::UpstreamRejected,
            FailureKind::MalformedResponse,
            FailureKind::ProviderError,
            FailureKind::PhoneNotFound,
        ] {
            assert_eq!(exchange(kind, "x").status(), StatusCode::BAD_REQUEST, "{kind}");
        }
    }

    #[test]
    fn detail_includes_provider_code_and_message() {
        let err = exchange(FailureKind::ProviderError, "3: access token expired");
        assert_eq!(err.to_string(), "Zalo API error 3: access token expired");
    }

    #[test]
    fn configuration_detail_does_not_leak_values() {
        let err = ApiError::from(ConfigurationFault::MissingSecret);
        assert_eq!(
            err.to_string(),
            "Zalo configuration missing: Zalo secret key is not configured"
        );
    }

    #[tokio::test]
    async fn response_body_carries_detail() {
        let response = exchange(FailureKind::Timeout, "Zalo API did not respond in time").into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json["detail"],
            "Zalo API timeout: Zalo API did not respond in time"
        );
    }
}
