//! Error types for credential resolution and upstream transport

/// Credential faults detected before any exchange is attempted.
///
/// These are configuration problems, not per-request problems, and are
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationFault {
    #[error("Zalo secret key is not configured")]
    MissingSecret,

    #[error("Zalo app id is not configured")]
    MissingAppId,
}

impl ConfigurationFault {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSecret => "missing_secret",
            Self::MissingAppId => "missing_app_id",
        }
    }
}

/// Rejection of a caller-supplied exchange request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    #[error("token must be a non-empty string")]
    EmptyAuthorizationCode,

    #[error("access_token must be a non-empty string")]
    EmptyAccessToken,

    #[error("{0} must not contain control characters")]
    ControlCharacters(&'static str),
}

/// Failures below the HTTP status line: the upstream never answered.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("upstream call timed out")]
    Timeout,

    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// The request could not be built locally; nothing was sent.
    #[error("upstream request could not be encoded: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::Encode(err.without_url().to_string())
        } else {
            // without_url keeps query strings out of the message
            Self::Unreachable(err.without_url().to_string())
        }
    }
}
