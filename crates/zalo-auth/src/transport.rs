//! Outbound call to the Zalo phone endpoint
//!
//! `PhoneTransport` decouples the exchange client from how the upstream is
//! reached. `HttpTransport` is the production implementation; its endpoint and
//! encoding come from configuration because the provider has accepted
//! different shapes across API versions.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::constants::{FIELD_ACCESS_TOKEN, FIELD_CODE, FIELD_SECRET_KEY, MAX_BODY_BYTES};
use crate::error::TransportError;

/// How the code, access token and secret are carried upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// `POST` with an `application/x-www-form-urlencoded` body
    #[default]
    Form,
    /// `POST` with a JSON object body
    Json,
    /// `GET` with the three values as request headers
    Headers,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Json => "json",
            Self::Headers => "headers",
        }
    }
}

/// Values sent upstream for one exchange.
pub struct UpstreamCall<'a> {
    pub code: &'a str,
    pub access_token: &'a str,
    pub secret_key: &'a str,
}

/// Raw upstream answer: status line and body text (at most
/// [`MAX_BODY_BYTES`], lossily decoded).
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

/// Abstraction over how a single exchange call reaches the provider.
///
/// Implementations issue exactly one outbound call per `send` and must not
/// retry. Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn PhoneTransport>`).
pub trait PhoneTransport: Send + Sync {
    /// Identifier for logging (e.g. "http")
    fn id(&self) -> &str;

    fn send<'a>(
        &'a self,
        call: UpstreamCall<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamReply, TransportError>> + Send + 'a>>;
}

/// reqwest-backed transport. The `reqwest::Client` is shared so the upstream
/// connection pool is reused across exchanges.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    encoding: Encoding,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        encoding: Encoding,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            encoding,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn build(&self, call: &UpstreamCall<'_>) -> reqwest::RequestBuilder {
        let fields = [
            (FIELD_CODE, call.code),
            (FIELD_ACCESS_TOKEN, call.access_token),
            (FIELD_SECRET_KEY, call.secret_key),
        ];
        let builder = match self.encoding {
            Encoding::Form => self.client.post(&self.endpoint).form(&fields),
            Encoding::Json => {
                let body: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
                    .collect();
                self.client.post(&self.endpoint).json(&body)
            }
            Encoding::Headers => fields
                .iter()
                .fold(self.client.get(&self.endpoint), |req, (name, value)| {
                    req.header(*name, *value)
                }),
        };
        builder
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
    }
}

impl PhoneTransport for HttpTransport {
    fn id(&self) -> &str {
        "http"
    }

    fn send<'a>(
        &'a self,
        call: UpstreamCall<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamReply, TransportError>> + Send + 'a>> {
        let request = self.build(&call);
        Box::pin(async move {
            debug!(
                endpoint = %self.endpoint,
                encoding = self.encoding.as_str(),
                "sending Zalo phone exchange"
            );
            let mut response = request.send().await?;
            let status = response.status().as_u16();
            let body = read_capped(&mut response, MAX_BODY_BYTES).await?;
            Ok(UpstreamReply { status, body })
        })
    }
}

/// Read at most `limit` body bytes; anything beyond is dropped unread.
async fn read_capped(
    response: &mut reqwest::Response,
    limit: usize,
) -> Result<String, TransportError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            debug!(limit, "upstream body truncated");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
