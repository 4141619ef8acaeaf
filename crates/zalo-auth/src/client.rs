//! Identity exchange client
//!
//! One call to `resolve_phone` is one use of a single-use authorization code:
//! the transport is invoked exactly once, under a hard deadline, and never
//! retried here. Retry policy belongs to the caller, who must first obtain a
//! fresh code from the mini-app host.
//!
//! Failure messages may quote the upstream, which is free to echo its
//! request parameters. They are scrubbed of the secret and both tokens before
//! they are logged or returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::redact::{obscure, scrub};
use tracing::{info, instrument, warn};

use crate::credentials::ProviderCredentials;
use crate::error::TransportError;
use crate::exchange::{
    ExchangeOutcome, ExchangeRequest, classify_reply, classify_transport_error,
};
use crate::transport::{PhoneTransport, UpstreamCall};

/// Exchanges authorization codes for phone numbers through a [`PhoneTransport`].
#[derive(Clone)]
pub struct ExchangeClient {
    transport: Arc<dyn PhoneTransport>,
    timeout: Duration,
}

impl ExchangeClient {
    pub fn new(transport: Arc<dyn PhoneTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a phone number for one exchange request.
    ///
    /// Dropping the returned future aborts the in-flight upstream call.
    #[instrument(
        skip_all,
        fields(
            transport = self.transport.id(),
            app_id = credentials.app_id(),
            code = %obscure(request.authorization_code()),
            access_token = %obscure(request.access_token()),
        )
    )]
    pub async fn resolve_phone(
        &self,
        request: &ExchangeRequest,
        credentials: &ProviderCredentials,
    ) -> ExchangeOutcome {
        let started = Instant::now();
        let call = UpstreamCall {
            code: request.authorization_code(),
            access_token: request.access_token(),
            secret_key: credentials.secret_key(),
        };

        let reply = match tokio::time::timeout(self.timeout, self.transport.send(call)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        let secrets = [credentials.secret_key()];
        let tokens = [request.authorization_code(), request.access_token()];
        let outcome = match reply {
            Ok(mut reply) => {
                info!(status = reply.status, "Zalo API responded");
                if !(200..300).contains(&reply.status) {
                    // Scrub before the body is cut so no partial secret survives
                    reply.body = scrub(&reply.body, &secrets, &tokens);
                }
                classify_reply(&reply)
            }
            Err(err) => classify_transport_error(&err),
        };
        let outcome = match outcome {
            ExchangeOutcome::Failed(mut failure) => {
                failure.message = scrub(&failure.message, &secrets, &tokens);
                ExchangeOutcome::Failed(failure)
            }
            resolved => resolved,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            ExchangeOutcome::Resolved { phone_number } => {
                info!(elapsed_ms, phone = %obscure(phone_number), "phone number resolved");
            }
            ExchangeOutcome::Failed(failure) => {
                warn!(
                    elapsed_ms,
                    kind = %failure.kind,
                    transient = failure.kind.is_transient(),
                    detail = %failure.message,
                    "phone exchange failed"
                );
            }
        }
        outcome
    }
}
