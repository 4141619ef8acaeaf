//! Phone exchange endpoint
//!
//! Validates the inbound `{token, access_token}` body, resolves provider
//! credentials (cached for the process lifetime), runs one exchange and maps
//! the outcome to `{number}` or an [`ApiError`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use zalo_auth::{CredentialResolver, ExchangeClient, ExchangeOutcome, ExchangeRequest};

use crate::error::ApiError;
use crate::metrics;

/// Inbound body sent by the mini-app.
#[derive(Debug, Deserialize)]
pub struct PhoneRequest {
    pub token: String,
    pub access_token: String,
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct PhoneResponse {
    pub number: String,
}

/// Shared state passed to the phone handler via axum State extractor
#[derive(Clone)]
pub struct PhoneState {
    pub client: ExchangeClient,
    pub resolver: Arc<CredentialResolver>,
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub in_flight: Arc<AtomicU64>,
}

/// Decrements the in-flight gauge when the request finishes or is cancelled.
struct InFlight<'a>(&'a AtomicU64);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Handle one phone exchange request.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn resolve_phone(
    state: &PhoneState,
    body: Result<Json<PhoneRequest>, JsonRejection>,
    request_id: String,
) -> Result<Json<PhoneResponse>, ApiError> {
    state.requests_total.fetch_add(1, Ordering::Relaxed);
    let _in_flight = InFlight::enter(&state.in_flight);

    let result = exchange(state, body).await;
    if result.is_err() {
        state.errors_total.fetch_add(1, Ordering::Relaxed);
    }
    result
}

async fn exchange(
    state: &PhoneState,
    body: Result<Json<PhoneRequest>, JsonRejection>,
) -> Result<Json<PhoneResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    let request = ExchangeRequest::new(body.token, body.access_token)?;

    // Credentials are checked before any network activity
    let credentials = state.resolver.resolve().map_err(|fault| {
        metrics::record_config_fault(fault.as_str());
        ApiError::from(fault)
    })?;

    let started = Instant::now();
    let outcome = state.client.resolve_phone(&request, &credentials).await;
    metrics::record_exchange(outcome.label(), started.elapsed().as_secs_f64());

    match outcome {
        ExchangeOutcome::Resolved { phone_number } => {
            info!("phone exchange succeeded");
            Ok(Json(PhoneResponse {
                number: phone_number,
            }))
        }
        ExchangeOutcome::Failed(failure) => Err(failure.into()),
    }
}
