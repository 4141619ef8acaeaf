//! Zalo phone-number exchange library
//!
//! Brokers the one-time exchange of a mini-app authorization code and access
//! token for a verified phone number. This crate has no dependency on the
//! gateway binary and can be tested on its own.
//!
//! Exchange flow:
//! 1. Gateway resolves credentials once via `credentials::CredentialResolver`
//! 2. Inbound body is validated into an `exchange::ExchangeRequest`
//! 3. `client::ExchangeClient::resolve_phone()` issues one upstream call
//!    through a `transport::PhoneTransport`
//! 4. The reply is classified into an `exchange::ExchangeOutcome`

pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod transport;

pub use client::ExchangeClient;
pub use constants::*;
pub use credentials::{CredentialResolver, CredentialSource, ProviderCredentials};
pub use error::{ConfigurationFault, InvalidRequest, TransportError};
pub use exchange::{ExchangeFailure, ExchangeOutcome, ExchangeRequest, FailureKind};
pub use transport::{Encoding, HttpTransport, PhoneTransport, UpstreamCall, UpstreamReply};
