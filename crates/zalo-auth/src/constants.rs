//! Zalo Open API constants
//!
//! Defaults for the phone exchange. The upstream's accepted endpoint and
//! encoding have varied across API versions, so every value here can be
//! overridden from the gateway configuration.

use std::time::Duration;

/// Default phone exchange endpoint (form-encoded POST)
pub const DEFAULT_PHONE_ENDPOINT: &str = "https://graph.zalo.me/v2.0/miniapp/phone/getphone";

/// Default budget for one upstream exchange. Authorization codes expire
/// within minutes, so a slow call is surfaced as a timeout rather than waited on.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Environment fallback for the application identifier
pub const APP_ID_ENV: &str = "ZALO_APP_ID";

/// Environment fallback for the shared secret
pub const SECRET_KEY_ENV: &str = "ZALO_SECRET_KEY";

/// Upstream field carrying the authorization code
pub const FIELD_CODE: &str = "code";

/// Upstream field carrying the access token
pub const FIELD_ACCESS_TOKEN: &str = "access_token";

/// Upstream field carrying the shared secret
pub const FIELD_SECRET_KEY: &str = "secret_key";

/// Maximum characters of an upstream body kept in error details and logs
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Upper bound on upstream body bytes read into memory; the rest is discarded
pub const MAX_BODY_BYTES: usize = 64 * 1024;
