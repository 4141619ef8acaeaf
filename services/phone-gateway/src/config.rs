//! Configuration types and loading
//!
//! Config file path precedence: CLI arg > CONFIG_PATH env var > default.
//! Credential precedence is applied later by `zalo_auth::CredentialResolver`:
//! `[zalo]` values (`secret_key`, then `secret_key_file`) win over the
//! ZALO_SECRET_KEY / ZALO_APP_ID environment variables. A missing credential
//! is not a load error here; the resolver reports it as a configuration fault.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zalo_auth::{CredentialSource, DEFAULT_PHONE_ENDPOINT, DEFAULT_TIMEOUT, Encoding};

/// Upper bound on the exchange budget. Authorization codes expire within
/// minutes, so anything longer only delays an inevitable failure.
const MAX_TIMEOUT_SECS: u64 = 30;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub zalo: ZaloConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Inbound HTTP settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Zalo application credentials
#[derive(Debug, Default, Deserialize)]
pub struct ZaloConfig {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub secret_key: Option<Secret<String>>,
    /// Path to a file containing the secret key (alternative to inline `secret_key`)
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,
}

/// Phone exchange endpoint settings
#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            encoding: Encoding::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_route_prefix() -> String {
    "/api/v1/zalo".to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_endpoint() -> String {
    DEFAULT_PHONE_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    ///
    /// Secret key resolution within the file:
    /// 1. inline `secret_key`
    /// 2. `secret_key_file` contents
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| common::Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        // Blank inline values count as absent
        config.zalo.secret_key = config
            .zalo
            .secret_key
            .take()
            .and_then(|s| Secret::non_empty(s.expose().as_str()));

        if config.zalo.secret_key.is_none() {
            if let Some(ref key_file) = config.zalo.secret_key_file {
                let key = std::fs::read_to_string(key_file).map_err(|source| {
                    common::Error::ReadFile {
                        path: key_file.clone(),
                        source,
                    }
                })?;
                config.zalo.secret_key = Secret::non_empty(key);
            }
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.upstream.endpoint.starts_with("http://")
            && !self.upstream.endpoint.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "upstream.endpoint must start with http:// or https://, got: {}",
                self.upstream.endpoint
            )));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.upstream.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(common::Error::Config(format!(
                "timeout_secs must be at most {MAX_TIMEOUT_SECS}, got: {}",
                self.upstream.timeout_secs
            )));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if !self.server.route_prefix.starts_with('/') {
            return Err(common::Error::Config(format!(
                "route_prefix must start with '/', got: {}",
                self.server.route_prefix
            )));
        }

        Ok(())
    }

    /// Typed credential values handed to the resolver.
    pub fn credential_source(&self) -> CredentialSource {
        CredentialSource {
            app_id: self.zalo.app_id.clone(),
            secret_key: self.zalo.secret_key.clone(),
        }
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("zalo-phone-gateway.toml")
    }
}
