//! Provider credential resolution
//!
//! Credentials are resolved at most once per resolver: the typed config value
//! wins, the process environment is the fallback, and a missing value is a
//! [`ConfigurationFault`]. The first result (success or fault) is cached so
//! request handling never re-reads the environment. [`CredentialResolver::reset`]
//! clears the cache for tests.

use std::sync::{Arc, PoisonError, RwLock};

use common::Secret;
use tracing::{info, warn};

use crate::constants::{APP_ID_ENV, SECRET_KEY_ENV};
use crate::error::ConfigurationFault;

/// Active application identifier and shared secret for the upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    app_id: String,
    secret_key: Secret<String>,
}

impl ProviderCredentials {
    /// Build credentials, rejecting blank values.
    pub fn new(
        app_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, ConfigurationFault> {
        let secret_key = Secret::non_empty(secret_key).ok_or(ConfigurationFault::MissingSecret)?;
        let app_id = app_id.into().trim().to_owned();
        if app_id.is_empty() {
            return Err(ConfigurationFault::MissingAppId);
        }
        Ok(Self { app_id, secret_key })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The shared secret. Never log the returned value.
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose()
    }
}

/// Values supplied by typed configuration. `None` defers to the environment.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    pub app_id: Option<String>,
    pub secret_key: Option<Secret<String>>,
}

type Resolution = Result<Arc<ProviderCredentials>, ConfigurationFault>;

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Lazily resolves and caches [`ProviderCredentials`].
pub struct CredentialResolver {
    source: CredentialSource,
    env: Box<EnvLookup>,
    resolved: RwLock<Option<Resolution>>,
}

impl CredentialResolver {
    /// Resolver falling back to the real process environment.
    pub fn new(source: CredentialSource) -> Self {
        Self::with_env(source, |key| std::env::var(key).ok())
    }

    /// Resolver with an injected environment lookup.
    pub fn with_env(
        source: CredentialSource,
        env: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            source,
            env: Box::new(env),
            resolved: RwLock::new(None),
        }
    }

    /// Return the active credentials, resolving them on first use.
    pub fn resolve(&self) -> Resolution {
        if let Some(cached) = self
            .resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return cached.clone();
        }

        let mut slot = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have resolved while we waited for the write lock
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }
        let resolution = self.resolve_uncached().map(Arc::new);
        *slot = Some(resolution.clone());
        resolution
    }

    /// Whether a successful resolution is cached.
    pub fn is_ready(&self) -> bool {
        matches!(
            *self.resolved.read().unwrap_or_else(PoisonError::into_inner),
            Some(Ok(_))
        )
    }

    /// Drop the cached resolution so the next call re-reads config and env.
    pub fn reset(&self) {
        *self.resolved.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn resolve_uncached(&self) -> Result<ProviderCredentials, ConfigurationFault> {
        let (secret_key, secret_from) = match self.source.secret_key.clone() {
            Some(secret) => (Some(secret), "config"),
            None => (
                (self.env)(SECRET_KEY_ENV).and_then(Secret::non_empty),
                "env",
            ),
        };

        let (app_id, app_id_from) = match non_blank(self.source.app_id.clone()) {
            Some(id) => (Some(id), "config"),
            None => (non_blank((self.env)(APP_ID_ENV)), "env"),
        };

        info!(
            secret_key_present = secret_key.is_some(),
            app_id_present = app_id.is_some(),
            secret_from,
            app_id_from,
            "resolved Zalo credentials"
        );

        let Some(secret_key) = secret_key else {
            warn!(env = SECRET_KEY_ENV, "Zalo secret key missing from config and environment");
            return Err(ConfigurationFault::MissingSecret);
        };
        let Some(app_id) = app_id else {
            warn!(env = APP_ID_ENV, "Zalo app id missing from config and environment");
            return Err(ConfigurationFault::MissingAppId);
        };

        Ok(ProviderCredentials { app_id, secret_key })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
