//! Secret wrapper for sensitive values

use serde::{Deserialize, Deserializer};
use std::fmt;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Wrap a string, treating empty or whitespace-only input as absent.
    pub fn non_empty(value: impl Into<String>) -> Option<Self> {
        let mut value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            value.zeroize();
            return None;
        }
        if trimmed.len() != value.len() {
            let owned = trimmed.to_owned();
            value.zeroize();
            return Some(Self(owned));
        }
        Some(Self(value))
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Allows secrets to be read straight from config files without an
/// intermediate plain `String` field.
impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacts_debug_and_display() {
        let secret = Secret::new(String::from("zalo-secret-key"));
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(secret.to_string(), "[REDACTED]");
    }

    #[test]
    fn test_secret_exposes_value() {
        let secret = Secret::new(String::from("zalo-secret-key"));
        assert_eq!(secret.expose(), "zalo-secret-key");
    }

    #[test]
    fn non_empty_rejects_blank_input() {
        assert!(Secret::non_empty("").is_none());
        assert!(Secret::non_empty("  \n\t").is_none());
    }

    #[test]
    fn deserializes_from_toml_string() {
        #[derive(serde::Deserialize)]
        struct Section {
            key: Secret<String>,
        }
        let section: Section = toml::from_str(r#"key = "from-config""#).unwrap();
        assert_eq!(section.key.expose(), "from-config");
    }

    #[test]
    fn non_empty_trims_surrounding_whitespace() {
        let secret = Secret::non_empty("  key-from-file\n").unwrap();
        assert_eq!(secret.expose(), "key-from-file");
    }
}
