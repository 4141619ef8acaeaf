//! Redaction helpers for diagnostic output
//!
//! Authorization codes and access tokens are bearer-equivalent, so they are
//! never logged in full. Upstream response bodies are truncated before they
//! reach logs or error details, and [`scrub`] removes any credential the
//! upstream echoed back.

/// Replacement for secret material found in free-form text.
pub const REDACTED: &str = "[REDACTED]";

/// Number of leading characters kept by [`obscure`].
const VISIBLE_PREFIX: usize = 4;

/// Tokens at or below this length are fully masked.
const MIN_PARTIAL_LEN: usize = 8;

/// Obscure a bearer-equivalent token, keeping a short prefix and the length.
///
/// `"abc123def456"` becomes `"abc1…(12 chars)"`; short values are fully masked.
pub fn obscure(token: &str) -> String {
    let len = token.chars().count();
    if len <= MIN_PARTIAL_LEN {
        return format!("***({len} chars)");
    }
    let prefix: String = token.chars().take(VISIBLE_PREFIX).collect();
    format!("{prefix}…({len} chars)")
}

/// Truncate free-form text (e.g. an upstream body) to at most `max_chars`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_owned(),
    }
}

/// Remove known credential values from free-form text.
///
/// Every occurrence of a `secrets` entry becomes [`REDACTED`]; every
/// occurrence of a `tokens` entry becomes its [`obscure`]d form. Empty values
/// are ignored.
pub fn scrub(text: &str, secrets: &[&str], tokens: &[&str]) -> String {
    let mut out = text.to_owned();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        out = out.replace(secret, REDACTED);
    }
    for token in tokens.iter().filter(|t| !t.is_empty()) {
        out = out.replace(token, &obscure(token));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obscure_keeps_prefix_and_length_only() {
        let out = obscure("abc123def456ghi");
        assert_eq!(out, "abc1…(15 chars)");
        assert!(!out.contains("def456"));
    }

    #[test]
    fn obscure_masks_short_tokens_entirely() {
        assert_eq!(obscure("abc123"), "***(6 chars)");
        assert_eq!(obscure(""), "***(0 chars)");
    }

    #[test]
    fn obscure_is_char_boundary_safe() {
        let out = obscure("đăngnhậpthửnghiệm");
        assert!(out.starts_with("đăng…"), "got: {out}");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(500);
        let out = excerpt(&body, 200);
        assert_eq!(out.chars().count(), 201);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn excerpt_leaves_short_bodies_alone() {
        assert_eq!(excerpt("  bad gateway \n", 200), "bad gateway");
    }

    #[test]
    fn scrub_removes_secrets_and_obscures_tokens() {
        let text = "secret_key=TOP-SECRET-KEY code=abc123-long-auth-code again TOP-SECRET-KEY";
        let out = scrub(text, &["TOP-SECRET-KEY"], &["abc123-long-auth-code"]);
        assert_eq!(
            out,
            "secret_key=[REDACTED] code=abc1…(21 chars) again [REDACTED]"
        );
    }

    #[test]
    fn scrub_ignores_empty_values() {
        assert_eq!(scrub("bad gateway", &[""], &[""]), "bad gateway");
    }
}
