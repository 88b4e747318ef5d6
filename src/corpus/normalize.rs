//! Token normalization for social-media text.
//!
//! URL-like and @-mention-like tokens carry no generalizable lexical signal,
//! so they are collapsed to fixed placeholders before vocabulary
//! construction. The substitution is a deterministic string-pattern match.

use std::sync::OnceLock;

use regex::Regex;

/// Placeholder replacing URL-like tokens.
pub const URL_TOKEN: &str = "<URL>";

/// Placeholder replacing @-mention-like tokens.
pub const USR_TOKEN: &str = "<USR>";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(https?://|www\.)").expect("static pattern compiles"))
}

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^@.+").expect("static pattern compiles"))
}

/// Placeholder for `token`, or `None` when it needs no replacement.
pub fn normalize_token(token: &str) -> Option<&'static str> {
    if url_pattern().is_match(token) {
        Some(URL_TOKEN)
    } else if mention_pattern().is_match(token) {
        Some(USR_TOKEN)
    } else {
        None
    }
}
