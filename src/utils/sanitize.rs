//! Output sanitization for link rendering
//!
//! Link titles come from dashboard titles (user-controlled) and link URLs
//! may embed template variable values, so both are sanitized before they
//! reach the DOM: titles lose any markup, URLs with script-capable schemes
//! collapse to `about:blank`.

use std::sync::OnceLock;

use regex::Regex;

/// Replacement for URLs that fail the scheme check.
pub const SAFE_URL_FALLBACK: &str = "about:blank";

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

fn tag_regex() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

/// Strip markup from display text.
pub fn sanitize(text: &str) -> String {
    tag_regex().replace_all(text, "").into_owned()
}

/// Reject URLs with script-capable schemes.
///
/// The scheme check ignores leading whitespace and control characters, so
/// `\u{0}javascript:...` and `  JAVASCRIPT:...` are both rejected.
pub fn sanitize_url(url: &str) -> String {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    if UNSAFE_SCHEMES.iter().any(|scheme| normalized.starts_with(scheme)) {
        return SAFE_URL_FALLBACK.to_string();
    }
    url.to_string()
}
