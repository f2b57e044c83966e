//! Helpers for sanitizing data before it enters tracing spans or a job's
//! user-visible message.
//!
//! Job messages are read by pollers, so they carry no local paths, no
//! credentials in URLs and no raw tool payloads.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Longest message stored on a job row.
pub const MAX_MESSAGE_CHARS: usize = 240;

static SECRET_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)((?:api_?key|key|token|secret|signature|sig)=)[^&\s]+").unwrap()
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static ABS_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s|')(/[^\s':]+/)+([^\s'/:]+)").unwrap());
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(bearer\s+|sk-)[A-Za-z0-9._\-]+").unwrap());

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Strips userinfo and key-like query parameters from a URL.
///
/// - `https://user:pw@host/x` -> `https://****@host/x`
/// - `https://host/x?api_key=abc&page=2` -> `https://host/x?api_key=****&page=2`
pub fn redact_url(url: &str) -> String {
    let mut out = url.to_string();

    if let Some(scheme_end) = out.find("://") {
        let after_scheme = &out[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].rfind('@') {
            out = format!(
                "{}****@{}",
                &out[..scheme_end + 3],
                &after_scheme[at_pos + 1..]
            );
        }
    }

    SECRET_PARAM_RE.replace_all(&out, "${1}****").into_owned()
}

/// Normalizes an error into a message fit for a job row: credentials
/// and directories removed, whitespace collapsed, length capped.
pub fn job_message(raw: &str) -> String {
    let redacted = URL_RE.replace_all(raw, |caps: &regex::Captures<'_>| redact_url(&caps[0]));
    let redacted = BEARER_RE.replace_all(&redacted, "${1}****");
    let redacted = ABS_PATH_RE.replace_all(&redacted, |caps: &regex::Captures<'_>| {
        let lead = caps[0].chars().next().filter(|c| *c != '/');
        format!("{}{}", lead.map(String::from).unwrap_or_default(), &caps[2])
    });

    let collapsed = redacted.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, MAX_MESSAGE_CHARS)
}

/// Cuts `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
