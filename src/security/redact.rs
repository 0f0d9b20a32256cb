// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pattern-based removal of credentials from text bound for logs and
//! terminals.
//!
//! This is a best-effort layer: it recognizes common credential shapes
//! (authorization headers, database URLs, PEM private keys, `key=value`
//! secrets, bearer tokens) and masks them. It is not a secret scanner and
//! must not be treated as a security boundary on its own.

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker appended by [`sanitize_log_message`] when text is cut short.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Mask used in place of a removed secret.
pub const MASK: &str = "***";

struct RedactionRule {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> RedactionRule {
    RedactionRule {
        // Patterns are compile-time constants covered by the tests below.
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid redaction regex: {e}")),
        replacement,
    }
}

/// Ordered most specific first so a broad rule never pre-empts a precise one.
static RULES: Lazy<Vec<RedactionRule>> = Lazy::new(|| {
    vec![
        rule(
            r#"(?i)(authorization["']?\s*[:=]\s*["']?)(?:(?:bearer|basic|token|digest)\s+)?[^\s"',;&]+"#,
            "${1}***",
        ),
        rule(
            r"(?i)((?:mysql|mysqli|mariadb|postgres|postgresql)://[^:/@\s]+:)[^@\s]+@",
            "${1}***@",
        ),
        rule(
            r"(?s)-----BEGIN ([A-Z0-9 ]*)PRIVATE KEY-----.*?-----END [A-Z0-9 ]*PRIVATE KEY-----",
            "-----BEGIN ${1}PRIVATE KEY-----***-----END ${1}PRIVATE KEY-----",
        ),
        // Field names may carry `_`-joined prefixes (DB_PASSWORD, WP_API_KEY).
        rule(
            r#"(?i)(^|[^A-Za-z0-9_])((?:[A-Za-z0-9]+_)*(?:password|passwd|pass|api_token|access_token|token|api_key|apikey|key))(["']?[ \t]*[=:][ \t]*["']?)[^\s&"']+"#,
            "${1}${2}${3}***",
        ),
        rule(r"(?i)\b(bearer)\s+[A-Za-z0-9\-._~+/]+=*", "${1} ***"),
    ]
});

/// Paths that only mean something on the machine that built the binary.
static INTERNAL_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:/[^\s/:]+)*/(?:\.cargo/registry|\.rustup/toolchains|rustc/[0-9a-f]+|target/(?:debug|release))/[^\s:]*(?::\d+(?::\d+)?)?")
        .unwrap_or_else(|e| panic!("invalid internal path regex: {e}"))
});

/// ANSI escape sequences.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b\][^\x07]*\x07")
        .unwrap_or_else(|e| panic!("invalid escape regex: {e}"))
});

/// Mask every recognizable credential in `text`.
///
/// # Examples
///
/// ```
/// use wpguard::security::remove_sensitive_data;
///
/// let out = remove_sensitive_data("mysqldump failed: mysql://root:hunter2@db:3306/wp");
/// assert!(!out.contains("hunter2"));
/// assert!(out.contains("mysql://root:***@db"));
/// ```
pub fn remove_sensitive_data(text: &str) -> String {
    let mut current: Cow<'_, str> = Cow::Borrowed(text);
    for rule in RULES.iter() {
        let replaced = rule.pattern.replace_all(current.as_ref(), rule.replacement);
        if matches!(replaced, Cow::Borrowed(_)) {
            continue;
        }
        current = Cow::Owned(replaced.into_owned());
    }
    current.into_owned()
}

fn truncate_at_char_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Redact `text` and cap it at `max_len` bytes for a log line.
///
/// When the redacted text is longer than `max_len` it is cut on a character
/// boundary and [`TRUNCATION_MARKER`] is appended.
pub fn sanitize_log_message(text: &str, max_len: usize) -> String {
    let redacted = remove_sensitive_data(text);
    if redacted.len() <= max_len {
        return redacted;
    }
    let mut out = truncate_at_char_boundary(&redacted, max_len).to_string();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Render an error for a terminal.
///
/// Credentials are masked, build-machine paths are replaced with
/// `<internal>`, escape sequences are removed and any other control
/// characters except newline and tab are dropped.
pub fn sanitize_error_for_user(err: &dyn fmt::Display) -> String {
    let redacted = remove_sensitive_data(&err.to_string());
    let without_paths = INTERNAL_PATH.replace_all(&redacted, "<internal>");
    let without_escapes = ANSI_ESCAPE.replace_all(&without_paths, "");
    without_escapes
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
