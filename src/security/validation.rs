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

//! Validators for paths, file names and SQL identifiers.
//!
//! Every function here is a pure, total transform from an input string to
//! either the sanitized value or a [`ValidationError`]. None of them touch
//! the filesystem except [`validate_file_path`], which only reads the
//! current directory to make relative paths absolute.
//!
//! # Security
//!
//! These functions are designed to prevent:
//! - Path traversal out of a site root
//! - SQL identifier injection through table names and prefixes
//! - Shell metacharacters reaching rsync filter rules

use std::path::{Component, Path, PathBuf};

use crate::shared::error::ValidationError;

/// Maximum length of a single file name component.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum length of a MySQL identifier.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Maximum length of an rsync include/exclude pattern.
pub const MAX_RSYNC_PATTERN_LENGTH: usize = 256;

/// Sequences that indicate directory traversal in either separator style.
const TRAVERSAL_PATTERNS: &[&str] = &["../", "..\\", "/..", "\\.."];

/// Characters that must never appear in an rsync pattern.
const RSYNC_FORBIDDEN_CHARS: &[char] = &[';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

fn contains_traversal(path: &str) -> bool {
    path == ".." || TRAVERSAL_PATTERNS.iter().any(|pattern| path.contains(pattern))
}

/// Lexically normalize a slash-separated path.
///
/// Repeated separators and `.` elements are dropped and `name/..` pairs are
/// folded. A `..` that would climb above the start of a relative path is
/// kept, and one that would climb above `/` is discarded. An empty result
/// becomes `.` (or `/` for rooted input).
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Validate a path that will be handed to a remote command or rsync.
///
/// The traversal check runs on the raw input and again on its cleaned form,
/// so sequences that only appear after normalization are still caught.
///
/// # Returns
///
/// Returns the cleaned path if validation succeeds.
///
/// # Errors
///
/// Returns an error if:
/// - Path is empty or contains a NUL byte
/// - Path contains `../`, `..\`, `/..` or `\..` before or after cleaning
///
/// # Examples
///
/// ```
/// use wpguard::security::validate_path;
///
/// assert_eq!(validate_path("wp-content//uploads/./2024").unwrap(), "wp-content/uploads/2024");
/// assert!(validate_path("wp-content/../../etc/passwd").is_err());
/// ```
pub fn validate_path(path: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "path";

    if path.is_empty() {
        return Err(ValidationError::empty(FIELD));
    }

    if path.contains('\0') {
        return Err(ValidationError::invalid_characters(FIELD));
    }

    if contains_traversal(path) {
        return Err(ValidationError::new(FIELD, "path traversal detected"));
    }

    let cleaned = clean_path(path);
    if contains_traversal(&cleaned) {
        return Err(ValidationError::new(
            FIELD,
            "path traversal detected after normalization",
        ));
    }

    Ok(cleaned)
}

fn normalize_absolute(path: &Path) -> Result<PathBuf, ValidationError> {
    let absolute = std::path::absolute(path).map_err(|e| {
        ValidationError::new("file_path", format!("cannot resolve absolute path: {e}"))
    })?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Validate a local path and require that it stays inside `allowed_dir`.
///
/// Both paths are made absolute (relative input resolves against the current
/// directory) and compared component-wise, so `/srv/site-evil` is not
/// considered to be inside `/srv/site`.
///
/// # Errors
///
/// Returns an error if the path fails [`validate_path`], cannot be made
/// absolute, or resolves outside `allowed_dir`.
pub fn validate_file_path(path: &str, allowed_dir: &Path) -> Result<PathBuf, ValidationError> {
    let cleaned = validate_path(path)?;

    let resolved = normalize_absolute(Path::new(&cleaned))?;
    let allowed = normalize_absolute(allowed_dir)?;

    if !resolved.starts_with(&allowed) {
        return Err(ValidationError::new(
            "file_path",
            "path resolves outside the allowed directory",
        ));
    }

    Ok(resolved)
}

/// Validate a single file name.
///
/// Any directory part is stripped first, so `uploads/photo.jpg` validates
/// as `photo.jpg`.
///
/// # Examples
///
/// ```
/// use wpguard::security::validate_filename;
///
/// assert_eq!(validate_filename("backup-2024.sql.gz").unwrap(), "backup-2024.sql.gz");
/// assert_eq!(validate_filename("dumps/site.sql").unwrap(), "site.sql");
/// assert!(validate_filename("..").is_err());
/// assert!(validate_filename("my file.txt").is_err());
/// ```
pub fn validate_filename(name: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "filename";

    let trimmed = name.trim_end_matches(['/', '\\']);
    let base = trimmed.rsplit(['/', '\\']).next().unwrap_or_default();

    if base.is_empty() {
        return Err(ValidationError::empty(FIELD));
    }

    if base == "." || base == ".." || base == "~" {
        return Err(ValidationError::new(FIELD, "reserved file name"));
    }

    if base.len() > MAX_FILENAME_LENGTH {
        return Err(ValidationError::too_long(FIELD, MAX_FILENAME_LENGTH));
    }

    let valid_chars = base
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');
    if !valid_chars {
        return Err(ValidationError::invalid_characters(FIELD));
    }

    Ok(base.to_string())
}

fn validate_identifier(
    field: &str,
    value: &str,
    allow_hyphen: bool,
) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::empty(field));
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::too_long(field, MAX_IDENTIFIER_LENGTH));
    }

    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_hyphen && c == '-'));
    if !valid_chars {
        return Err(ValidationError::invalid_characters(field));
    }

    Ok(value.to_string())
}

/// Validate a WordPress database table prefix such as `wp_`.
///
/// # Examples
///
/// ```
/// use wpguard::security::validate_table_prefix;
///
/// assert!(validate_table_prefix("wp_").is_ok());
/// assert!(validate_table_prefix("wp_'; DROP TABLE users--").is_err());
/// ```
pub fn validate_table_prefix(prefix: &str) -> Result<String, ValidationError> {
    validate_identifier("table_prefix", prefix, false)
}

/// Validate a database table name. Hyphens are allowed here, unlike prefixes.
pub fn validate_table_name(name: &str) -> Result<String, ValidationError> {
    validate_identifier("table_name", name, true)
}

/// Validate an rsync include/exclude pattern.
///
/// Glob characters are legitimate in filter rules and pass through; only
/// characters that would let the pattern escape into a shell are refused.
pub fn validate_rsync_pattern(pattern: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "rsync_pattern";

    if pattern.is_empty() {
        return Err(ValidationError::empty(FIELD));
    }

    if pattern.len() > MAX_RSYNC_PATTERN_LENGTH {
        return Err(ValidationError::too_long(FIELD, MAX_RSYNC_PATTERN_LENGTH));
    }

    if let Some(ch) = pattern.chars().find(|c| RSYNC_FORBIDDEN_CHARS.contains(c)) {
        return Err(ValidationError::new(
            FIELD,
            format!("contains forbidden character '{}'", ch.escape_default()),
        ));
    }

    Ok(pattern.to_string())
}

/// Validate a hostname before it is placed on an ssh command line.
///
/// Accepts DNS names, IPv4 and bracketed or bare IPv6 literals.
///
/// # Examples
///
/// ```
/// use wpguard::security::validate_hostname;
///
/// assert!(validate_hostname("ssh.host.example").is_ok());
/// assert!(validate_hostname("[::1]").is_ok());
/// assert!(validate_hostname("example.com; ls").is_err());
/// assert!(validate_hostname("-oProxyCommand=x").is_err());
/// ```
pub fn validate_hostname(hostname: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "hostname";

    if hostname.is_empty() {
        return Err(ValidationError::empty(FIELD));
    }

    // RFC 1123
    const MAX_HOSTNAME_LENGTH: usize = 253;
    if hostname.len() > MAX_HOSTNAME_LENGTH {
        return Err(ValidationError::too_long(FIELD, MAX_HOSTNAME_LENGTH));
    }

    let valid_chars = hostname.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == ':' || c == '[' || c == ']'
    });
    if !valid_chars {
        return Err(ValidationError::invalid_characters(FIELD));
    }

    // A leading hyphen would be read as an option by ssh
    if hostname.starts_with('-') {
        return Err(ValidationError::new(FIELD, "hostname cannot start with a hyphen"));
    }

    if hostname.contains("..") || hostname.contains("--") {
        return Err(ValidationError::new(
            FIELD,
            "hostname contains suspicious repeated characters",
        ));
    }

    Ok(hostname.to_string())
}

/// Validate a remote login name.
pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "username";

    if username.is_empty() {
        return Err(ValidationError::empty(FIELD));
    }

    const MAX_USERNAME_LENGTH: usize = 32;
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::too_long(FIELD, MAX_USERNAME_LENGTH));
    }

    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !valid_chars {
        return Err(ValidationError::invalid_characters(FIELD));
    }

    if username.starts_with('-') {
        return Err(ValidationError::new(FIELD, "username cannot start with a hyphen"));
    }

    Ok(username.to_string())
}
