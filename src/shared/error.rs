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

//! Error types shared by the trust store, the sanitizers and the checksum
//! verifier.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: a sanitizer rejected one input; always recoverable
//! - [`TrustError`]: host-key trust was refused or the store could not be used
//! - [`ExecError`]: the remote command capability failed
//! - [`ChecksumError`]: one verification call could not be completed

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for input validation failures.
///
/// This error is returned when user input fails a sanitizer check.
///
/// # Examples
///
/// ```
/// use wpguard::shared::error::ValidationError;
///
/// let err = ValidationError::new("table_prefix", "contains invalid characters");
/// assert!(err.to_string().contains("table_prefix"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error for '{field}': {message}")]
pub struct ValidationError {
    /// The field or input that failed validation
    pub field: String,
    /// Description of why validation failed
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an error for an empty field.
    pub fn empty(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} cannot be empty"),
            field,
        }
    }

    /// Create an error for a field that is too long.
    pub fn too_long(field: impl Into<String>, max_length: usize) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} exceeds maximum length of {max_length}"),
            field,
        }
    }

    /// Create an error for invalid characters.
    pub fn invalid_characters(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} contains invalid characters"),
            field,
        }
    }
}

/// Which trust question the user declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectedAt {
    /// The host had never been seen before.
    FirstUse,
    /// The host presented a key different from the stored one.
    Mismatch,
}

impl fmt::Display for RejectedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectedAt::FirstUse => write!(f, "first connection declined"),
            RejectedAt::Mismatch => write!(f, "changed key declined"),
        }
    }
}

/// Errors raised by the known-hosts trust store.
#[derive(Debug, Error)]
pub enum TrustError {
    /// The user (or the configured policy) declined to trust the key.
    #[error("host key for '{hostname}' was not trusted ({stage})")]
    Rejected { hostname: String, stage: RejectedAt },

    /// The store file could not be read or written.
    #[error("known hosts file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The hostname cannot be stored as a single record: it is empty or
    /// contains whitespace or control characters.
    #[error("invalid hostname for known hosts: {0:?}")]
    InvalidHostname(String),

    /// `remove` was asked for a host that has no record.
    #[error("no known host key for '{0}'")]
    UnknownHost(String),
}

impl TrustError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TrustError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` when the error is a user or policy rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TrustError::Rejected { .. })
    }
}

/// Errors raised by a [`RemoteExecutor`](crate::ssh::exec::RemoteExecutor).
#[derive(Debug, Error)]
pub enum ExecError {
    /// The transport program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The remote command ran but reported failure.
    #[error("remote command exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    /// The host did not present a usable key.
    #[error("no host key returned by {0}")]
    NoHostKey(String),

    /// The command produced output that is not valid UTF-8.
    #[error("remote command produced non UTF-8 output")]
    InvalidOutput,

    /// The connection target could not be parsed or validated.
    #[error(transparent)]
    InvalidTarget(#[from] ValidationError),
}

/// Errors that abort a single checksum verification.
///
/// Digest differences are never reported through this type; they are
/// data in the [`ChecksumReport`](crate::checksum::ChecksumReport).
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The remote root did not pass the shell-token whitelist.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote hashing command failed.
    #[error("remote checksum command failed: {0}")]
    Remote(#[from] ExecError),

    /// A local file could not be read.
    #[error("failed to hash {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The local directory walk failed.
    #[error("failed to walk local tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// The local root is missing or not a directory.
    #[error("local root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = ValidationError::new("filename", "contains spaces");
        assert_eq!(err.field, "filename");
        assert!(err.to_string().contains("Validation error"));

        let empty_err = ValidationError::empty("table_name");
        assert!(empty_err.message.contains("cannot be empty"));

        let long_err = ValidationError::too_long("table_prefix", 64);
        assert!(long_err.message.contains("64"));

        let chars_err = ValidationError::invalid_characters("rsync_pattern");
        assert_eq!(chars_err.field, "rsync_pattern");
    }

    #[test]
    fn test_trust_error_display() {
        let err = TrustError::Rejected {
            hostname: "host.example".to_string(),
            stage: RejectedAt::Mismatch,
        };
        assert!(err.is_rejection());
        assert!(err.to_string().contains("host.example"));
        assert!(err.to_string().contains("changed key"));

        let io_err = TrustError::io(
            "/tmp/known_hosts",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io_err.is_rejection());
        assert!(io_err.to_string().contains("/tmp/known_hosts"));
    }

    #[test]
    fn test_checksum_error_from_exec() {
        let err: ChecksumError = ExecError::Failed {
            status: 2,
            stderr: "find: no such file".to_string(),
        }
        .into();
        assert!(err.to_string().contains("status 2"));
    }
}
