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

//! Trust-on-first-use host key store.
//!
//! The store is a text file with one `hostname keyType base64(key)` record
//! per line. Blank lines and `#` comments are kept verbatim across
//! rewrites; malformed lines are skipped with a warning and also kept.
//! Host matching is exact on the port-stripped hostname, with no wildcard
//! or hashed-host support.
//!
//! # Concurrency
//!
//! One [`TrustStore`] is safe to share between threads. A single
//! reader/writer lock guards the in-memory copy and the write lock is held
//! across the whole prompt-and-persist sequence, so only one trust decision
//! can be pending at a time. There is no cross-process locking: two
//! processes updating the same file can lose an update, but every write is
//! a temp-file-and-rename so the file itself is never left half written.

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use directories::BaseDirs;

use super::confirm::{Confirm, PromptKind, TrustPrompt};
use super::host_key::{normalize_hostname, HostPublicKey};
use crate::shared::error::{RejectedAt, TrustError};
use crate::utils::fs::{ensure_private_dir, write_atomic};

/// Get the default known hosts file path (`~/.wpguard/known_hosts`).
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".wpguard").join("known_hosts"))
}

/// A trusted key for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKeyRecord {
    pub hostname: String,
    pub key: HostPublicKey,
}

impl HostKeyRecord {
    fn to_line(&self) -> String {
        format!(
            "{} {} {}",
            self.hostname,
            self.key.key_type(),
            self.key.to_base64()
        )
    }

    /// Parse one record line. Fields after the key (comments) are ignored.
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let hostname = fields.next()?;
        let key_type = fields.next()?;
        let data = fields.next()?;

        // @cert-authority / @revoked markers are not supported
        if hostname.starts_with('@') {
            return None;
        }

        let key = HostPublicKey::from_base64(key_type, data).ok()?;
        Some(Self {
            hostname: hostname.to_string(),
            key,
        })
    }
}

/// Outcome of comparing a presented key with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// The stored key matches byte for byte.
    Trusted,
    /// No key is stored for the host.
    FirstUse,
    /// A different key is stored for the host.
    Mismatch,
    /// The user or policy declined; the connection must be aborted.
    ///
    /// [`TrustStore`] reports a decline as [`TrustError::Rejected`] and never
    /// returns this variant itself. Callers that want a decline as a value
    /// (the `hosts trust` command) map the error to it.
    Rejected,
}

#[derive(Debug, Clone)]
enum StoreLine {
    Record(HostKeyRecord),
    /// Comments, blank lines and anything unparsable, written back as-is.
    Verbatim(String),
}

impl StoreLine {
    /// Whether this line holds a key for `hostname`, including ignored
    /// duplicates that OpenSSH would still honor.
    fn is_for(&self, hostname: &str) -> bool {
        match self {
            StoreLine::Record(record) => record.hostname == hostname,
            StoreLine::Verbatim(raw) => {
                HostKeyRecord::parse(raw.trim()).is_some_and(|r| r.hostname == hostname)
            }
        }
    }
}

fn parse_store(path: &Path, content: &str) -> Vec<StoreLine> {
    let mut lines = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            lines.push(StoreLine::Verbatim(raw.to_string()));
            continue;
        }

        match HostKeyRecord::parse(trimmed) {
            Some(record) if seen.insert(record.hostname.clone()) => {
                lines.push(StoreLine::Record(record));
            }
            Some(record) => {
                tracing::warn!(
                    "Ignoring duplicate entry for {} at {:?}:{}",
                    record.hostname,
                    path,
                    index + 1
                );
                lines.push(StoreLine::Verbatim(raw.to_string()));
            }
            None => {
                tracing::warn!("Skipping malformed known hosts line {:?}:{}", path, index + 1);
                lines.push(StoreLine::Verbatim(raw.to_string()));
            }
        }
    }

    lines
}

fn render_store(lines: &[StoreLine]) -> String {
    let mut out = String::new();
    for line in lines {
        match line {
            StoreLine::Record(record) => out.push_str(&record.to_line()),
            StoreLine::Verbatim(raw) => out.push_str(raw),
        }
        out.push('\n');
    }
    out
}

fn find_record<'a>(lines: &'a [StoreLine], hostname: &str) -> Option<&'a HostKeyRecord> {
    lines.iter().find_map(|line| match line {
        StoreLine::Record(record) if record.hostname == hostname => Some(record),
        _ => None,
    })
}

/// Reject names that would not survive a save and reload as exactly one
/// record: whitespace or control characters would split the line and a
/// leading `#` or `@` would turn it into a comment or marker.
fn check_record_hostname(hostname: &str) -> Result<(), TrustError> {
    let invalid = hostname.is_empty()
        || hostname.starts_with('#')
        || hostname.starts_with('@')
        || hostname.chars().any(|c| c.is_whitespace() || c.is_control());
    if invalid {
        return Err(TrustError::InvalidHostname(hostname.to_string()));
    }
    Ok(())
}

fn classify_in(lines: &[StoreLine], hostname: &str, key: &HostPublicKey) -> TrustDecision {
    match find_record(lines, hostname) {
        None => TrustDecision::FirstUse,
        Some(record) if record.key == *key => TrustDecision::Trusted,
        Some(_) => TrustDecision::Mismatch,
    }
}

/// The TOFU host key store.
///
/// Construct one per process (or per configuration) and pass it by
/// reference to everything that opens connections.
pub struct TrustStore {
    path: PathBuf,
    lines: RwLock<Vec<StoreLine>>,
    confirmer: Box<dyn Confirm>,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl TrustStore {
    /// Open the store at `path`. A missing file is an empty store; it is
    /// created on the first accepted key.
    pub fn open(path: impl Into<PathBuf>, confirmer: impl Confirm + 'static) -> Result<Self, TrustError> {
        let path = path.into();
        let lines = match fs::read_to_string(&path) {
            Ok(content) => parse_store(&path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Known hosts file {:?} does not exist yet", path);
                Vec::new()
            }
            Err(e) => return Err(TrustError::io(path, e)),
        };

        tracing::debug!("Loaded known hosts file {:?}", path);
        Ok(Self {
            path,
            lines: RwLock::new(lines),
            confirmer: Box::new(confirmer),
        })
    }

    /// Open the store at [`get_default_known_hosts_path`].
    pub fn open_default(confirmer: impl Confirm + 'static) -> Result<Self, TrustError> {
        let path = get_default_known_hosts_path().ok_or_else(|| {
            TrustError::io(
                "~/.wpguard/known_hosts",
                io::Error::new(io::ErrorKind::NotFound, "could not determine home directory"),
            )
        })?;
        Self::open(path, confirmer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Vec<StoreLine>> {
        // The vector is only replaced wholesale, so a poisoned lock still
        // guards consistent data.
        self.lines.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compare `key` with the stored record without prompting.
    pub fn classify(&self, hostname: &str, key: &HostPublicKey) -> TrustDecision {
        let hostname = normalize_hostname(hostname);
        let lines = self.lines.read().unwrap_or_else(PoisonError::into_inner);
        classify_in(&lines, &hostname, key)
    }

    /// The stored record for `hostname`, if any.
    pub fn get(&self, hostname: &str) -> Option<HostKeyRecord> {
        let hostname = normalize_hostname(hostname);
        let lines = self.lines.read().unwrap_or_else(PoisonError::into_inner);
        find_record(&lines, &hostname).cloned()
    }

    /// Decide whether to trust `key` for `hostname`, prompting through the
    /// configured [`Confirm`] for new and changed keys.
    ///
    /// Returns the path that was taken: [`TrustDecision::Trusted`] for a
    /// known key, [`TrustDecision::FirstUse`] or [`TrustDecision::Mismatch`]
    /// when the user accepted and the store was updated.
    ///
    /// # Errors
    ///
    /// - [`TrustError::Rejected`] if the confirmation was declined. The
    ///   store is unchanged.
    /// - [`TrustError::InvalidHostname`] if the hostname is empty or holds
    ///   whitespace or control characters. Nothing is prompted or written.
    /// - [`TrustError::Io`] if the store could not be written.
    pub fn verify_host_key(
        &self,
        hostname: &str,
        key: &HostPublicKey,
    ) -> Result<TrustDecision, TrustError> {
        let hostname = normalize_hostname(hostname);
        check_record_hostname(&hostname)?;

        let mut lines = self.write_lock();
        let decision = classify_in(&lines, &hostname, key);

        let (kind, stage) = match decision {
            TrustDecision::Trusted => {
                tracing::debug!("Host key for {} matches known hosts", hostname);
                return Ok(TrustDecision::Trusted);
            }
            TrustDecision::FirstUse => {
                tracing::warn!(
                    "First connection to {}: {} key {}",
                    hostname,
                    key.key_type(),
                    key.fingerprint()
                );
                (PromptKind::FirstUse, RejectedAt::FirstUse)
            }
            _ => {
                let stored_fingerprint = find_record(&lines, &hostname)
                    .map(|r| r.key.fingerprint())
                    .unwrap_or_default();
                tracing::warn!(
                    "HOST KEY CHANGED for {}: stored {} presented {}",
                    hostname,
                    stored_fingerprint,
                    key.fingerprint()
                );
                (
                    PromptKind::Mismatch { stored_fingerprint },
                    RejectedAt::Mismatch,
                )
            }
        };

        let prompt = TrustPrompt {
            hostname: &hostname,
            key_type: key.key_type(),
            fingerprint: key.fingerprint(),
            kind,
            store_path: &self.path,
        };

        if !self.confirmer.confirm(&prompt) {
            tracing::warn!("Host key for {} rejected", hostname);
            return Err(TrustError::Rejected { hostname, stage });
        }

        let mut updated: Vec<StoreLine> = lines
            .iter()
            .filter(|line| !line.is_for(&hostname))
            .cloned()
            .collect();
        updated.push(StoreLine::Record(HostKeyRecord {
            hostname: hostname.clone(),
            key: key.clone(),
        }));

        self.persist(&updated)?;
        *lines = updated;

        tracing::info!(
            "Trusted {} key {} for {} in {:?}",
            key.key_type(),
            key.fingerprint(),
            hostname,
            self.path
        );
        Ok(decision)
    }

    /// Remove the record for `hostname`.
    ///
    /// # Errors
    ///
    /// [`TrustError::UnknownHost`] if no record exists.
    pub fn remove_host_key(&self, hostname: &str) -> Result<(), TrustError> {
        let hostname = normalize_hostname(hostname);
        let mut lines = self.write_lock();

        if find_record(&lines, &hostname).is_none() {
            return Err(TrustError::UnknownHost(hostname));
        }

        let updated: Vec<StoreLine> = lines
            .iter()
            .filter(|line| !line.is_for(&hostname))
            .cloned()
            .collect();

        self.persist(&updated)?;
        *lines = updated;
        tracing::info!("Removed host key for {} from {:?}", hostname, self.path);
        Ok(())
    }

    /// Hostnames with a trusted key, in file order.
    pub fn list_known_hosts(&self) -> Vec<String> {
        let lines = self.lines.read().unwrap_or_else(PoisonError::into_inner);
        lines
            .iter()
            .filter_map(|line| match line {
                StoreLine::Record(record) => Some(record.hostname.clone()),
                StoreLine::Verbatim(_) => None,
            })
            .collect()
    }

    fn persist(&self, lines: &[StoreLine]) -> Result<(), TrustError> {
        if let Some(dir) = self.path.parent() {
            ensure_private_dir(dir).map_err(|e| TrustError::io(dir, e))?;
        }
        write_atomic(&self.path, render_store(lines).as_bytes())
            .map_err(|e| TrustError::io(&self.path, e))
    }
}

/// The host key check an SSH transport calls before completing a handshake.
pub trait HostKeyCallback {
    /// Return `Ok(())` to continue the handshake; any error aborts it.
    fn check_host_key(
        &self,
        hostname: &str,
        address: Option<SocketAddr>,
        key: &HostPublicKey,
    ) -> Result<(), TrustError>;
}

impl HostKeyCallback for TrustStore {
    fn check_host_key(
        &self,
        hostname: &str,
        address: Option<SocketAddr>,
        key: &HostPublicKey,
    ) -> Result<(), TrustError> {
        if let Some(addr) = address {
            tracing::debug!("Checking host key for {} ({})", hostname, addr);
        }
        self.verify_host_key(hostname, key).map(|_| ())
    }
}
