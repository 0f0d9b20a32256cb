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

//! Server public keys as presented during the SSH handshake.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from parsing the textual `type base64` key form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("missing key type")]
    MissingType,
    #[error("missing key data")]
    MissingData,
    #[error("key data is not valid base64: {0}")]
    InvalidBase64(String),
    #[error("key data is empty")]
    EmptyKey,
}

/// A host public key: its algorithm name and the marshaled SSH wire blob.
///
/// Equality is byte-for-byte on the blob plus the algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPublicKey {
    key_type: String,
    blob: Vec<u8>,
}

impl HostPublicKey {
    pub fn new(key_type: impl Into<String>, blob: impl Into<Vec<u8>>) -> Self {
        Self {
            key_type: key_type.into(),
            blob: blob.into(),
        }
    }

    /// Parse `"<type> <base64> [comment]"`, the form used by `ssh-keyscan`,
    /// `authorized_keys` and `*.pub` files.
    pub fn from_openssh(text: &str) -> Result<Self, KeyParseError> {
        let mut fields = text.split_whitespace();
        let key_type = fields.next().ok_or(KeyParseError::MissingType)?;
        let data = fields.next().ok_or(KeyParseError::MissingData)?;
        Self::from_base64(key_type, data)
    }

    pub(crate) fn from_base64(key_type: &str, data: &str) -> Result<Self, KeyParseError> {
        let blob = STANDARD
            .decode(data)
            .map_err(|e| KeyParseError::InvalidBase64(e.to_string()))?;
        if blob.is_empty() {
            return Err(KeyParseError::EmptyKey);
        }
        Ok(Self::new(key_type, blob))
    }

    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// The marshaled key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    /// Padded standard base64 of the blob, as written to known_hosts.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.blob)
    }

    /// `SHA256:` followed by the unpadded base64 SHA-256 of the blob.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.blob)
    }
}

/// Compute the OpenSSH-style SHA-256 fingerprint of marshaled key bytes.
///
/// # Examples
///
/// ```
/// use wpguard::ssh::host_key::fingerprint;
///
/// let fp = fingerprint(b"key bytes");
/// assert!(fp.starts_with("SHA256:"));
/// assert!(!fp.ends_with('='));
/// ```
pub fn fingerprint(blob: &[u8]) -> String {
    let digest = Sha256::digest(blob);
    format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))
}

/// Reduce a `host`, `host:port`, `[host]:port` or `[v6]:port` string to the
/// bare host used as the known_hosts key.
///
/// Bare IPv6 literals (more than one colon, no brackets) are returned as-is.
pub fn normalize_hostname(host: &str) -> String {
    let host = host.trim();

    if let Some(rest) = host.strip_prefix('[') {
        if let Some((inner, after)) = rest.split_once(']') {
            let port_ok = after.is_empty()
                || after
                    .strip_prefix(':')
                    .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            if port_ok && !inner.is_empty() {
                return inner.to_string();
            }
        }
        return host.to_string();
    }

    match host.split_once(':') {
        Some((name, port))
            if !name.is_empty()
                && !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            name.to_string()
        }
        _ => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(&11u32.to_be_bytes());
        blob.extend_from_slice(b"ssh-ed25519");
        blob.extend_from_slice(&32u32.to_be_bytes());
        blob.extend_from_slice(&[7u8; 32]);
        blob
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = HostPublicKey::new("ssh-ed25519", sample_blob());
        let b = HostPublicKey::new("ssh-ed25519", sample_blob());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("SHA256:"));
        // 32 byte digest -> 43 unpadded base64 characters
        assert_eq!(a.fingerprint().len(), "SHA256:".len() + 43);

        let mut other = sample_blob();
        other[20] ^= 1;
        assert_ne!(a.fingerprint(), fingerprint(&other));
    }

    #[test]
    fn test_known_fingerprint_vector() {
        // sha256("") = e3b0c442...; base64 without padding
        assert_eq!(
            fingerprint(b""),
            "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn test_from_openssh_round_trip() {
        let key = HostPublicKey::new("ssh-ed25519", sample_blob());
        let line = format!("{} {} comment@host", key.key_type(), key.to_base64());
        let parsed = HostPublicKey::from_openssh(&line).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.as_bytes(), sample_blob().as_slice());
    }

    #[test]
    fn test_from_openssh_errors() {
        assert_eq!(
            HostPublicKey::from_openssh(""),
            Err(KeyParseError::MissingType)
        );
        assert_eq!(
            HostPublicKey::from_openssh("ssh-rsa"),
            Err(KeyParseError::MissingData)
        );
        assert!(matches!(
            HostPublicKey::from_openssh("ssh-rsa !!notbase64!!"),
            Err(KeyParseError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("host.example"), "host.example");
        assert_eq!(normalize_hostname("host.example:22"), "host.example");
        assert_eq!(normalize_hostname("host.example:2222"), "host.example");
        assert_eq!(normalize_hostname("[host.example]:2222"), "host.example");
        assert_eq!(normalize_hostname("[::1]:22"), "::1");
        assert_eq!(normalize_hostname("[::1]"), "::1");
        assert_eq!(normalize_hostname("2001:db8::1"), "2001:db8::1");
        assert_eq!(normalize_hostname("host:notaport"), "host:notaport");
        assert_eq!(normalize_hostname(" 10.0.0.5:22 "), "10.0.0.5");
    }
}
