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

//! Pluggable content digests for drift detection.
//!
//! These digests answer "did the transfer complete". They are not a
//! tamper-evidence mechanism against a hostile remote, which controls the
//! output of its own hashing command.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A content hash that can be computed locally and by a remote coreutils
/// tool with identical hex output.
pub trait Digest: Send + Sync {
    /// Short name, used in logs and reports.
    fn name(&self) -> &'static str;

    /// The remote coreutils program that prints `digest  path` lines.
    fn remote_tool(&self) -> &'static str;

    /// Command hashing every regular file under `root`. `root` must already
    /// have passed the shell-token whitelist.
    fn remote_command(&self, root: &str) -> String {
        format!("cd -- {root} && find . -type f -exec {} {{}} +", self.remote_tool())
    }

    /// Lowercase hex digest of everything readable from `reader`.
    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<String>;
}

fn hash_with<D: sha2::Digest>(mut hasher: D, reader: &mut dyn Read) -> io::Result<String>
where
    D::OutputSize: std::ops::Add,
    <D::OutputSize as std::ops::Add>::Output: sha2::digest::generic_array::ArrayLength<u8>,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// MD5, matching `md5sum`. Fast and the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Digest;

impl Digest for Md5Digest {
    fn name(&self) -> &'static str {
        "md5"
    }

    fn remote_tool(&self) -> &'static str {
        "md5sum"
    }

    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<String> {
        hash_with(Md5::new(), reader)
    }
}

/// SHA-256, matching `sha256sum`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl Digest for Sha256Digest {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn remote_tool(&self) -> &'static str {
        "sha256sum"
    }

    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<String> {
        hash_with(Sha256::new(), reader)
    }
}

/// Digest selection as it appears in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn digest(self) -> Box<dyn Digest> {
        match self {
            ChecksumAlgorithm::Md5 => Box::new(Md5Digest),
            ChecksumAlgorithm::Sha256 => Box::new(Sha256Digest),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "md5"),
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!(
                "unknown checksum algorithm '{other}' (expected md5 or sha256)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest as _;
    use std::io::Cursor;

    #[test]
    fn test_known_vectors() {
        let md5 = Md5Digest.hash_reader(&mut Cursor::new("abc")).unwrap();
        assert_eq!(md5, "900150983cd24fb0d6963f7d28e17f72");

        let sha = Sha256Digest.hash_reader(&mut Cursor::new("abc")).unwrap();
        assert_eq!(
            sha,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let empty = Md5Digest.hash_reader(&mut io::empty()).unwrap();
        assert_eq!(empty, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_large_input_spans_buffers() {
        let data = vec![b'x'; READ_BUFFER_SIZE * 2 + 17];
        let streamed = Sha256Digest.hash_reader(&mut Cursor::new(&data)).unwrap();
        let direct = format!("{:x}", Sha256::digest(&data));
        assert_eq!(streamed, direct);
    }

    #[test]
    fn test_remote_command() {
        assert_eq!(
            Md5Digest.remote_command("/var/www/html"),
            "cd -- /var/www/html && find . -type f -exec md5sum {} +"
        );
        assert_eq!(
            Sha256Digest.remote_command("public_html"),
            "cd -- public_html && find . -type f -exec sha256sum {} +"
        );
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("MD5".parse::<ChecksumAlgorithm>(), Ok(ChecksumAlgorithm::Md5));
        assert_eq!("sha256".parse::<ChecksumAlgorithm>(), Ok(ChecksumAlgorithm::Sha256));
        assert!("crc32".parse::<ChecksumAlgorithm>().is_err());
        assert_eq!(ChecksumAlgorithm::Sha256.digest().name(), "sha256");
        assert_eq!(ChecksumAlgorithm::default().to_string(), "md5");
    }
}
