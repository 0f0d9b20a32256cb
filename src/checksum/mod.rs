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

//! Post-transfer completeness check.
//!
//! [`ChecksumVerifier`] hashes a remote tree through a
//! [`RemoteExecutor`](crate::ssh::exec::RemoteExecutor) and a local tree on
//! disk, then reports which files match, differ or exist on one side only.

pub mod digest;
pub mod report;
pub mod verifier;

pub use digest::{ChecksumAlgorithm, Digest, Md5Digest, Sha256Digest};
pub use report::{diff, ChecksumReport, DigestMap, Mismatch};
pub use verifier::{parse_digest_output, ChecksumVerifier};
