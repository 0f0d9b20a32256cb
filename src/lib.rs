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

//! Security core for operating WordPress sites over SSH.
//!
//! - [`ssh::TrustStore`]: trust-on-first-use host key store
//! - [`security`]: sanitizers for values headed to shells, SQL identifiers
//!   and paths, plus credential redaction for logs and terminal output
//! - [`checksum::ChecksumVerifier`]: post-transfer comparison of a remote
//!   tree with a local copy
//!
//! The SSH transport is the system OpenSSH client, driven through the
//! [`ssh::RemoteExecutor`] seam.

pub mod checksum;
pub mod cli;
pub mod commands;
pub mod config;
pub mod security;
pub mod shared;
pub mod ssh;
pub mod utils;

pub use checksum::{ChecksumReport, ChecksumVerifier};
pub use cli::Cli;
pub use config::Config;
pub use shared::error::{ChecksumError, ExecError, TrustError, ValidationError};
pub use ssh::{HostKeyPolicy, TrustStore};
