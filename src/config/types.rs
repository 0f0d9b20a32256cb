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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumAlgorithm;
use crate::ssh::HostKeyPolicy;

/// Main configuration structure.
///
/// Every field is optional in the YAML file; missing sections take their
/// defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Path of the trusted host key file. `~` is expanded.
    pub known_hosts: Option<String>,

    /// How new and changed host keys are answered.
    pub host_key_policy: HostKeyPolicy,

    pub ssh: SshSettings,

    pub checksum: ChecksumSettings,

    pub log: LogSettings,
}

/// Settings for the OpenSSH client tools.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct SshSettings {
    /// Login user when a target does not name one.
    pub user: Option<String>,
    /// Port when a target does not name one.
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    /// Seconds, passed to ssh as `ConnectTimeout` and to ssh-keyscan as `-T`.
    pub connect_timeout: Option<u64>,
    pub binary: Option<String>,
    pub keyscan_binary: Option<String>,
    /// Host key types requested from ssh-keyscan, e.g. `ed25519`.
    pub key_types: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ChecksumSettings {
    pub algorithm: ChecksumAlgorithm,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Longest log message written before truncation.
    pub max_message_len: usize,
}

pub(crate) const DEFAULT_MAX_MESSAGE_LEN: usize = 2048;

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}
