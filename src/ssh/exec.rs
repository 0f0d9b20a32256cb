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

//! Remote command execution through the system OpenSSH client.
//!
//! The SSH transport itself is not implemented here. [`OpenSshExecutor`]
//! drives the `ssh` binary with host key checking pinned to the
//! [`TrustStore`](super::known_hosts::TrustStore) file, so OpenSSH enforces
//! the same trust decisions during the real handshake. [`keyscan`] fetches
//! the key a host presents so the trust store can decide before the
//! connection is attempted.

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use super::host_key::HostPublicKey;
use super::target::SshTarget;
use crate::security::sanitize_log_message;
use crate::shared::error::ExecError;

/// Upper bound on how much remote stderr is kept in an error.
const MAX_STDERR_IN_ERROR: usize = 1024;

/// Runs one already-sanitized command string on a remote host and returns
/// its stdout.
pub trait RemoteExecutor {
    fn execute(&self, command: &str) -> Result<String, ExecError>;
}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for &T {
    fn execute(&self, command: &str) -> Result<String, ExecError> {
        (**self).execute(command)
    }
}

/// Settings for invoking the OpenSSH tools.
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub binary: String,
    pub keyscan_binary: String,
    pub identity_file: Option<PathBuf>,
    pub connect_timeout: Option<u64>,
    pub key_types: Vec<String>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            keyscan_binary: "ssh-keyscan".to_string(),
            identity_file: None,
            connect_timeout: Some(10),
            key_types: vec!["ed25519".to_string()],
        }
    }
}

/// [`RemoteExecutor`] backed by the `ssh` program.
#[derive(Debug, Clone)]
pub struct OpenSshExecutor {
    target: SshTarget,
    known_hosts: PathBuf,
    options: SshOptions,
}

impl OpenSshExecutor {
    pub fn new(target: SshTarget, known_hosts: impl Into<PathBuf>, options: SshOptions) -> Self {
        Self {
            target,
            known_hosts: known_hosts.into(),
            options,
        }
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Arguments passed to `ssh`, excluding the program name.
    pub fn build_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=yes".to_string(),
            "-o".to_string(),
            format!("UserKnownHostsFile=\"{}\"", self.known_hosts.display()),
            "-o".to_string(),
            "GlobalKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            format!("HostKeyAlias={}", self.target.known_hosts_name()),
        ];

        if let Some(timeout) = self.options.connect_timeout {
            args.push("-o".to_string());
            args.push(format!("ConnectTimeout={timeout}"));
        }
        if let Some(port) = self.target.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.options.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        if let Some(user) = &self.target.user {
            args.push("-l".to_string());
            args.push(user.clone());
        }

        args.push("--".to_string());
        args.push(self.target.connect_host().to_string());
        args.push(command.to_string());
        args
    }
}

fn run(program: &str, args: &[String]) -> Result<Output, ExecError> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })
}

fn failure(output: &Output) -> ExecError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    ExecError::Failed {
        status: output.status.code().unwrap_or(-1),
        stderr: sanitize_log_message(stderr.trim(), MAX_STDERR_IN_ERROR),
    }
}

impl RemoteExecutor for OpenSshExecutor {
    fn execute(&self, command: &str) -> Result<String, ExecError> {
        tracing::debug!("Running remote command on {}: {}", self.target, command);
        let output = run(&self.options.binary, &self.build_args(command))?;

        if !output.status.success() {
            return Err(failure(&output));
        }

        String::from_utf8(output.stdout).map_err(|_| ExecError::InvalidOutput)
    }
}

/// Parse `ssh-keyscan` output into the presented keys, in output order.
///
/// Each line is `host keytype base64`; comment lines and lines that do not
/// parse are skipped.
pub fn parse_keyscan_output(output: &str) -> Vec<HostPublicKey> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _host = fields.next()?;
            let key_type = fields.next()?;
            let data = fields.next()?;
            match HostPublicKey::from_base64(key_type, data) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!("Skipping unparsable keyscan line: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// Ask `target` for its host key with `ssh-keyscan`.
///
/// Returns the first key of the configured types. This does not establish
/// trust by itself; feed the result to
/// [`TrustStore::verify_host_key`](super::known_hosts::TrustStore::verify_host_key).
pub fn keyscan(target: &SshTarget, options: &SshOptions) -> Result<HostPublicKey, ExecError> {
    let mut args = Vec::new();
    if let Some(timeout) = options.connect_timeout {
        args.push("-T".to_string());
        args.push(timeout.to_string());
    }
    if let Some(port) = target.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    if !options.key_types.is_empty() {
        args.push("-t".to_string());
        args.push(options.key_types.join(","));
    }
    args.push(target.connect_host().to_string());

    tracing::debug!("Scanning host key of {}", target);
    let output = run(&options.keyscan_binary, &args)?;

    let stdout = String::from_utf8(output.stdout.clone()).map_err(|_| ExecError::InvalidOutput)?;
    match parse_keyscan_output(&stdout).into_iter().next() {
        Some(key) => Ok(key),
        None if !output.status.success() => Err(failure(&output)),
        None => Err(ExecError::NoHostKey(target.to_string())),
    }
}
