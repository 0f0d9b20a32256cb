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

//! `[user@]host[:port]` connection targets.

use std::fmt;
use std::str::FromStr;

use super::host_key::normalize_hostname;
use crate::security::{validate_hostname, validate_username};
use crate::shared::error::ValidationError;

/// A validated SSH destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl SshTarget {
    /// Parse and validate `[user@]host[:port]`. IPv6 literals must be
    /// bracketed when a port is given (`[2001:db8::1]:2222`).
    pub fn parse(spec: &str) -> Result<Self, ValidationError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ValidationError::empty("target"));
        }

        let (user, host_port) = match spec.rsplit_once('@') {
            Some((user, rest)) => (Some(validate_username(user)?), rest),
            None => (None, spec),
        };

        let (host, port) = split_host_port(host_port)?;
        let host = validate_hostname(host)?;

        Ok(Self { user, host, port })
    }

    /// Fill in user and port from defaults where the target left them out.
    pub fn with_defaults(mut self, user: Option<&str>, port: Option<u16>) -> Self {
        if self.user.is_none() {
            self.user = user.map(str::to_string);
        }
        if self.port.is_none() {
            self.port = port;
        }
        self
    }

    /// The key this target is stored under in the trust store.
    pub fn known_hosts_name(&self) -> String {
        normalize_hostname(&self.host)
    }

    /// Host without brackets, suitable as an argument to ssh tools.
    pub fn connect_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }
}

fn split_host_port(value: &str) -> Result<(&str, Option<u16>), ValidationError> {
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| ValidationError::new("port", format!("invalid port '{p}'")))
    };

    if value.starts_with('[') {
        return match value.split_once("]:") {
            Some((host, port)) => Ok((&value[..host.len() + 1], Some(parse_port(port)?))),
            None => Ok((value, None)),
        };
    }

    match value.matches(':').count() {
        0 => Ok((value, None)),
        1 => {
            let (host, port) = value.split_once(':').unwrap_or((value, ""));
            Ok((host, Some(parse_port(port)?)))
        }
        // bare IPv6 literal
        _ => Ok((value, None)),
    }
}

impl FromStr for SshTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
