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

//! Configuration loading and priority management.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::Config;
use super::utils::{expand_tilde, known_hosts_from_env};
use crate::ssh::exec::SshOptions;
use crate::ssh::known_hosts::get_default_known_hosts_path;

/// Config file name looked up in the current directory.
const LOCAL_CONFIG_FILE: &str = "wpguard.yaml";

impl Config {
    /// Load configuration from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path).with_context(|| {
            format!(
                "Failed to read configuration file at {}. Please check file permissions.",
                expanded_path.display()
            )
        })?;

        Self::from_yaml(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}. Please check the YAML syntax is valid.",
                expanded_path.display()
            )
        })
    }

    /// Parse configuration from YAML text. An empty document is the
    /// default configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration with priority order:
    /// 1. Explicit --config path (must exist)
    /// 2. Current directory wpguard.yaml
    /// 3. XDG config directory ($XDG_CONFIG_HOME/wpguard/config.yaml or the
    ///    platform config directory)
    /// 4. Built-in defaults
    pub fn load_with_priority(cli_config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_config_path {
            let expanded = expand_tilde(path);
            if !expanded.exists() {
                anyhow::bail!("Configuration file {} does not exist", expanded.display());
            }
            tracing::debug!("Using explicitly specified config file: {:?}", expanded);
            return Self::load(&expanded);
        }

        for candidate in Self::standard_locations() {
            tracing::debug!("Checking config path: {:?}", candidate);
            if candidate.exists() {
                tracing::debug!("Found config at {:?}", candidate);
                return Self::load(&candidate);
            }
        }

        tracing::debug!("No config file found, using default configuration");
        Ok(Self::default())
    }

    fn standard_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];

        if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
            if !xdg_config_home.is_empty() {
                locations.push(
                    PathBuf::from(xdg_config_home)
                        .join("wpguard")
                        .join("config.yaml"),
                );
                return locations;
            }
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", "wpguard") {
            locations.push(proj_dirs.config_dir().join("config.yaml"));
        }
        locations
    }

    /// Where the trusted host key file lives.
    ///
    /// `WPGUARD_KNOWN_HOSTS` wins over the `known_hosts` setting, which wins
    /// over `~/.wpguard/known_hosts`.
    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        known_hosts_from_env()
            .or_else(|| {
                self.known_hosts
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .map(|p| expand_tilde(Path::new(p)))
            })
            .or_else(get_default_known_hosts_path)
    }

    /// OpenSSH invocation settings with defaults filled in.
    pub fn ssh_options(&self) -> SshOptions {
        let defaults = SshOptions::default();
        let ssh = &self.ssh;
        SshOptions {
            binary: ssh.binary.clone().unwrap_or(defaults.binary),
            keyscan_binary: ssh.keyscan_binary.clone().unwrap_or(defaults.keyscan_binary),
            identity_file: ssh
                .identity_file
                .as_deref()
                .map(|p| expand_tilde(Path::new(p))),
            connect_timeout: ssh.connect_timeout.or(defaults.connect_timeout),
            key_types: ssh.key_types.clone().unwrap_or(defaults.key_types),
        }
    }
}
