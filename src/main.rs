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

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::io;
use std::process::ExitCode;

use wpguard::{
    cli::{Cli, Commands, HostsCommand},
    commands::{
        check::run_check,
        hosts::{list_hosts, remove_host, show_fingerprint, trust_host},
        redact::redact_stream,
        verify::{verify_transfer, VerifyParams},
    },
    config::Config,
    security::sanitize_error_for_user,
    ssh::{SshTarget, TrustDecision, TrustStore},
    utils::init_logging,
};

/// Exit status for runtime errors, distinct from a negative verdict.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let message = sanitize_error_for_user(&format!("{e:#}"));
            eprintln!("{} {}", "Error:".red().bold(), message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = Config::load_with_priority(cli.config.as_deref())?;

    let open_store = || -> Result<TrustStore> {
        let policy = cli.host_key_policy.unwrap_or(config.host_key_policy);
        let path = cli
            .known_hosts
            .clone()
            .or_else(|| config.known_hosts_path())
            .context("Unable to determine the known hosts file; pass --known-hosts")?;
        tracing::debug!("Using known hosts file {:?} with {:?} policy", path, policy);
        Ok(TrustStore::open(path, policy)?)
    };
    let parse_target = |spec: &str| -> Result<SshTarget> {
        let target = SshTarget::parse(spec)?;
        Ok(target.with_defaults(config.ssh.user.as_deref(), config.ssh.port))
    };

    match cli.command {
        Commands::Hosts { action } => {
            let store = open_store()?;
            match action {
                HostsCommand::List => list_hosts(&store),
                HostsCommand::Remove { host } => remove_host(&store, &host)?,
                HostsCommand::Trust { target } => {
                    let decision =
                        trust_host(&store, &parse_target(&target)?, &config.ssh_options())?;
                    return Ok(decision != TrustDecision::Rejected);
                }
                HostsCommand::Fingerprint { target } => {
                    show_fingerprint(&store, &parse_target(&target)?, &config.ssh_options())?;
                }
            }
            Ok(true)
        }
        Commands::Verify {
            target,
            remote_root,
            local_root,
            json,
            algorithm,
        } => {
            let store = open_store()?;
            verify_transfer(
                &store,
                VerifyParams {
                    target: parse_target(&target)?,
                    remote_root: &remote_root,
                    local_root: &local_root,
                    algorithm: algorithm.unwrap_or(config.checksum.algorithm),
                    options: config.ssh_options(),
                    json,
                },
            )
        }
        Commands::Check {
            kind,
            value,
            allowed_dir,
        } => run_check(&kind, &value, allowed_dir.as_deref()),
        Commands::Redact { max_len } => {
            let max_len = max_len.unwrap_or(config.log.max_message_len);
            redact_stream(io::stdin().lock(), io::stdout().lock(), max_len)?;
            Ok(true)
        }
    }
}
