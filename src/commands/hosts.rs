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
use owo_colors::OwoColorize;

use crate::ssh::{keyscan, HostPublicKey, SshOptions, SshTarget, TrustDecision, TrustStore};

pub fn list_hosts(store: &TrustStore) {
    let hosts = store.list_known_hosts();
    if hosts.is_empty() {
        println!(
            "{} {}",
            "No trusted hosts in".dimmed(),
            store.path().display().to_string().dimmed()
        );
        return;
    }

    println!(
        "\n{} {} ({})\n",
        "▶".cyan(),
        "Trusted hosts".bold(),
        store.path().display()
    );
    for host in &hosts {
        match store.get(host) {
            Some(record) => println!(
                "  {} {} {} {}",
                "●".blue(),
                host.bold(),
                record.key.key_type().dimmed(),
                record.key.fingerprint().dimmed()
            ),
            None => println!("  {} {}", "●".blue(), host.bold()),
        }
    }
    println!();
}

pub fn remove_host(store: &TrustStore, host: &str) -> Result<()> {
    store.remove_host_key(host)?;
    println!("{} Removed {}", "●".green(), host.bold());
    Ok(())
}

/// Run `key` through the trust store, turning a declined prompt into
/// [`TrustDecision::Rejected`] instead of an error.
fn decide(store: &TrustStore, hostname: &str, key: &HostPublicKey) -> Result<TrustDecision> {
    match store.verify_host_key(hostname, key) {
        Ok(decision) => Ok(decision),
        Err(e) if e.is_rejection() => Ok(TrustDecision::Rejected),
        Err(e) => Err(e.into()),
    }
}

/// Scan `target` for its host key and run it through the trust store.
pub fn trust_host(
    store: &TrustStore,
    target: &SshTarget,
    options: &SshOptions,
) -> Result<TrustDecision> {
    let key = keyscan(target, options)
        .with_context(|| format!("Failed to fetch host key of {target}"))?;
    let hostname = target.known_hosts_name();
    let decision = decide(store, &hostname, &key)?;

    let (marker, status) = match decision {
        TrustDecision::Trusted => ("●".green().to_string(), "already trusted".green().to_string()),
        TrustDecision::FirstUse => ("●".green().to_string(), "now trusted".green().to_string()),
        TrustDecision::Mismatch => ("●".green().to_string(), "key replaced".yellow().to_string()),
        TrustDecision::Rejected => ("●".red().to_string(), "rejected".red().to_string()),
    };
    println!(
        "{} {} {} ({} {})",
        marker,
        hostname.bold(),
        status,
        key.key_type(),
        key.fingerprint()
    );
    Ok(decision)
}

pub fn show_fingerprint(store: &TrustStore, target: &SshTarget, options: &SshOptions) -> Result<()> {
    let key = keyscan(target, options)
        .with_context(|| format!("Failed to fetch host key of {target}"))?;
    let hostname = target.known_hosts_name();

    let state = match store.classify(&hostname, &key) {
        TrustDecision::Trusted => "trusted".green().to_string(),
        TrustDecision::FirstUse | TrustDecision::Rejected => "not trusted".yellow().to_string(),
        TrustDecision::Mismatch => "DIFFERS FROM STORED KEY".red().bold().to_string(),
    };
    println!("{} {} {}", hostname.bold(), key.key_type(), key.fingerprint());
    println!("  {state}");
    Ok(())
}
