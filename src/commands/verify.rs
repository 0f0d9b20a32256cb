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
use std::fmt::Write as _;
use std::path::Path;

use crate::checksum::{ChecksumAlgorithm, ChecksumReport, ChecksumVerifier};
use crate::ssh::{keyscan, OpenSshExecutor, SshOptions, SshTarget, TrustStore};

pub struct VerifyParams<'a> {
    pub target: SshTarget,
    pub remote_root: &'a str,
    pub local_root: &'a Path,
    pub algorithm: ChecksumAlgorithm,
    pub options: SshOptions,
    pub json: bool,
}

/// Trust-check the host, then compare the remote and local trees.
///
/// Returns whether the trees match.
pub fn verify_transfer(store: &TrustStore, params: VerifyParams<'_>) -> Result<bool> {
    let key = keyscan(&params.target, &params.options)
        .with_context(|| format!("Failed to fetch host key of {}", params.target))?;
    store.verify_host_key(&params.target.known_hosts_name(), &key)?;

    let executor = OpenSshExecutor::new(params.target, store.path(), params.options);
    let verifier = ChecksumVerifier::with_digest(executor, params.algorithm.digest());
    let report = verifier
        .verify(params.remote_root, params.local_root)
        .context("Checksum verification failed")?;

    if params.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", format_report(&report));
    }

    Ok(report.is_clean())
}

/// Human readable rendering of a report.
pub fn format_report(report: &ChecksumReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{} {} ({})\n",
        "▶".cyan(),
        "Checksum report".bold(),
        report.algorithm
    );

    let _ = writeln!(
        out,
        "  {} {} matched",
        "●".green(),
        report.matched_count().to_string().bold()
    );

    if report.mismatched_count() > 0 {
        let _ = writeln!(
            out,
            "  {} {} mismatched",
            "●".red(),
            report.mismatched_count().to_string().bold()
        );
        for m in &report.mismatched {
            let _ = writeln!(
                out,
                "    {} {} (remote {}, local {})",
                "•".dimmed(),
                m.path,
                m.remote.dimmed(),
                m.local.dimmed()
            );
        }
    }

    for (label, paths) in [
        ("missing locally", &report.missing_local),
        ("missing remotely", &report.missing_remote),
    ] {
        if paths.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            "  {} {} {}",
            "●".yellow(),
            paths.len().to_string().bold(),
            label
        );
        for path in paths {
            let _ = writeln!(out, "    {} {}", "•".dimmed(), path);
        }
    }

    if report.is_clean() {
        let _ = writeln!(out, "\n{}", "Trees match".green().bold());
    } else {
        let _ = writeln!(out, "\n{}", "Trees differ".red().bold());
    }
    out
}
