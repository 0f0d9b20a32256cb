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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::checksum::ChecksumAlgorithm;
use crate::ssh::HostKeyPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "wpguard",
    version,
    about = "Host-key trust, input sanitizing and transfer verification for WordPress hosting",
    long_about = "wpguard keeps a trust-on-first-use store of SSH host keys, checks user supplied\nvalues against the sanitizers used before they reach a remote shell, redacts credentials\nfrom text, and verifies that a synced site matches its remote copy file by file.",
    after_help = "EXAMPLES:\n  Trust a host:              wpguard hosts trust deploy@site.example\n  List trusted hosts:        wpguard hosts list\n  Verify a download:         wpguard verify deploy@site.example /var/www/html ./backup\n  Check a table prefix:      wpguard check table-prefix wp_\n  Redact a log:              wpguard redact < debug.log"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Configuration file path\nConfig loading priority:\n  1. This flag's value\n  2. Current directory (./wpguard.yaml)\n  3. User config ($XDG_CONFIG_HOME/wpguard/config.yaml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Trusted host key file [default: ~/.wpguard/known_hosts]\nAlso settable with WPGUARD_KNOWN_HOSTS"
    )]
    pub known_hosts: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "How new and changed host keys are answered\n  ask        - Prompt on the terminal (default)\n  accept-new - Trust new hosts, refuse changed keys\n  strict     - Refuse anything not already trusted"
    )]
    pub host_key_policy: Option<HostKeyPolicy>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Manage trusted host keys")]
    Hosts {
        #[command(subcommand)]
        action: HostsCommand,
    },

    #[command(
        about = "Compare a remote file tree with a local copy",
        long_about = "Checks the host key against the trust store, hashes every file under the remote\nroot over SSH and every file under the local root, and reports the differences.\n\nExit codes: 0 (trees match), 1 (drift found), 2 (error)"
    )]
    Verify {
        #[arg(help = "Remote host in [user@]hostname[:port] format")]
        target: String,

        #[arg(help = "Remote directory to hash")]
        remote_root: String,

        #[arg(help = "Local directory to hash")]
        local_root: PathBuf,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,

        #[arg(long, help = "Digest algorithm (md5 or sha256) [default: from config, md5]")]
        algorithm: Option<ChecksumAlgorithm>,
    },

    #[command(
        about = "Check a value against one sanitizer",
        long_about = "Runs one sanitizer and prints the sanitized value, or the reason it was rejected.\n\nKinds: path, file-path, filename, table-prefix, table-name, rsync-pattern,\nshell-token, wp-cli-arg\n\nExit codes: 0 (accepted), 1 (rejected)"
    )]
    Check {
        #[arg(help = "Sanitizer to run")]
        kind: String,

        #[arg(allow_hyphen_values = true, help = "Value to check")]
        value: String,

        #[arg(long, help = "Directory a file-path must stay inside")]
        allowed_dir: Option<PathBuf>,
    },

    #[command(about = "Remove credentials from standard input")]
    Redact {
        #[arg(long, help = "Truncate each line to this many bytes [default: from config]")]
        max_len: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HostsCommand {
    #[command(about = "List trusted hostnames")]
    List,

    #[command(about = "Forget the stored key of a host")]
    Remove {
        #[arg(help = "Hostname as stored")]
        host: String,
    },

    #[command(about = "Fetch a host's key and decide whether to trust it")]
    Trust {
        #[arg(help = "Remote host in [user@]hostname[:port] format")]
        target: String,
    },

    #[command(about = "Show the fingerprint a host presents without trusting it")]
    Fingerprint {
        #[arg(help = "Remote host in [user@]hostname[:port] format")]
        target: String,
    },
}
