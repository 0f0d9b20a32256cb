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

//! Configuration utility functions.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

/// Environment variable that overrides the known hosts file location.
pub const KNOWN_HOSTS_ENV: &str = "WPGUARD_KNOWN_HOSTS";

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };

    let rest = if path_str == "~" {
        ""
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        rest
    } else {
        return path.to_path_buf();
    };

    match home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    // HOME first so tests and sandboxed runs can redirect it
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => Some(PathBuf::from(home)),
        _ => BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
    }
}

/// Known hosts path from the environment, if set and non-empty.
pub fn known_hosts_from_env() -> Option<PathBuf> {
    std::env::var_os(KNOWN_HOSTS_ENV)
        .filter(|value| !value.is_empty())
        .map(|value| expand_tilde(Path::new(&value)))
}
