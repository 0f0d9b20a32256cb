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

use std::collections::HashMap;

use serde::Serialize;

/// Relative path to hex digest.
pub type DigestMap = HashMap<String, String>;

/// A file whose content differs between the two trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub path: String,
    pub remote: String,
    pub local: String,
}

/// Outcome of comparing a remote tree with a local one.
///
/// Differences are data: a report with mismatches is still a successful
/// verification. All lists are sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChecksumReport {
    pub algorithm: String,
    pub matched: Vec<String>,
    pub mismatched: Vec<Mismatch>,
    /// Present remotely but not locally.
    pub missing_local: Vec<String>,
    /// Present locally but not remotely.
    pub missing_remote: Vec<String>,
}

impl ChecksumReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing_local.is_empty() && self.missing_remote.is_empty()
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn mismatched_count(&self) -> usize {
        self.mismatched.len()
    }

    pub fn missing_local_count(&self) -> usize {
        self.missing_local.len()
    }

    pub fn missing_remote_count(&self) -> usize {
        self.missing_remote.len()
    }

    pub fn total_files(&self) -> usize {
        self.matched.len() + self.mismatched.len() + self.missing_local.len() + self.missing_remote.len()
    }
}

/// Compare two digest maps.
pub fn diff(remote: &DigestMap, local: &DigestMap) -> ChecksumReport {
    let mut report = ChecksumReport::default();

    for (path, remote_digest) in remote {
        match local.get(path) {
            None => report.missing_local.push(path.clone()),
            Some(local_digest) if local_digest != remote_digest => {
                report.mismatched.push(Mismatch {
                    path: path.clone(),
                    remote: remote_digest.clone(),
                    local: local_digest.clone(),
                })
            }
            Some(_) => report.matched.push(path.clone()),
        }
    }

    report.missing_remote = local
        .keys()
        .filter(|path| !remote.contains_key(*path))
        .cloned()
        .collect();

    report.matched.sort();
    report.mismatched.sort_by(|a, b| a.path.cmp(&b.path));
    report.missing_local.sort();
    report.missing_remote.sort();
    report
}
