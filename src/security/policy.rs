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

//! Named sanitization contexts.

use std::fmt;
use std::str::FromStr;

use super::shell::{validate_shell_token, validate_wp_cli_arg};
use super::validation::{
    validate_filename, validate_path, validate_rsync_pattern, validate_table_name,
    validate_table_prefix,
};
use crate::shared::error::ValidationError;

/// The contexts a user-supplied string can be sanitized for.
///
/// Each variant is bound to exactly one validator; the set is fixed at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanitizationPolicy {
    Path,
    Filename,
    TablePrefix,
    TableName,
    RsyncPattern,
    ShellToken,
    WpCliArg,
}

impl SanitizationPolicy {
    pub const ALL: [SanitizationPolicy; 7] = [
        SanitizationPolicy::Path,
        SanitizationPolicy::Filename,
        SanitizationPolicy::TablePrefix,
        SanitizationPolicy::TableName,
        SanitizationPolicy::RsyncPattern,
        SanitizationPolicy::ShellToken,
        SanitizationPolicy::WpCliArg,
    ];

    /// The kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            SanitizationPolicy::Path => "path",
            SanitizationPolicy::Filename => "filename",
            SanitizationPolicy::TablePrefix => "table-prefix",
            SanitizationPolicy::TableName => "table-name",
            SanitizationPolicy::RsyncPattern => "rsync-pattern",
            SanitizationPolicy::ShellToken => "shell-token",
            SanitizationPolicy::WpCliArg => "wp-cli-arg",
        }
    }

    /// Run the validator bound to this context.
    pub fn apply(self, input: &str) -> Result<String, ValidationError> {
        match self {
            SanitizationPolicy::Path => validate_path(input),
            SanitizationPolicy::Filename => validate_filename(input),
            SanitizationPolicy::TablePrefix => validate_table_prefix(input),
            SanitizationPolicy::TableName => validate_table_name(input),
            SanitizationPolicy::RsyncPattern => validate_rsync_pattern(input),
            SanitizationPolicy::ShellToken => validate_shell_token(input),
            SanitizationPolicy::WpCliArg => validate_wp_cli_arg(input),
        }
    }
}

impl fmt::Display for SanitizationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SanitizationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|policy| policy.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                format!("unknown sanitizer '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
