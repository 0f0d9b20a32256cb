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
use std::path::Path;

use crate::security::{sanitize_error_for_user, validate_file_path, SanitizationPolicy};
use crate::shared::error::ValidationError;

/// Kind name for the containment check, which needs an allowed directory.
const FILE_PATH_KIND: &str = "file-path";

/// Run the sanitizer named `kind` over `value`.
///
/// The outer error is a usage problem (unknown kind, missing
/// `--allowed-dir`); the inner one is the sanitizer's verdict.
pub fn check_value(
    kind: &str,
    value: &str,
    allowed_dir: Option<&Path>,
) -> Result<Result<String, ValidationError>> {
    if kind.trim().eq_ignore_ascii_case(FILE_PATH_KIND) {
        let allowed_dir = allowed_dir.context("file-path checks need --allowed-dir")?;
        return Ok(validate_file_path(value, allowed_dir).map(|p| p.display().to_string()));
    }

    let policy: SanitizationPolicy = kind.parse().map_err(anyhow::Error::msg)?;
    Ok(policy.apply(value))
}

/// Print the verdict and return whether the value was accepted.
pub fn run_check(kind: &str, value: &str, allowed_dir: Option<&Path>) -> Result<bool> {
    match check_value(kind, value, allowed_dir)? {
        Ok(sanitized) => {
            println!("{sanitized}");
            Ok(true)
        }
        Err(e) => {
            // the rejected value may itself carry a secret
            eprintln!("{}", sanitize_error_for_user(&e));
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value_policies() {
        assert_eq!(check_value("table-prefix", "wp_", None).unwrap(), Ok("wp_".to_string()));
        assert!(check_value("table_prefix", "wp_'; DROP TABLE users--", None)
            .unwrap()
            .is_err());
        assert!(check_value("shell-token", "a;b", None).unwrap().is_err());
        assert!(check_value("no-such-kind", "x", None).is_err());
    }

    #[test]
    fn test_check_file_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_value("file-path", "x", None).is_err());

        let inside = dir.path().join("wp-content").join("a.php");
        let verdict = check_value(
            "file-path",
            inside.to_str().unwrap(),
            Some(dir.path()),
        )
        .unwrap();
        assert!(verdict.is_ok());

        let verdict = check_value("file-path", "/etc/passwd", Some(dir.path())).unwrap();
        assert!(verdict.is_err());
    }
}
