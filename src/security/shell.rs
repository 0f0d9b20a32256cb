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

//! Checks for tokens that end up inside a remote shell command line.
//!
//! [`validate_shell_token`] is a strict whitelist and is what every value
//! interpolated into a command string should go through. The other checks
//! are blacklist scans for arguments that legitimately need a wider
//! alphabet, such as WP-CLI `--flag=value` pairs.

use crate::shared::error::ValidationError;

/// Characters with special meaning to a POSIX shell.
pub const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r', '\0', '*', '?', '[', ']', '{', '}',
    '\\', '\'', '"',
];

/// Characters that WP-CLI flag syntax uses and that are removed before the
/// metacharacter scan in [`validate_wp_cli_arg`].
const WP_CLI_FLAG_CHARS: &[char] = &['-', '=', '/', '.', '_', ':', ','];

/// Return the first shell metacharacter in `value`, if any.
pub fn find_shell_metacharacter(value: &str) -> Option<char> {
    value.chars().find(|c| SHELL_METACHARACTERS.contains(c))
}

fn is_shell_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '/' || c == '_' || c == '.' || c == '-'
}

/// Validate a token against the `[A-Za-z0-9/_.-]+` whitelist.
///
/// Anything outside the whitelist is rejected outright: quotes, pipes,
/// redirects, backticks, globs, braces, whitespace and control characters
/// all fail. Accepted input is returned unchanged.
///
/// # Examples
///
/// ```
/// use wpguard::security::validate_shell_token;
///
/// assert_eq!(validate_shell_token("/var/www/html").unwrap(), "/var/www/html");
/// assert!(validate_shell_token("html; rm -rf ~").is_err());
/// assert!(validate_shell_token("a b").is_err());
/// ```
pub fn validate_shell_token(token: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "shell_token";

    if token.is_empty() {
        return Err(ValidationError::empty(FIELD));
    }

    if !token.chars().all(is_shell_token_char) {
        return Err(ValidationError::invalid_characters(FIELD));
    }

    Ok(token.to_string())
}

/// Scan every argument for shell metacharacters.
///
/// One bad argument rejects the whole list; the error names its index.
pub fn validate_command_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<String>, ValidationError> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            let arg = arg.as_ref();
            match find_shell_metacharacter(arg) {
                Some(ch) => Err(ValidationError::new(
                    format!("args[{index}]"),
                    format!("argument contains shell metacharacter '{}'", ch.escape_default()),
                )),
                None => Ok(arg.to_string()),
            }
        })
        .collect()
}

/// Validate a single WP-CLI argument such as `--url=https://example.com`.
///
/// Command substitution (`$(` or a backtick) is refused immediately. The
/// flag-syntax characters `- = / . _ : ,` are then stripped from a scratch
/// copy and the residue is scanned for metacharacters. When the residue is
/// clean the original token is returned untouched.
///
/// # Examples
///
/// ```
/// use wpguard::security::validate_wp_cli_arg;
///
/// assert!(validate_wp_cli_arg("--skip-plugins").is_ok());
/// assert!(validate_wp_cli_arg("--url=https://example.com/blog").is_ok());
/// assert!(validate_wp_cli_arg("--url=$(whoami)").is_err());
/// assert!(validate_wp_cli_arg("--path=/tmp;id").is_err());
/// ```
pub fn validate_wp_cli_arg(arg: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "wp_cli_arg";

    if arg.contains("$(") || arg.contains('`') {
        return Err(ValidationError::new(FIELD, "command substitution is not allowed"));
    }

    let residue: String = arg
        .chars()
        .filter(|c| !WP_CLI_FLAG_CHARS.contains(c))
        .collect();

    if let Some(ch) = find_shell_metacharacter(&residue) {
        return Err(ValidationError::new(
            FIELD,
            format!("contains shell metacharacter '{}'", ch.escape_default()),
        ));
    }

    Ok(arg.to_string())
}

/// Check that `command` is one of the caller's allowed commands.
pub fn validate_command(command: &str, allowlist: &[&str]) -> Result<String, ValidationError> {
    if allowlist.contains(&command) {
        Ok(command.to_string())
    } else {
        Err(ValidationError::new(
            "command",
            format!("'{command}' is not in the allowed command list"),
        ))
    }
}
