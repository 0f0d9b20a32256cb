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

//! Input sanitizing and credential redaction.
//!
//! Every string that will reach a subprocess, a remote shell, an SQL
//! identifier position or a local path goes through one of the validators
//! here first. Text that leaves the process as a log line or terminal
//! message goes through [`redact`].

pub mod policy;
pub mod redact;
pub mod shell;
pub mod validation;

pub use policy::SanitizationPolicy;
pub use redact::{remove_sensitive_data, sanitize_error_for_user, sanitize_log_message};
pub use shell::{
    find_shell_metacharacter, validate_command, validate_command_args, validate_shell_token,
    validate_wp_cli_arg, SHELL_METACHARACTERS,
};
pub use validation::{
    clean_path, validate_file_path, validate_filename, validate_hostname, validate_path,
    validate_rsync_pattern, validate_table_name, validate_table_prefix, validate_username,
};
