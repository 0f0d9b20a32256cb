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

use wpguard::security::{
    validate_command, validate_command_args, validate_file_path, validate_filename,
    validate_path, validate_rsync_pattern, validate_shell_token, validate_table_name,
    validate_table_prefix, validate_wp_cli_arg, SanitizationPolicy,
};

const SHELL_SPECIALS: &[char] = &[
    ';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '*', '?', '[', ']', '{', '}', '\\', '\'',
    '"',
];

#[test]
fn test_scenario_table_prefix_injection() {
    let err = validate_table_prefix("wp_'; DROP TABLE users--").unwrap_err();
    assert_eq!(err.field, "table_prefix");
    assert_eq!(validate_table_prefix("wp_").unwrap(), "wp_");
}

#[test]
fn test_shell_token_rejects_every_metacharacter() {
    for &special in SHELL_SPECIALS {
        for template in ["{}", "a{}", "{}b", "/var/www/{}html"] {
            let input = template.replacen("{}", &special.to_string(), 1);
            assert!(
                validate_shell_token(&input).is_err(),
                "accepted {input:?}"
            );
        }
    }
    assert!(validate_shell_token("a b").is_err());
    assert!(validate_shell_token("a\tb").is_err());
    assert!(validate_shell_token("").is_err());
}

#[test]
fn test_shell_token_accepts_whitelist_unchanged() {
    for token in [
        "/var/www/html",
        "public_html",
        "wp-content/uploads/2024",
        "backup.tar.gz",
        "..",
        "-",
        "A-Z_a-z.0-9/",
    ] {
        assert_eq!(validate_shell_token(token).unwrap(), token);
    }
}

#[test]
fn test_command_args_reject_whole_list() {
    assert_eq!(
        validate_command_args(&["plugin", "list", "--status=active"]).unwrap(),
        vec!["plugin", "list", "--status=active"]
    );

    let err = validate_command_args(&["plugin", "install", "x; rm -rf /"]).unwrap_err();
    assert_eq!(err.field, "args[2]");
    assert!(validate_command_args(&["$(id)"]).is_err());
}

#[test]
fn test_wp_cli_args() {
    for ok in [
        "--user=admin",
        "--url=https://example.com/blog",
        "--skip-plugins",
        "option",
        "--format=json",
        "--fields=ID,user_login",
    ] {
        assert_eq!(validate_wp_cli_arg(ok).unwrap(), ok);
    }

    for bad in [
        "--user=$(whoami)",
        "--user=`id`",
        "--path=/tmp;ls",
        "--url=a|b",
        "--title=x>y",
    ] {
        assert!(validate_wp_cli_arg(bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn test_paths() {
    assert_eq!(validate_path("wp-content//uploads/./a.jpg").unwrap(), "wp-content/uploads/a.jpg");
    for bad in ["../etc/passwd", "a/../../b", "..\\windows", "a/..", "a\\..\\b", ""] {
        assert!(validate_path(bad).is_err(), "accepted {bad:?}");
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let inside = root.join("wp-content/uploads/a.jpg");
    assert_eq!(
        validate_file_path(inside.to_str().unwrap(), root).unwrap(),
        inside
    );
    assert!(validate_file_path("/etc/passwd", root).is_err());
    let sneaky = format!("{}/../outside", root.display());
    assert!(validate_file_path(&sneaky, root).is_err());
}

#[test]
fn test_filenames() {
    assert_eq!(validate_filename("wp-config.php").unwrap(), "wp-config.php");
    assert_eq!(validate_filename("/var/www/html/index.php").unwrap(), "index.php");
    assert_eq!(validate_filename("C:\\sites\\backup.sql").unwrap(), "backup.sql");

    for bad in [".", "..", "~", "a b.txt", "x;y", "naïve.txt"] {
        assert!(validate_filename(bad).is_err(), "accepted {bad:?}");
    }
    assert!(validate_filename(&"a".repeat(255)).is_ok());
    assert!(validate_filename(&"a".repeat(256)).is_err());
}

#[test]
fn test_table_names_and_patterns() {
    assert!(validate_table_name("wp_posts").is_ok());
    assert!(validate_table_name("wp-posts").is_ok());
    assert!(validate_table_prefix("wp-").is_err());
    assert!(validate_table_name(&"t".repeat(64)).is_ok());
    assert!(validate_table_name(&"t".repeat(65)).is_err());
    assert!(validate_table_name("posts`").is_err());

    assert!(validate_rsync_pattern("*.log").is_ok());
    assert!(validate_rsync_pattern("wp-content/cache/**").is_ok());
    for bad in ["*.log;rm", "a|b", "$HOME", "a\nb", "`x`", "a>b"] {
        assert!(validate_rsync_pattern(bad).is_err(), "accepted {bad:?}");
    }
    assert!(validate_rsync_pattern(&"a".repeat(257)).is_err());
}

#[test]
fn test_command_allowlist() {
    let allowed = ["wp", "rsync", "mysqldump"];
    assert_eq!(validate_command("wp", &allowed).unwrap(), "wp");
    assert!(validate_command("bash", &allowed).is_err());
    assert!(validate_command("wp ", &allowed).is_err());
}

#[test]
fn test_policies_match_direct_validators() {
    let inputs = ["wp_", "a;b", "../x", "index.php", "--user=admin", "*.log"];
    for input in inputs {
        assert_eq!(
            SanitizationPolicy::TablePrefix.apply(input).is_ok(),
            validate_table_prefix(input).is_ok()
        );
        assert_eq!(
            SanitizationPolicy::ShellToken.apply(input).is_ok(),
            validate_shell_token(input).is_ok()
        );
        assert_eq!(
            SanitizationPolicy::Path.apply(input).is_ok(),
            validate_path(input).is_ok()
        );
    }
}
