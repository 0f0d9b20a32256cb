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

use std::fs::File;
use std::path::Path;
use std::thread;

use super::digest::{Digest, Md5Digest};
use super::report::{diff, ChecksumReport, DigestMap};
use crate::security::{sanitize_log_message, validate_shell_token};
use crate::shared::error::{ChecksumError, ValidationError};
use crate::ssh::exec::RemoteExecutor;
use crate::utils::fs::{relative_slash_path, walk_directory};

const MAX_LOGGED_LINE: usize = 200;

/// Whitelist the remote root and refuse anything `cd` would read as an
/// option (`-`, `-P`).
fn remote_root_token(remote_root: &str) -> Result<String, ValidationError> {
    let root = validate_shell_token(remote_root)?;
    if root.starts_with('-') {
        return Err(ValidationError::new(
            "remote_root",
            "remote root cannot start with a hyphen",
        ));
    }
    Ok(root)
}

/// Compares a remote file tree against a local copy.
///
/// The remote side is hashed by one command run through the executor, the
/// local side by walking the directory. Both run at the same time.
pub struct ChecksumVerifier<E> {
    executor: E,
    digest: Box<dyn Digest>,
}

impl<E: RemoteExecutor + Sync> ChecksumVerifier<E> {
    /// Verifier using MD5.
    pub fn new(executor: E) -> Self {
        Self::with_digest(executor, Box::new(Md5Digest))
    }

    pub fn with_digest(executor: E, digest: Box<dyn Digest>) -> Self {
        Self { executor, digest }
    }

    pub fn digest(&self) -> &dyn Digest {
        self.digest.as_ref()
    }

    /// Hash both trees and compare them.
    ///
    /// Fails only when a digest map cannot be produced. Content
    /// differences are reported in the returned [`ChecksumReport`].
    pub fn verify(&self, remote_root: &str, local_root: &Path) -> Result<ChecksumReport, ChecksumError> {
        let remote_root = remote_root_token(remote_root)?;
        if !local_root.is_dir() {
            return Err(ChecksumError::NotADirectory(local_root.to_path_buf()));
        }

        tracing::info!(
            "Verifying {} against {:?} using {}",
            remote_root,
            local_root,
            self.digest.name()
        );

        let (remote, local) = thread::scope(|scope| {
            let remote = scope.spawn(|| self.remote_digests(&remote_root));
            let local = self.local_digests(local_root);
            let remote = remote
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (remote, local)
        });
        let (remote, local) = (remote?, local?);

        let mut report = diff(&remote, &local);
        report.algorithm = self.digest.name().to_string();

        if report.is_clean() {
            tracing::info!("All {} files match", report.matched_count());
        } else {
            tracing::warn!(
                "Checksum drift: {} matched, {} mismatched, {} missing locally, {} missing remotely",
                report.matched_count(),
                report.mismatched_count(),
                report.missing_local_count(),
                report.missing_remote_count()
            );
        }
        Ok(report)
    }

    /// Digests of every regular file under `remote_root`, keyed by path
    /// relative to it.
    pub fn remote_digests(&self, remote_root: &str) -> Result<DigestMap, ChecksumError> {
        let root = remote_root_token(remote_root)?;
        let command = self.digest.remote_command(&root);
        let output = self.executor.execute(&command)?;
        let digests = parse_digest_output(&output);
        tracing::debug!("Remote tree {} has {} files", root, digests.len());
        Ok(digests)
    }

    /// Digests of every regular file under `local_root`, keyed by path
    /// relative to it with `/` separators.
    pub fn local_digests(&self, local_root: &Path) -> Result<DigestMap, ChecksumError> {
        if !local_root.is_dir() {
            return Err(ChecksumError::NotADirectory(local_root.to_path_buf()));
        }

        let mut digests = DigestMap::new();
        for path in walk_directory(local_root)? {
            let Some(relative) = relative_slash_path(local_root, &path) else {
                continue;
            };
            let io_err = |source| ChecksumError::Io {
                path: path.clone(),
                source,
            };
            let mut file = File::open(&path).map_err(io_err)?;
            let digest = self.digest.hash_reader(&mut file).map_err(io_err)?;
            digests.insert(relative, digest);
        }

        tracing::debug!("Local tree {:?} has {} files", local_root, digests.len());
        Ok(digests)
    }
}

/// Parse `md5sum`/`sha256sum` output.
///
/// Accepts `digest  path` (text mode) and `digest *path` (binary mode) and
/// the backslash-escaped form those tools emit for names containing a
/// newline or backslash. A leading `./` is stripped. Lines that do not
/// parse are skipped with a warning.
pub fn parse_digest_output(output: &str) -> DigestMap {
    let mut digests = DigestMap::new();
    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match parse_digest_line(line) {
            Some((path, digest)) => {
                digests.insert(path, digest);
            }
            None => tracing::warn!(
                "Skipping unparsable checksum line: {}",
                sanitize_log_message(line, MAX_LOGGED_LINE)
            ),
        }
    }
    digests
}

fn parse_digest_line(line: &str) -> Option<(String, String)> {
    let (escaped, line) = match line.strip_prefix('\\') {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let (digest, rest) = line.split_once(' ')?;
    if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    // second separator character is ' ' for text mode, '*' for binary
    let path = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('*'))?;
    let path = if escaped { unescape(path)? } else { path.to_string() };
    let path = path.strip_prefix("./").map(str::to_string).unwrap_or(path);
    if path.is_empty() || path == "." {
        return None;
    }

    Some((path, digest.to_ascii_lowercase()))
}

fn unescape(path: &str) -> Option<String> {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::digest::Sha256Digest;
    use crate::shared::error::ExecError;
    use std::fs;
    use std::sync::Mutex;

    struct FakeExecutor {
        output: Result<String, i32>,
        commands: Mutex<Vec<String>>,
    }

    impl FakeExecutor {
        fn ok(output: &str) -> Self {
            Self {
                output: Ok(output.to_string()),
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    impl RemoteExecutor for FakeExecutor {
        fn execute(&self, command: &str) -> Result<String, ExecError> {
            self.commands.lock().unwrap().push(command.to_string());
            match &self.output {
                Ok(out) => Ok(out.clone()),
                Err(status) => Err(ExecError::Failed {
                    status: *status,
                    stderr: "find: permission denied".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_parse_digest_output_formats() {
        let output = "\
900150983cd24fb0d6963f7d28e17f72  ./index.php
d41d8cd98f00b204e9800998ecf8427e *./wp-content/empty.txt
\\0cc175b9c0f1b6a831c399e269772661  ./odd\\nname
not a digest line
zzzz  ./bad-hex.php

";
        let map = parse_digest_output(output);
        assert_eq!(map.len(), 3);
        assert_eq!(map["index.php"], "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(map["wp-content/empty.txt"], "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(map["odd\nname"], "0cc175b9c0f1b6a831c399e269772661");
    }

    #[test]
    fn test_parse_keeps_spaces_in_names() {
        let map = parse_digest_output("abcdef  ./My Photos/a b.jpg\n");
        assert_eq!(map["My Photos/a b.jpg"], "abcdef");
    }

    #[test]
    fn test_verify_against_local_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("wp-content")).unwrap();
        fs::write(dir.path().join("index.php"), "abc").unwrap();
        fs::write(dir.path().join("wp-content/a.txt"), "changed").unwrap();
        fs::write(dir.path().join("local-only.txt"), "").unwrap();

        let exec = FakeExecutor::ok(
            "900150983cd24fb0d6963f7d28e17f72  ./index.php\n\
             0cc175b9c0f1b6a831c399e269772661  ./wp-content/a.txt\n\
             0cc175b9c0f1b6a831c399e269772661  ./remote-only.txt\n",
        );
        let verifier = ChecksumVerifier::new(&exec);
        let report = verifier.verify("/var/www/html", dir.path()).unwrap();

        assert_eq!(report.algorithm, "md5");
        assert_eq!(report.matched, vec!["index.php"]);
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.mismatched[0].path, "wp-content/a.txt");
        assert_eq!(report.missing_local, vec!["remote-only.txt"]);
        assert_eq!(report.missing_remote, vec!["local-only.txt"]);

        let commands = exec.commands.lock().unwrap();
        assert_eq!(
            *commands,
            vec!["cd -- /var/www/html && find . -type f -exec md5sum {} +".to_string()]
        );
    }

    #[test]
    fn test_verify_rejects_unsafe_remote_root() {
        let dir = tempfile::tempdir().unwrap();
        let exec = FakeExecutor::ok("");
        let verifier = ChecksumVerifier::new(&exec);

        let err = verifier.verify("/var/www; rm -rf /", dir.path()).unwrap_err();
        assert!(matches!(err, ChecksumError::Validation(_)));
        assert!(exec.commands.lock().unwrap().is_empty());
    }

    #[test]
    fn test_verify_rejects_option_like_remote_root() {
        let dir = tempfile::tempdir().unwrap();
        let exec = FakeExecutor::ok("");
        let verifier = ChecksumVerifier::new(&exec);

        for root in ["-", "-P", "--help"] {
            let err = verifier.verify(root, dir.path()).unwrap_err();
            assert!(matches!(err, ChecksumError::Validation(_)), "{root}");
            assert!(verifier.remote_digests(root).is_err(), "{root}");
        }
        assert!(exec.commands.lock().unwrap().is_empty());

        // a hyphen later in the path is an ordinary name
        verifier.verify("/srv/my-site", dir.path()).unwrap();
        assert_eq!(exec.commands.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_verify_errors() {
        let dir = tempfile::tempdir().unwrap();
        let failing = FakeExecutor {
            output: Err(1),
            commands: Mutex::new(Vec::new()),
        };
        let err = ChecksumVerifier::new(&failing)
            .verify("/var/www", dir.path())
            .unwrap_err();
        assert!(matches!(err, ChecksumError::Remote(_)));

        let exec = FakeExecutor::ok("");
        let missing = dir.path().join("nope");
        let err = ChecksumVerifier::new(&exec)
            .verify("/var/www", &missing)
            .unwrap_err();
        assert!(matches!(err, ChecksumError::NotADirectory(_)));
    }

    #[test]
    fn test_sha256_local_digests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f"), "abc").unwrap();
        let exec = FakeExecutor::ok("");
        let verifier = ChecksumVerifier::with_digest(&exec, Box::new(Sha256Digest));
        let local = verifier.local_digests(dir.path()).unwrap();
        assert_eq!(
            local["f"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
