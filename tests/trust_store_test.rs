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

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::tempdir;
use wpguard::shared::error::{RejectedAt, TrustError};
use wpguard::ssh::{
    fingerprint, Confirm, HostKeyCallback, HostKeyPolicy, HostPublicKey, PromptKind, TrustDecision,
    TrustPrompt, TrustStore,
};

/// Answers prompts from a script and records what it was shown.
#[derive(Clone, Default)]
struct Scripted {
    answers: Arc<Mutex<VecDeque<&'static str>>>,
    shown: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    fn new(answers: &[&'static str]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.iter().copied().collect())),
            shown: Arc::default(),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl Confirm for Scripted {
    fn confirm(&self, prompt: &TrustPrompt<'_>) -> bool {
        self.shown.lock().unwrap().push(prompt.to_string());
        let answer = self.answers.lock().unwrap().pop_front().unwrap_or("no");
        wpguard::ssh::confirm::is_affirmative(answer)
    }
}

fn k1() -> HostPublicKey {
    HostPublicKey::new("ssh-ed25519", b"\x00\x00\x00\x0bssh-ed25519\x00\x00\x00\x20first-host-key-material-32bytes!".to_vec())
}

fn k2() -> HostPublicKey {
    HostPublicKey::new("ssh-ed25519", b"\x00\x00\x00\x0bssh-ed25519\x00\x00\x00\x20other-host-key-material-32bytes!".to_vec())
}

#[test]
fn test_scenario_first_use_then_silent() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");
    let confirmer = Scripted::new(&["yes"]);
    let store = TrustStore::open(&path, confirmer.clone())?;

    let decision = store.verify_host_key("host.example", &k1())?;
    assert_eq!(decision, TrustDecision::FirstUse);

    let prompts = confirmer.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("host.example"));
    assert!(prompts[0].contains(&k1().fingerprint()));

    let content = fs::read_to_string(&path)?;
    assert_eq!(
        content,
        format!("host.example ssh-ed25519 {}\n", k1().to_base64())
    );

    // second connection: no prompt
    assert_eq!(
        store.verify_host_key("host.example", &k1())?,
        TrustDecision::Trusted
    );
    assert_eq!(confirmer.prompts().len(), 1);

    Ok(())
}

#[test]
fn test_scenario_changed_key_declined() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");
    fs::write(
        &path,
        format!("host.example ssh-ed25519 {}\n", k1().to_base64()),
    )?;
    let before = fs::read(&path)?;

    let confirmer = Scripted::new(&["no"]);
    let store = TrustStore::open(&path, confirmer.clone())?;

    let err = store.verify_host_key("host.example", &k2()).unwrap_err();
    assert!(matches!(
        err,
        TrustError::Rejected {
            stage: RejectedAt::Mismatch,
            ..
        }
    ));
    assert!(err.is_rejection());

    let prompts = confirmer.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&k1().fingerprint()));
    assert!(prompts[0].contains(&k2().fingerprint()));
    assert!(prompts[0].contains(path.to_str().unwrap()));

    assert_eq!(fs::read(&path)?, before);
    assert_eq!(store.get("host.example").unwrap().key, k1());

    Ok(())
}

#[test]
fn test_changed_key_accepted_replaces_record() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");
    let store = TrustStore::open(&path, Scripted::new(&["yes", "YES "]))?;

    store.verify_host_key("host.example:22", &k1())?;
    assert_eq!(
        store.verify_host_key("host.example", &k2())?,
        TrustDecision::Mismatch
    );

    let content = fs::read_to_string(&path)?;
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains(&k2().to_base64()));

    // a fresh instance sees the replacement
    let reopened = TrustStore::open(&path, HostKeyPolicy::Strict)?;
    assert_eq!(reopened.classify("host.example", &k2()), TrustDecision::Trusted);
    assert_eq!(reopened.classify("host.example", &k1()), TrustDecision::Mismatch);

    Ok(())
}

#[test]
fn test_round_trip_is_byte_identical() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("known_hosts");
    let key = HostPublicKey::new("ecdsa-sha2-nistp256", (0u8..=255).collect::<Vec<u8>>());

    let store = TrustStore::open(&path, HostKeyPolicy::AcceptNew)?;
    store.verify_host_key("[10.0.0.5]:2222", &key)?;

    let reopened = TrustStore::open(&path, HostKeyPolicy::Strict)?;
    let record = reopened.get("10.0.0.5").unwrap();
    assert_eq!(record.key.as_bytes(), key.as_bytes());
    assert_eq!(record.key.key_type(), "ecdsa-sha2-nistp256");
    assert_eq!(reopened.list_known_hosts(), vec!["10.0.0.5"]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())?.permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    Ok(())
}

#[test]
fn test_policies_without_terminal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");

    let strict = TrustStore::open(&path, HostKeyPolicy::Strict)?;
    let err = strict.verify_host_key("host.example", &k1()).unwrap_err();
    assert!(matches!(
        err,
        TrustError::Rejected {
            stage: RejectedAt::FirstUse,
            ..
        }
    ));
    assert!(!path.exists());

    let accept_new = TrustStore::open(&path, HostKeyPolicy::AcceptNew)?;
    accept_new.verify_host_key("host.example", &k1())?;
    assert!(accept_new.verify_host_key("host.example", &k2()).is_err());
    assert_eq!(accept_new.get("host.example").unwrap().key, k1());

    Ok(())
}

#[test]
fn test_remove_and_list() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");
    let store = TrustStore::open(&path, HostKeyPolicy::AcceptNew)?;
    store.verify_host_key("b.example", &k1())?;
    store.verify_host_key("a.example", &k2())?;

    let mut hosts = store.list_known_hosts();
    hosts.sort();
    assert_eq!(hosts, vec!["a.example", "b.example"]);

    store.remove_host_key("b.example")?;
    assert_eq!(store.list_known_hosts(), vec!["a.example"]);
    assert!(matches!(
        store.remove_host_key("b.example"),
        Err(TrustError::UnknownHost(_))
    ));

    let reopened = TrustStore::open(&path, HostKeyPolicy::Strict)?;
    assert_eq!(reopened.list_known_hosts(), vec!["a.example"]);

    Ok(())
}

#[test]
fn test_concurrent_first_use_prompts_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");
    let confirmer = Scripted::new(&["yes"]);
    let store = TrustStore::open(&path, confirmer.clone())?;

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let decision = store.verify_host_key("host.example", &k1()).unwrap();
                assert!(matches!(
                    decision,
                    TrustDecision::FirstUse | TrustDecision::Trusted
                ));
            });
        }
    });

    assert_eq!(confirmer.prompts().len(), 1);
    assert_eq!(fs::read_to_string(&path)?.lines().count(), 1);

    Ok(())
}

#[test]
fn test_host_key_callback() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let store = TrustStore::open(dir.path().join("known_hosts"), HostKeyPolicy::AcceptNew)?;
    let callback: &dyn HostKeyCallback = &store;

    let addr = "192.0.2.10:22".parse().ok();
    callback.check_host_key("host.example", addr, &k1())?;
    assert!(callback.check_host_key("host.example", addr, &k2()).is_err());

    Ok(())
}

#[test]
fn test_fingerprint_determinism() {
    let a = fingerprint(k1().as_bytes());
    let b = fingerprint(&k1().as_bytes().to_vec());
    assert_eq!(a, b);
    assert!(a.starts_with("SHA256:"));
    assert!(!a.ends_with('='));
    assert_ne!(a, fingerprint(k2().as_bytes()));
}

#[test]
fn test_prompt_kind_reported_to_confirmer() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let kinds = Arc::new(Mutex::new(Vec::new()));

    struct Recording(Arc<Mutex<Vec<PromptKind>>>);
    impl Confirm for Recording {
        fn confirm(&self, prompt: &TrustPrompt<'_>) -> bool {
            self.0.lock().unwrap().push(prompt.kind.clone());
            true
        }
    }

    let store = TrustStore::open(dir.path().join("kh"), Recording(Arc::clone(&kinds)))?;
    store.verify_host_key("h", &k1())?;
    store.verify_host_key("h", &k2())?;

    let kinds = kinds.lock().unwrap();
    assert_eq!(kinds[0], PromptKind::FirstUse);
    assert_eq!(
        kinds[1],
        PromptKind::Mismatch {
            stored_fingerprint: k1().fingerprint()
        }
    );

    Ok(())
}

#[test]
fn test_newline_in_hostname_cannot_pin_another_host() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("known_hosts");
    let confirmer = Scripted::new(&["yes", "yes"]);
    let store = TrustStore::open(&path, confirmer.clone())?;

    let hostname = format!(
        "attacker.example\nvictim.example ssh-ed25519 {}\nx",
        k2().to_base64()
    );
    let err = store.verify_host_key(&hostname, &k1()).unwrap_err();
    assert!(matches!(err, TrustError::InvalidHostname(_)));
    assert!(confirmer.prompts().is_empty());

    // the real victim is still unknown and gets its own first-use prompt
    assert_eq!(
        store.verify_host_key("victim.example", &k1())?,
        TrustDecision::FirstUse
    );
    let reopened = TrustStore::open(&path, Scripted::new(&[]))?;
    assert_eq!(reopened.list_known_hosts(), vec!["victim.example"]);
    assert_eq!(reopened.classify("victim.example", &k1()), TrustDecision::Trusted);
    Ok(())
}
