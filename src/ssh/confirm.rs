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

//! The confirmation capability used by the trust store.
//!
//! The trust store never reads a terminal itself. It renders a
//! [`TrustPrompt`] and asks a [`Confirm`] implementation for a yes/no
//! answer, so tests can script answers and CI can run with a fixed
//! [`HostKeyPolicy`].

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

/// What kind of trust question is being asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// The host has no stored key.
    FirstUse,
    /// The host has a stored key that differs from the presented one.
    Mismatch { stored_fingerprint: String },
}

/// Everything the user needs to make an informed trust decision.
#[derive(Debug, Clone)]
pub struct TrustPrompt<'a> {
    pub hostname: &'a str,
    pub key_type: &'a str,
    pub fingerprint: String,
    pub kind: PromptKind,
    pub store_path: &'a Path,
}

impl TrustPrompt<'_> {
    pub fn is_mismatch(&self) -> bool {
        matches!(self.kind, PromptKind::Mismatch { .. })
    }
}

const MITM_BANNER: &str = "\
@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@
@    WARNING: REMOTE HOST IDENTIFICATION HAS CHANGED!     @
@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@";

impl fmt::Display for TrustPrompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PromptKind::FirstUse => {
                writeln!(
                    f,
                    "The authenticity of host '{}' can't be established.",
                    self.hostname
                )?;
                writeln!(f, "{} key fingerprint is {}.", self.key_type, self.fingerprint)?;
                writeln!(
                    f,
                    "This host is not yet listed in {}.",
                    self.store_path.display()
                )?;
                write!(
                    f,
                    "Type 'yes' to trust this key and continue connecting, anything else aborts: "
                )
            }
            PromptKind::Mismatch { stored_fingerprint } => {
                writeln!(f, "{MITM_BANNER}")?;
                writeln!(f, "IT IS POSSIBLE THAT SOMEONE IS DOING SOMETHING NASTY!")?;
                writeln!(
                    f,
                    "Someone could be eavesdropping on you right now (man-in-the-middle attack)!"
                )?;
                writeln!(f, "It is also possible that the host key has just been changed.")?;
                writeln!(f, "Host:                  {}", self.hostname)?;
                writeln!(f, "Stored fingerprint:    {stored_fingerprint}")?;
                writeln!(
                    f,
                    "Presented fingerprint: {} ({})",
                    self.fingerprint, self.key_type
                )?;
                writeln!(f, "Known hosts file:      {}", self.store_path.display())?;
                write!(
                    f,
                    "Type 'yes' to replace the stored key and continue, anything else aborts: "
                )
            }
        }
    }
}

/// Answers a trust question.
pub trait Confirm: Send + Sync {
    /// Return `true` only for an explicit affirmative answer.
    fn confirm(&self, prompt: &TrustPrompt<'_>) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&TrustPrompt<'_>) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &TrustPrompt<'_>) -> bool {
        self(prompt)
    }
}

/// `true` when `answer` is `yes`, ignoring case and surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Prompts on stderr and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

impl TerminalConfirmer {
    fn ask(&self, prompt: &TrustPrompt<'_>, input: &mut dyn BufRead, output: &mut dyn Write) -> bool {
        let rendered = prompt.to_string();
        let written = if prompt.is_mismatch() {
            write!(output, "{}", rendered.red().bold())
        } else {
            write!(output, "{}", rendered.yellow())
        };
        if written.and_then(|_| output.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_affirmative(&answer),
        }
    }
}

impl Confirm for TerminalConfirmer {
    fn confirm(&self, prompt: &TrustPrompt<'_>) -> bool {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        self.ask(prompt, &mut input, &mut output)
    }
}

/// Policy for answering trust questions without necessarily asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Ask on the terminal for every new or changed key.
    #[default]
    Ask,
    /// Trust new hosts automatically, refuse changed keys.
    AcceptNew,
    /// Refuse anything that is not already trusted.
    Strict,
}

impl Confirm for HostKeyPolicy {
    fn confirm(&self, prompt: &TrustPrompt<'_>) -> bool {
        match self {
            HostKeyPolicy::Ask => TerminalConfirmer.confirm(prompt),
            HostKeyPolicy::AcceptNew => {
                let accept = !prompt.is_mismatch();
                tracing::debug!(
                    "accept-new policy {} key for {}",
                    if accept { "accepted" } else { "refused" },
                    prompt.hostname
                );
                accept
            }
            HostKeyPolicy::Strict => {
                tracing::debug!("strict policy refused key for {}", prompt.hostname);
                false
            }
        }
    }
}

impl FromStr for HostKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ask" | "prompt" => Ok(Self::Ask),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            "strict" | "yes" => Ok(Self::Strict),
            other => Err(format!(
                "unknown host key policy '{other}' (expected ask, accept-new or strict)"
            )),
        }
    }
}
