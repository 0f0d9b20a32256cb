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
use std::io::{BufRead, Write};

use crate::security::redact::MASK;
use crate::security::{remove_sensitive_data, sanitize_log_message};

fn opens_private_key(line: &str) -> bool {
    line.contains("-----BEGIN ") && line.contains("PRIVATE KEY-----")
}

fn closes_private_key(line: &str) -> bool {
    line.contains("-----END ") && line.contains("PRIVATE KEY-----")
}

fn write_capped(output: &mut impl Write, text: &str, max_len: usize) -> Result<()> {
    for line in text.lines() {
        writeln!(output, "{}", sanitize_log_message(line, max_len))
            .context("Failed to write output")?;
    }
    Ok(())
}

/// Copy `input` to `output` with credentials masked and each line capped at
/// `max_len` bytes.
///
/// Input is processed line by line, except that a private key block is
/// collected from its `BEGIN` line to its `END` line and redacted as a
/// whole. A block still open at end of input is masked entirely.
pub fn redact_stream(input: impl BufRead, mut output: impl Write, max_len: usize) -> Result<()> {
    let mut pem_block: Option<Vec<String>> = None;

    for line in input.lines() {
        let line = line.context("Failed to read input")?;

        if let Some(block) = pem_block.as_mut() {
            block.push(line);
            if block.last().is_some_and(|l| closes_private_key(l)) {
                let text = block.join("\n");
                pem_block = None;
                write_capped(&mut output, &remove_sensitive_data(&text), max_len)?;
            }
            continue;
        }

        if opens_private_key(&line) && !closes_private_key(&line) {
            pem_block = Some(vec![line]);
            continue;
        }

        writeln!(output, "{}", sanitize_log_message(&line, max_len))
            .context("Failed to write output")?;
    }

    if let Some(block) = pem_block {
        tracing::warn!("Private key block without END marker; masking {} lines", block.len());
        if let Some(first) = block.first() {
            write_capped(&mut output, first, max_len)?;
        }
        writeln!(output, "{MASK}").context("Failed to write output")?;
    }

    output.flush().context("Failed to write output")?;
    Ok(())
}
