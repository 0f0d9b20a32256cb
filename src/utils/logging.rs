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

use tracing_subscriber::EnvFilter;

/// Create an environment filter based on verbosity level
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_directive(verbosity))
    }
}

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "wpguard=warn",
        1 => "wpguard=info",
        2 => "wpguard=debug",
        _ => "wpguard=trace",
    }
}

/// Initialize logging to stderr so stdout stays usable for command output.
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init_logging(verbosity: u8) {
    let filter = create_env_filter(verbosity);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(default_directive(0), "wpguard=warn");
        assert_eq!(default_directive(1), "wpguard=info");
        assert_eq!(default_directive(2), "wpguard=debug");
        assert_eq!(default_directive(7), "wpguard=trace");
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(0);
        init_logging(3);
    }
}
