// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging set up from the `[logging]` config section

use anyhow::Result;

use crate::config::SpikescopeConfig;
use crate::observability::{init_logging_with_level, CrateDebugFlags, LogFormat};

/// Install the global subscriber at the config's level and format
///
/// Crates named in `debug_flags` are still raised to `debug`, and `RUST_LOG`
/// replaces the whole filter when set.
///
/// # Errors
/// Fails on an unknown `logging.format` or if a subscriber is already installed.
pub fn init_logging_from_config(
    config: &SpikescopeConfig,
    debug_flags: &CrateDebugFlags,
) -> Result<()> {
    let format: LogFormat = config.logging.format.parse()?;
    let level = config.logging.level.to_lowercase();
    init_logging_with_level(debug_flags, format, &level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_rejected_before_install() {
        let mut config = SpikescopeConfig::default();
        config.logging.format = "xml".to_string();
        let err = init_logging_from_config(&config, &CrateDebugFlags::default()).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_json_format_from_config() {
        let mut config = SpikescopeConfig::default();
        config.logging.level = "WARN".to_string();
        config.logging.format = "json".to_string();
        let flags = CrateDebugFlags::default();
        // Whichever call installs first, the next one finds a subscriber in place
        let _ = init_logging_from_config(&config, &flags);
        assert!(init_logging_from_config(&config, &flags).is_err());
    }
}
