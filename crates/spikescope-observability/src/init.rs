// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for spikescope
//!
//! Console output only, human-readable or JSON lines.

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

/// Initialize the global subscriber at `info` base level
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, format: LogFormat) -> Result<()> {
    init_logging_with_level(debug_flags, format, "info")
}

/// Initialize the global subscriber with an explicit base level
///
/// `RUST_LOG`, when set, replaces the filter built from the flags.
pub fn init_logging_with_level(
    debug_flags: &CrateDebugFlags,
    format: LogFormat,
    base_level: &str,
) -> Result<()> {
    let env_filter = build_filter(debug_flags, base_level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Filter from `RUST_LOG` if present, otherwise from the debug flags
pub fn build_filter(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::try_from_default_env().context("Invalid RUST_LOG filter");
    }
    let filter = debug_flags.to_filter_string_with_base(base_level);
    EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter '{}'", filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_build_filter_from_flags() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let flags = CrateDebugFlags::from_args(vec!["--debug-spikescope-detector".to_string()]);
        let filter = build_filter(&flags, "warn").unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("spikescope_detector=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn test_second_init_fails() {
        let flags = CrateDebugFlags::default();
        // The first call may lose to another test; the second always finds one installed
        let _ = init_logging(&flags, LogFormat::Text);
        assert!(init_logging(&flags, LogFormat::Json).is_err());
    }
}
