// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones win:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, SpikescopeConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "spikescope.toml";

/// Find the spikescope configuration file
///
/// Search order:
/// 1. `SPIKESCOPE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./spikescope.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SPIKESCOPE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SPIKESCOPE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet SPIKESCOPE_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides (dotted keys, see [`apply_cli_overrides`])
///
/// # Errors
///
/// Returns error if the file is missing or unreadable, contains invalid TOML,
/// or a CLI override cannot be parsed. Validation is a separate step.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SpikescopeConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: SpikescopeConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SPIKESCOPE_BACKEND` -> `engine.backend`
/// - `SPIKESCOPE_PEAK_SIGN` -> `detection.peak_sign`
/// - `SPIKESCOPE_RELATIVE_THRESHOLD` -> `detection.relative_threshold`
/// - `SPIKESCOPE_PEAK_SPAN_MS` -> `detection.peak_span_ms`
/// - `SPIKESCOPE_ADJACENCY_RADIUS` -> `detection.adjacency_radius` ("none" disables pooling)
/// - `SPIKESCOPE_CHUNK_SIZE` -> `stream.chunk_size`
/// - `SPIKESCOPE_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut SpikescopeConfig) {
    if let Ok(value) = env::var("SPIKESCOPE_BACKEND") {
        config.engine.backend = value;
    }
    if let Ok(value) = env::var("SPIKESCOPE_PEAK_SIGN") {
        config.detection.peak_sign = value;
    }
    if let Ok(value) = env::var("SPIKESCOPE_RELATIVE_THRESHOLD") {
        if let Ok(threshold) = value.parse::<f64>() {
            config.detection.relative_threshold = threshold;
        }
    }
    if let Ok(value) = env::var("SPIKESCOPE_PEAK_SPAN_MS") {
        if let Ok(span) = value.parse::<f64>() {
            config.detection.peak_span_ms = span;
        }
    }
    if let Ok(value) = env::var("SPIKESCOPE_ADJACENCY_RADIUS") {
        if let Ok(radius) = parse_optional_f64(&value) {
            config.detection.adjacency_radius = radius;
        }
    }
    if let Ok(value) = env::var("SPIKESCOPE_CHUNK_SIZE") {
        if let Ok(chunk_size) = value.parse::<usize>() {
            config.stream.chunk_size = chunk_size;
        }
    }
    if let Ok(value) = env::var("SPIKESCOPE_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys are `section.field`, e.g. `{"detection.peak_sign": "+", "stream.chunk_size": "2048"}`.
///
/// # Errors
///
/// `ConfigError::InvalidValue` for an unknown key or an unparsable value.
pub fn apply_cli_overrides(
    config: &mut SpikescopeConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        match key.as_str() {
            "stream.sample_rate" => config.stream.sample_rate = parse_value(key, value)?,
            "stream.chunk_size" => config.stream.chunk_size = parse_value(key, value)?,
            "detection.peak_sign" => config.detection.peak_sign = value.clone(),
            "detection.relative_threshold" => {
                config.detection.relative_threshold = parse_value(key, value)?
            }
            "detection.peak_span_ms" => config.detection.peak_span_ms = parse_value(key, value)?,
            "detection.adjacency_radius" => {
                config.detection.adjacency_radius = parse_optional_f64(value)
                    .map_err(|_| invalid(key, value))?;
            }
            "engine.backend" => config.engine.backend = value.clone(),
            "engine.force_cpu" => config.engine.force_cpu = parse_bool(key, value)?,
            "engine.parallel_workload_threshold" => {
                config.engine.parallel_workload_threshold = parse_value(key, value)?
            }
            "engine.gpu_workload_threshold" => {
                config.engine.gpu_workload_threshold = parse_value(key, value)?
            }
            "logging.level" => config.logging.level = value.clone(),
            "logging.format" => config.logging.format = value.clone(),
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown configuration key '{}'",
                    key
                )))
            }
        }
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.parse::<T>().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue(format!("{} = '{}'", key, value))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_optional_f64(value: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    match value.to_lowercase().as_str() {
        "" | "none" | "off" => Ok(None),
        other => other.parse::<f64>().map(Some),
    }
}
