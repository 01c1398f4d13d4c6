// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks value ranges and enumerated strings so that a validated config can
//! be turned into a detector session without further checks.

use crate::{ConfigError, ConfigResult, SpikescopeConfig};

/// Backend names accepted in `engine.backend`
pub const KNOWN_BACKENDS: [&str; 4] = ["auto", "cpu", "cpu-parallel", "wgpu"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MustBePositive { field: String, value: f64 },
    UnknownChoice {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field, value } => {
                write!(f, "{} must be a finite value > 0, got {}", field, value)
            }
            Self::UnknownChoice {
                field,
                value,
                allowed,
            } => {
                write!(
                    f,
                    "{} = '{}' is not one of [{}]",
                    field,
                    value,
                    allowed.join(", ")
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive sample rate, chunk size, threshold, span and radius
/// - Known peak sign, backend, log level and log format
/// - Ordered workload thresholds
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &SpikescopeConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_stream(config, &mut errors);
    validate_detection(config, &mut errors);
    validate_engine(config, &mut errors);
    validate_logging(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Err(ConfigError::ValidationError(error_messages.join("\n")))
    }
}

fn check_positive(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigValidationError::MustBePositive {
            field: field.to_string(),
            value,
        });
    }
}

fn check_choice(
    field: &str,
    value: &str,
    allowed: &'static [&'static str],
    errors: &mut Vec<ConfigValidationError>,
) {
    if !allowed.contains(&value.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownChoice {
            field: field.to_string(),
            value: value.to_string(),
            allowed,
        });
    }
}

fn validate_stream(config: &SpikescopeConfig, errors: &mut Vec<ConfigValidationError>) {
    check_positive("stream.sample_rate", config.stream.sample_rate, errors);
    if config.stream.chunk_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "stream.chunk_size".to_string(),
            reason: "must be >= 1".to_string(),
        });
    }
}

fn validate_detection(config: &SpikescopeConfig, errors: &mut Vec<ConfigValidationError>) {
    let detection = &config.detection;
    check_choice("detection.peak_sign", &detection.peak_sign, &["+", "-"], errors);
    check_positive(
        "detection.relative_threshold",
        detection.relative_threshold,
        errors,
    );
    check_positive("detection.peak_span_ms", detection.peak_span_ms, errors);
    if let Some(radius) = detection.adjacency_radius {
        check_positive("detection.adjacency_radius", radius, errors);
    }
}

fn validate_engine(config: &SpikescopeConfig, errors: &mut Vec<ConfigValidationError>) {
    let engine = &config.engine;
    check_choice("engine.backend", &engine.backend, &KNOWN_BACKENDS, errors);
    if engine.parallel_workload_threshold > engine.gpu_workload_threshold {
        errors.push(ConfigValidationError::InvalidValue {
            field: "engine.parallel_workload_threshold".to_string(),
            reason: format!(
                "{} exceeds engine.gpu_workload_threshold {}",
                engine.parallel_workload_threshold, engine.gpu_workload_threshold
            ),
        });
    }
}

fn validate_logging(config: &SpikescopeConfig, errors: &mut Vec<ConfigValidationError>) {
    check_choice("logging.level", &config.logging.level, &LOG_LEVELS, errors);
    check_choice("logging.format", &config.logging.format, &LOG_FORMATS, errors);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SpikescopeConfig::default();
        let result = validate_config(&config);
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_peak_sign() {
        let mut config = SpikescopeConfig::default();
        config.detection.peak_sign = "both".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());

        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("detection.peak_sign"));
            assert!(msg.contains("both"));
        }
    }

    #[test]
    fn test_all_violations_reported() {
        let mut config = SpikescopeConfig::default();
        config.stream.sample_rate = 0.0;
        config.stream.chunk_size = 0;
        config.detection.relative_threshold = -1.0;
        config.detection.adjacency_radius = Some(0.0);
        config.engine.backend = "cuda".to_string();
        config.logging.format = "xml".to_string();

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                for field in [
                    "stream.sample_rate",
                    "stream.chunk_size",
                    "detection.relative_threshold",
                    "detection.adjacency_radius",
                    "engine.backend",
                    "logging.format",
                ] {
                    assert!(msg.contains(field), "missing {} in {}", field, msg);
                }
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_backend_names_case_insensitive() {
        let mut config = SpikescopeConfig::default();
        config.engine.backend = "CPU-Parallel".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
