// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `spikescope.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpikescopeConfig {
    pub stream: StreamConfig,
    pub detection: DetectionConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Acquisition stream layout
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Samples per second
    pub sample_rate: f64,
    /// Rows per `process_data` call
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30_000.0,
            chunk_size: 1024,
        }
    }
}

/// Peak detection parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// "+" or "-"
    pub peak_sign: String,
    pub relative_threshold: f64,
    pub peak_span_ms: f64,
    /// Omit to disable spatial pooling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjacency_radius: Option<f64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            peak_sign: "-".to_string(),
            relative_threshold: 5.0,
            peak_span_ms: 0.5,
            adjacency_radius: None,
        }
    }
}

/// Engine construction and backend selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Registry name ("cpu", "cpu-parallel", "wgpu") or "auto"
    pub backend: String,
    pub force_cpu: bool,
    pub parallel_workload_threshold: usize,
    pub gpu_workload_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            force_cpu: false,
            parallel_workload_threshold: 65_536,
            gpu_workload_threshold: 4_194_304,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
