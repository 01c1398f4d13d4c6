// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Config-driven detection sessions
//!
//! Turns a [`SpikescopeConfig`] plus probe geometry into a configured
//! streaming engine.

use ndarray::{Array2, ArrayView2};
use tracing::info;

use crate::config::{validate_config, SpikescopeConfig};
use crate::detector::{
    BackendConfig, ChunkPeaks, DetectorError, EngineRegistry, EngineSettings, EngineStats,
    PeakDetectionParams, PeakDetectorEngine, PeakSign, Result,
};

/// A configured streaming engine and the config it came from
pub struct DetectionSession {
    engine: Box<dyn PeakDetectorEngine<f32>>,
    config: SpikescopeConfig,
}

/// Detection parameters described by a config
pub fn params_from_config(config: &SpikescopeConfig) -> Result<PeakDetectionParams> {
    let detection = &config.detection;
    let peak_sign: PeakSign = detection.peak_sign.parse()?;
    let mut params = PeakDetectionParams::new(
        peak_sign,
        detection.relative_threshold,
        detection.peak_span_ms,
    );
    params.adjacency_radius = detection.adjacency_radius;
    Ok(params)
}

/// Backend auto-selection thresholds described by a config
pub fn backend_config_from_config(config: &SpikescopeConfig) -> BackendConfig {
    BackendConfig {
        parallel_workload_threshold: config.engine.parallel_workload_threshold,
        gpu_workload_threshold: config.engine.gpu_workload_threshold,
        force_cpu: config.engine.force_cpu,
    }
}

impl DetectionSession {
    /// Build a session from every engine compiled into this build
    pub fn from_config(config: &SpikescopeConfig, geometry: Array2<f64>) -> Result<Self> {
        let registry = EngineRegistry::<f32>::with_default_engines();
        Self::from_config_with_registry(config, geometry, &registry)
    }

    /// Build a session from a caller-supplied registry
    pub fn from_config_with_registry(
        config: &SpikescopeConfig,
        geometry: Array2<f64>,
        registry: &EngineRegistry<f32>,
    ) -> Result<Self> {
        validate_config(config).map_err(|e| DetectorError::Configuration(e.to_string()))?;
        let params = params_from_config(config)?;

        let settings = EngineSettings::new(
            config.stream.sample_rate,
            geometry.nrows(),
            config.stream.chunk_size,
            geometry,
        );

        let backend = config.engine.backend.to_lowercase();
        let mut engine = if backend == "auto" {
            registry.create_with_selection(settings, &backend_config_from_config(config))?
        } else {
            registry.create(&backend, settings)?
        };
        engine.change_params(params)?;

        info!(
            backend = engine.backend_name(),
            requested = %config.engine.backend,
            "detection session ready"
        );

        Ok(Self {
            engine,
            config: config.clone(),
        })
    }

    /// Feed one chunk ending at absolute sample `chunk_end`
    pub fn process(&mut self, chunk_end: u64, chunk: ArrayView2<'_, f32>) -> Result<ChunkPeaks> {
        self.engine.process_data(chunk_end, chunk)
    }

    /// Replace the detection parameters; the stream restarts at the next chunk
    pub fn update_params(&mut self, params: PeakDetectionParams) -> Result<()> {
        self.engine.change_params(params)
    }

    pub fn engine(&self) -> &dyn PeakDetectorEngine<f32> {
        self.engine.as_ref()
    }

    pub fn backend_name(&self) -> &str {
        self.engine.backend_name()
    }

    pub fn stats(&self) -> &EngineStats {
        self.engine.stats()
    }

    pub fn config(&self) -> &SpikescopeConfig {
        &self.config
    }
}
