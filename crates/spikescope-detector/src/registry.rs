// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Engine Registry
//!
//! Explicit name -> constructor map for streaming engines. Callers build a
//! registry, optionally register their own engines, and pick one by name.
//! `"auto"` is resolved through [`select_backend`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::backend::{select_backend, BackendConfig, BackendType, CPUBackend, ParallelCPUBackend};
use crate::error::{DetectorError, Result};
use crate::streaming::{PeakDetectorEngine, StreamingDetector};
use crate::types::{EngineSettings, SampleValue};

/// Constructor stored in the registry
pub type EngineConstructor<T> = fn(EngineSettings) -> Result<Box<dyn PeakDetectorEngine<T>>>;

/// Name -> engine constructor map
pub struct EngineRegistry<T: SampleValue> {
    constructors: BTreeMap<String, EngineConstructor<T>>,
}

fn create_cpu<T: SampleValue>(settings: EngineSettings) -> Result<Box<dyn PeakDetectorEngine<T>>> {
    Ok(Box::new(StreamingDetector::new(settings, CPUBackend::new())?))
}

fn create_cpu_parallel<T: SampleValue>(
    settings: EngineSettings,
) -> Result<Box<dyn PeakDetectorEngine<T>>> {
    Ok(Box::new(StreamingDetector::new(
        settings,
        ParallelCPUBackend::new(),
    )?))
}

#[cfg(feature = "gpu")]
fn create_wgpu(settings: EngineSettings) -> Result<Box<dyn PeakDetectorEngine<f32>>> {
    let backend = crate::backend::WGPUBackend::new()?;
    Ok(Box::new(StreamingDetector::new(settings, backend)?))
}

impl<T: SampleValue> EngineRegistry<T> {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with the serial and rayon CPU engines
    pub fn with_cpu_engines() -> Self {
        let mut registry = Self::new();
        registry.register(BackendType::CPU.registry_name(), create_cpu::<T>);
        registry.register(
            BackendType::CPUParallel.registry_name(),
            create_cpu_parallel::<T>,
        );
        registry
    }

    /// Register (or replace) an engine under `name`
    pub fn register(&mut self, name: impl Into<String>, constructor: EngineConstructor<T>) {
        let name = name.into().to_lowercase();
        if self.constructors.insert(name.clone(), constructor).is_some() {
            warn!(engine = %name, "replaced registered peak detector engine");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Construct the engine registered under `name`
    ///
    /// `"auto"` picks a backend with the default [`BackendConfig`].
    pub fn create(
        &self,
        name: &str,
        settings: EngineSettings,
    ) -> Result<Box<dyn PeakDetectorEngine<T>>> {
        if name.eq_ignore_ascii_case(BackendType::Auto.registry_name()) {
            return self.create_with_selection(settings, &BackendConfig::default());
        }

        let constructor = self
            .constructors
            .get(&name.to_lowercase())
            .ok_or_else(|| DetectorError::UnknownBackend(name.to_string()))?;
        constructor(settings)
    }

    /// Construct the engine [`select_backend`] picks for these settings
    ///
    /// Falls back to the serial CPU engine when the selected backend is not
    /// registered or fails to initialize.
    pub fn create_with_selection(
        &self,
        settings: EngineSettings,
        config: &BackendConfig,
    ) -> Result<Box<dyn PeakDetectorEngine<T>>> {
        let decision = select_backend(settings.channel_count, settings.chunk_size, config);
        let selected = decision.backend_type.registry_name();
        info!(
            backend = selected,
            reason = %decision.reason,
            "auto-selected peak detector backend"
        );

        let fallback = BackendType::CPU.registry_name();
        if selected != fallback {
            match self.constructors.get(selected) {
                Some(constructor) => match constructor(settings.clone()) {
                    Ok(engine) => return Ok(engine),
                    Err(e) => {
                        warn!(
                            backend = selected,
                            error = %e,
                            "backend failed to initialize, falling back to CPU"
                        );
                    }
                },
                None => {
                    warn!(
                        backend = selected,
                        "selected backend not registered, falling back to CPU"
                    );
                }
            }
        }

        self.create(fallback, settings)
    }
}

impl<T: SampleValue> Default for EngineRegistry<T> {
    fn default() -> Self {
        Self::with_cpu_engines()
    }
}

impl EngineRegistry<f32> {
    /// Every engine compiled into this build
    pub fn with_default_engines() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::with_cpu_engines();
        #[cfg(feature = "gpu")]
        registry.register(BackendType::WGPU.registry_name(), create_wgpu);
        registry
    }
}

impl EngineRegistry<f64> {
    /// Every engine compiled into this build (GPU engines are f32-only)
    pub fn with_default_engines() -> Self {
        Self::with_cpu_engines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::EngineState;
    use crate::types::linear_geometry;

    fn settings(channels: usize, chunk_size: usize) -> EngineSettings {
        EngineSettings::new(30_000.0, channels, chunk_size, linear_geometry(channels, 50.0))
    }

    #[test]
    fn test_cpu_engines_registered() {
        let registry = EngineRegistry::<f64>::with_cpu_engines();
        assert_eq!(registry.names(), vec!["cpu", "cpu-parallel"]);
        assert!(registry.contains("CPU"));
        assert!(!registry.contains("auto"));
    }

    #[test]
    fn test_create_by_name() {
        let registry = EngineRegistry::<f32>::with_default_engines();
        let engine = registry.create("cpu-parallel", settings(4, 256)).unwrap();
        assert!(engine.backend_name().starts_with("CPU (rayon"));
        assert_eq!(engine.state(), EngineState::Unconfigured);
    }

    #[test]
    fn test_unknown_name() {
        let registry = EngineRegistry::<f32>::with_cpu_engines();
        let err = registry.create("tpu", settings(4, 256)).err().unwrap();
        assert_eq!(err, DetectorError::UnknownBackend("tpu".to_string()));
    }

    #[test]
    fn test_auto_small_chunk_uses_serial_cpu() {
        let registry = EngineRegistry::<f64>::with_default_engines();
        let engine = registry.create("auto", settings(4, 256)).unwrap();
        assert_eq!(engine.backend_name(), "CPU (serial)");
    }

    #[test]
    fn test_auto_respects_thresholds() {
        let registry = EngineRegistry::<f64>::with_default_engines();
        let config = BackendConfig {
            parallel_workload_threshold: 1024,
            gpu_workload_threshold: usize::MAX,
            force_cpu: false,
        };
        let engine = registry
            .create_with_selection(settings(4, 256), &config)
            .unwrap();
        assert!(engine.backend_name().starts_with("CPU (rayon"));

        let forced = BackendConfig {
            force_cpu: true,
            ..config
        };
        let engine = registry
            .create_with_selection(settings(4, 256), &forced)
            .unwrap();
        assert_eq!(engine.backend_name(), "CPU (serial)");
    }

    #[test]
    fn test_auto_falls_back_when_selected_missing() {
        let mut registry = EngineRegistry::<f32>::new();
        registry.register("cpu", create_cpu::<f32>);
        let config = BackendConfig {
            parallel_workload_threshold: 1,
            ..BackendConfig::default()
        };
        let engine = registry
            .create_with_selection(settings(2, 16), &config)
            .unwrap();
        assert_eq!(engine.backend_name(), "CPU (serial)");
    }

    #[test]
    fn test_invalid_settings_rejected_by_constructor() {
        let registry = EngineRegistry::<f32>::with_cpu_engines();
        let bad = EngineSettings::new(30_000.0, 4, 0, linear_geometry(4, 50.0));
        let err = registry.create("cpu", bad).err().unwrap();
        assert!(matches!(err, DetectorError::Configuration(_)));
    }
}
