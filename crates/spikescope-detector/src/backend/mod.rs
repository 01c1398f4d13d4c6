// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Backend Abstraction
//!
//! Provides a unified interface for the evidence workload (rectify, pool,
//! max over channels) on different compute backends (CPU, GPU).
//! The streaming state machine stays the same whichever backend runs it.

mod cpu;
mod parallel;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CPUBackend;
pub use parallel::ParallelCPUBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WGPUBackend;

use ndarray::ArrayView2;
#[cfg(feature = "gpu")]
use tracing::warn;

use crate::error::{DetectorError, Result};
use crate::spatial::SparseWeights;
use crate::types::{PeakSign, SampleValue};

/// Evidence backend trait - abstracts CPU vs GPU execution of the
/// rectified-sum workload
///
/// Implementations must return exactly one evidence value per chunk row and
/// must not carry row-to-row state.
pub trait EvidenceBackend<T: SampleValue>: Send {
    /// Get backend type name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Called on every reconfiguration, before any chunk is computed
    ///
    /// GPU backends upload the weights and allocate chunk-sized buffers here.
    /// For CPU backends, this is a no-op.
    fn prepare(
        &mut self,
        _channel_count: usize,
        _chunk_size: usize,
        _weights: Option<&SparseWeights<T>>,
    ) -> Result<()> {
        Ok(())
    }

    /// Compute one evidence value per row of `chunk` (time x channel)
    fn compute_evidence(
        &mut self,
        chunk: ArrayView2<'_, T>,
        sign: PeakSign,
        weights: Option<&SparseWeights<T>>,
    ) -> Result<Vec<T>>;
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Serial CPU kernel
    CPU,

    /// Rayon row-parallel CPU kernel
    CPUParallel,

    /// GPU via WGPU (Metal/Vulkan/DirectX - cross-platform)
    #[cfg(feature = "gpu")]
    WGPU,

    /// Auto-select based on per-chunk workload and hardware availability
    Auto,
}

impl Default for BackendType {
    fn default() -> Self {
        Self::Auto
    }
}

impl BackendType {
    /// Name under which the backend is registered
    pub fn registry_name(&self) -> &'static str {
        match self {
            BackendType::CPU => "cpu",
            BackendType::CPUParallel => "cpu-parallel",
            #[cfg(feature = "gpu")]
            BackendType::WGPU => "wgpu",
            BackendType::Auto => "auto",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.registry_name())
    }
}

impl std::str::FromStr for BackendType {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(BackendType::CPU),
            "cpu-parallel" | "parallel" => Ok(BackendType::CPUParallel),
            #[cfg(feature = "gpu")]
            "wgpu" | "gpu" => Ok(BackendType::WGPU),
            "auto" => Ok(BackendType::Auto),
            _ => Err(DetectorError::UnknownBackend(s.to_string())),
        }
    }
}

/// Configuration for backend auto-selection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Minimum samples x channels per chunk to go row-parallel (default: 65,536)
    pub parallel_workload_threshold: usize,

    /// Minimum samples x channels per chunk to consider WGPU (default: 4,194,304)
    pub gpu_workload_threshold: usize,

    /// Force serial CPU even if another backend would be beneficial
    pub force_cpu: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            // 1024-sample chunks x 64 channels
            parallel_workload_threshold: 65_536,

            // Upload/readback only pays off for very wide or very long chunks
            gpu_workload_threshold: 4_194_304,

            force_cpu: false,
        }
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
}

/// Auto-select a backend for a chunk of `chunk_size` rows x `channel_count` columns
///
/// Selection priority:
/// 1. Honor `force_cpu`
/// 2. Try WGPU (if compiled in, available, and the chunk is large enough)
/// 3. Row-parallel CPU for medium chunks
/// 4. Fall back to serial CPU
pub fn select_backend(
    channel_count: usize,
    chunk_size: usize,
    config: &BackendConfig,
) -> BackendDecision {
    if config.force_cpu {
        return BackendDecision {
            backend_type: BackendType::CPU,
            reason: "Forced CPU via configuration".to_string(),
        };
    }

    let workload = channel_count.saturating_mul(chunk_size);

    #[cfg(feature = "gpu")]
    if workload >= config.gpu_workload_threshold {
        if is_gpu_available() {
            return BackendDecision {
                backend_type: BackendType::WGPU,
                reason: format!(
                    "Large chunk workload ({} samples x channels) and GPU available",
                    workload
                ),
            };
        }
        warn!("GPU workload threshold reached but no WGPU adapter found, staying on CPU");
    }

    if workload >= config.parallel_workload_threshold {
        BackendDecision {
            backend_type: BackendType::CPUParallel,
            reason: format!(
                "CPU parallel selected: chunk workload {} >= {}",
                workload, config.parallel_workload_threshold
            ),
        }
    } else {
        BackendDecision {
            backend_type: BackendType::CPU,
            reason: format!(
                "CPU selected: chunk workload {} below parallel threshold {}",
                workload, config.parallel_workload_threshold
            ),
        }
    }
}

/// Check whether a WGPU adapter can be acquired
#[cfg(feature = "gpu")]
pub fn is_gpu_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Check whether a WGPU adapter can be acquired (GPU support not compiled in)
#[cfg(not(feature = "gpu"))]
pub fn is_gpu_available() -> bool {
    false
}
