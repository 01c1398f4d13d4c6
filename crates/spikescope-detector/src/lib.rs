// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Spikescope Detector
//!
//! Spike peak detection on multi-channel, noise-normalized recordings.
//!
//! ## Pipeline
//! 1. Spatial weights from probe geometry (`exp(-d / radius)`, sparse)
//! 2. Rectified, pooled evidence per sample (max over channels)
//! 3. Debounced local maxima above threshold
//!
//! ## Streaming
//! [`StreamingDetector`] consumes fixed-size chunks and emits exactly the
//! peaks [`detect`] finds on the concatenated signal, whatever the chunk
//! size and whichever [`EvidenceBackend`] computes the evidence.
//!
//! ## Backends
//! - Serial CPU
//! - Rayon row-parallel CPU
//! - WGPU compute shader (`gpu` feature, f32 only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod error;
pub mod extract;
pub mod offline;
pub mod rectify;
pub mod registry;
pub mod spatial;
pub mod streaming;
pub mod types;

pub use backend::{
    is_gpu_available, select_backend, BackendConfig, BackendDecision, BackendType, CPUBackend,
    EvidenceBackend, ParallelCPUBackend,
};
#[cfg(feature = "gpu")]
pub use backend::WGPUBackend;
pub use error::{DetectorError, ErrorKind, Result};
pub use extract::find_local_maxima;
pub use offline::{detect, OfflineDetection};
pub use rectify::{compute_rectified_sum, compute_rectified_sum_parallel};
pub use registry::{EngineConstructor, EngineRegistry};
pub use spatial::{build_spatial_matrix, SparseWeights, WEIGHT_CUTOFF};
pub use streaming::{
    ChunkPeaks, EngineState, EngineStats, PeakDetectorEngine, ProcessTiming, StreamingDetector,
};
pub use types::{linear_geometry, EngineSettings, PeakDetectionParams, PeakSign, SampleValue};
