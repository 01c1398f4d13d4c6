// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Streaming Detection
//!
//! Chunk-by-chunk peak detection whose output equals the offline detector's.
//!
//! Key semantics:
//! - The engine keeps the last `2 * n_span` evidence samples between calls:
//!   `n_span` held-back samples that still lack right context, plus `n_span`
//!   of left context for them.
//! - Each call evaluates exactly the centres that became decidable, so every
//!   absolute index in `[origin + n_span, end - n_span)` is tested once.
//! - The first chunk after `change_params` fixes the stream origin; later
//!   chunks must be contiguous. A gap or overlap faults the engine for good.
//! - Shape errors are rejected before any state is touched.

use std::time::Instant;

use ndarray::ArrayView2;
use tracing::{debug, error, info, trace};

use crate::backend::EvidenceBackend;
use crate::error::{DetectorError, Result};
use crate::extract::find_local_maxima;
use crate::spatial::{build_spatial_matrix, SparseWeights};
use crate::types::{EngineSettings, PeakDetectionParams, SampleValue};

/// Peaks emitted by one `process_data` call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkPeaks {
    /// Number of new peaks
    pub count: usize,

    /// Absolute sample indices, or `None` when nothing was emitted
    pub indices: Option<Vec<u64>>,
}

impl ChunkPeaks {
    fn from_indices(indices: Vec<u64>) -> Self {
        if indices.is_empty() {
            Self::default()
        } else {
            Self {
                count: indices.len(),
                indices: Some(indices),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Indices as a (possibly empty) vector
    pub fn into_vec(self) -> Vec<u64> {
        self.indices.unwrap_or_default()
    }
}

/// Timing breakdown of the last `process_data` call
#[derive(Debug, Clone, Default)]
pub struct ProcessTiming {
    /// Time spent in the evidence backend (μs)
    pub evidence_us: f64,

    /// Time spent extracting local maxima (μs)
    pub extraction_us: f64,

    /// Total call time (μs)
    pub total_us: f64,
}

/// Running counters of a streaming engine
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub chunks_processed: u64,
    pub samples_processed: u64,
    pub peaks_emitted: u64,
    pub last_timing: ProcessTiming,
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, waiting for `change_params`
    Unconfigured,
    /// Accepting chunks
    Ready,
    /// Broken by a sequence error; only a new engine can continue
    Faulted,
}

/// Common interface of every registered streaming engine
pub trait PeakDetectorEngine<T: SampleValue>: Send {
    /// Backend name for logging/debugging
    fn backend_name(&self) -> &str;

    fn settings(&self) -> &EngineSettings;

    /// Active parameters, `None` until configured
    fn params(&self) -> Option<&PeakDetectionParams>;

    fn state(&self) -> EngineState;

    /// (Re)configure; drops all retained stream state
    fn change_params(&mut self, params: PeakDetectionParams) -> Result<()>;

    /// Feed one chunk ending at absolute position `chunk_end` (exclusive)
    fn process_data(&mut self, chunk_end: u64, chunk: ArrayView2<'_, T>) -> Result<ChunkPeaks>;

    fn stats(&self) -> &EngineStats;
}

/// Everything derived from one `change_params` call
struct ActiveConfig<T> {
    params: PeakDetectionParams,
    n_span: usize,
    threshold: T,
    weights: Option<SparseWeights<T>>,
}

/// Cross-chunk state: trailing evidence and stream position
struct StreamState<T> {
    /// Last `<= 2 * n_span` evidence samples
    trailing: Vec<T>,

    /// Absolute end of the last accepted chunk; `None` before the first chunk
    position: Option<u64>,

    /// Last emitted index, guards monotonicity
    last_peak: Option<u64>,
}

impl<T> StreamState<T> {
    fn new() -> Self {
        Self {
            trailing: Vec::new(),
            position: None,
            last_peak: None,
        }
    }
}

/// Streaming engine: the chunk state machine over an [`EvidenceBackend`]
pub struct StreamingDetector<T: SampleValue, B: EvidenceBackend<T>> {
    settings: EngineSettings,
    backend: B,
    config: Option<ActiveConfig<T>>,
    stream: StreamState<T>,
    state: EngineState,
    stats: EngineStats,
}

impl<T: SampleValue, B: EvidenceBackend<T>> StreamingDetector<T, B> {
    /// Create an unconfigured engine
    pub fn new(settings: EngineSettings, backend: B) -> Result<Self> {
        settings.validate()?;
        // Geometry is checked once here so change_params only fails on parameters
        build_spatial_matrix(settings.geometry.view(), None)?;

        info!(
            backend = backend.backend_name(),
            channels = settings.channel_count,
            chunk_size = settings.chunk_size,
            sample_rate = settings.sample_rate,
            "streaming peak detector created"
        );

        Ok(Self {
            settings,
            backend,
            config: None,
            stream: StreamState::new(),
            state: EngineState::Unconfigured,
            stats: EngineStats::default(),
        })
    }

    /// Debounce half-window of the active configuration
    pub fn n_span(&self) -> Option<usize> {
        self.config.as_ref().map(|c| c.n_span)
    }

    fn check_shape(&self, chunk: &ArrayView2<'_, T>) -> Result<()> {
        let (rows, cols) = chunk.dim();
        if rows != self.settings.chunk_size || cols != self.settings.channel_count {
            return Err(DetectorError::Shape {
                expected_rows: self.settings.chunk_size,
                expected_cols: self.settings.channel_count,
                rows,
                cols,
            });
        }
        Ok(())
    }

    /// Position check; moves the engine to `Faulted` on a broken sequence
    fn check_sequence(&mut self, chunk_end: u64, chunk_len: u64) -> Result<u64> {
        let chunk_start = match self.stream.position {
            Some(previous) => {
                let expected = previous + chunk_len;
                if chunk_end != expected {
                    self.state = EngineState::Faulted;
                    error!(
                        expected,
                        actual = chunk_end,
                        "non-contiguous chunk, streaming session faulted"
                    );
                    return Err(DetectorError::Sequence {
                        expected,
                        actual: chunk_end,
                    });
                }
                previous
            }
            None => match chunk_end.checked_sub(chunk_len) {
                Some(start) => start,
                None => {
                    self.state = EngineState::Faulted;
                    error!(
                        chunk_end,
                        chunk_len,
                        "first chunk starts before sample zero, streaming session faulted"
                    );
                    return Err(DetectorError::Sequence {
                        expected: chunk_len,
                        actual: chunk_end,
                    });
                }
            },
        };
        Ok(chunk_start)
    }
}

impl<T: SampleValue, B: EvidenceBackend<T>> PeakDetectorEngine<T> for StreamingDetector<T, B> {
    fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn params(&self) -> Option<&PeakDetectionParams> {
        self.config.as_ref().map(|c| &c.params)
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn change_params(&mut self, params: PeakDetectionParams) -> Result<()> {
        if self.state == EngineState::Faulted {
            return Err(DetectorError::StreamFaulted);
        }
        params.validate()?;

        let n_span = params.n_span(self.settings.sample_rate);
        let weights = build_spatial_matrix(self.settings.geometry.view(), params.adjacency_radius)?
            .map(|dense| SparseWeights::<T>::from_dense(&dense));
        self.backend.prepare(
            self.settings.channel_count,
            self.settings.chunk_size,
            weights.as_ref(),
        )?;

        info!(
            backend = self.backend.backend_name(),
            peak_sign = %params.peak_sign,
            relative_threshold = params.relative_threshold,
            n_span,
            pooled = weights.is_some(),
            nnz = weights.as_ref().map(|w| w.nnz()).unwrap_or(0),
            "peak detector configured"
        );

        self.config = Some(ActiveConfig {
            threshold: T::from_f64(params.relative_threshold),
            params,
            n_span,
            weights,
        });
        self.stream = StreamState::new();
        self.stream.trailing.reserve(2 * n_span + self.settings.chunk_size);
        self.state = EngineState::Ready;
        Ok(())
    }

    fn process_data(&mut self, chunk_end: u64, chunk: ArrayView2<'_, T>) -> Result<ChunkPeaks> {
        match self.state {
            EngineState::Unconfigured => return Err(DetectorError::NotConfigured),
            EngineState::Faulted => return Err(DetectorError::StreamFaulted),
            EngineState::Ready => {}
        }
        self.check_shape(&chunk)?;
        let chunk_len = chunk.nrows() as u64;
        let chunk_start = self.check_sequence(chunk_end, chunk_len)?;

        let config = self.config.as_ref().ok_or(DetectorError::NotConfigured)?;

        let start = Instant::now();
        let evidence = self
            .backend
            .compute_evidence(chunk, config.params.peak_sign, config.weights.as_ref())?;
        if evidence.len() != chunk.nrows() {
            return Err(DetectorError::Backend(format!(
                "{} returned {} evidence values for {} rows",
                self.backend.backend_name(),
                evidence.len(),
                chunk.nrows()
            )));
        }
        let evidence_us = start.elapsed().as_micros() as f64;

        // Window = retained tail followed by the new evidence
        let extraction_start = Instant::now();
        let window_origin = chunk_start - self.stream.trailing.len() as u64;
        let mut window = std::mem::take(&mut self.stream.trailing);
        window.extend_from_slice(&evidence);

        let last_peak = self.stream.last_peak;
        let peaks: Vec<u64> = find_local_maxima(&window, config.n_span, config.threshold)
            .into_iter()
            .map(|i| window_origin + i as u64)
            .filter(|&p| last_peak.map_or(true, |last| p > last))
            .collect();

        let keep = (2 * config.n_span).min(window.len());
        window.drain(..window.len() - keep);
        self.stream.trailing = window;
        self.stream.position = Some(chunk_end);
        if let Some(&last) = peaks.last() {
            self.stream.last_peak = Some(last);
        }
        let extraction_us = extraction_start.elapsed().as_micros() as f64;

        self.stats.chunks_processed += 1;
        self.stats.samples_processed += chunk_len;
        self.stats.peaks_emitted += peaks.len() as u64;
        self.stats.last_timing = ProcessTiming {
            evidence_us,
            extraction_us,
            total_us: start.elapsed().as_micros() as f64,
        };

        if peaks.is_empty() {
            trace!(chunk_end, "no peaks in chunk");
        } else {
            debug!(chunk_end, n_peaks = peaks.len(), "peaks detected");
        }

        Ok(ChunkPeaks::from_indices(peaks))
    }

    fn stats(&self) -> &EngineStats {
        &self.stats
    }
}
