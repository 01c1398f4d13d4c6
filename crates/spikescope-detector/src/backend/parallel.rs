// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Parallel CPU Backend
//!
//! Row-parallel evidence computation on the rayon thread pool. Uses the same
//! row kernel as [`super::CPUBackend`], so results match it bit-for-bit.

use ndarray::ArrayView2;

use super::EvidenceBackend;
use crate::error::Result;
use crate::rectify::compute_rectified_sum_parallel;
use crate::spatial::SparseWeights;
use crate::types::{PeakSign, SampleValue};

/// Rayon-backed CPU backend
pub struct ParallelCPUBackend {
    name: String,
}

impl ParallelCPUBackend {
    pub fn new() -> Self {
        Self {
            name: format!("CPU (rayon x{})", rayon::current_num_threads()),
        }
    }
}

impl Default for ParallelCPUBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SampleValue> EvidenceBackend<T> for ParallelCPUBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn compute_evidence(
        &mut self,
        chunk: ArrayView2<'_, T>,
        sign: PeakSign,
        weights: Option<&SparseWeights<T>>,
    ) -> Result<Vec<T>> {
        Ok(compute_rectified_sum_parallel(chunk, sign, weights).to_vec())
    }
}
