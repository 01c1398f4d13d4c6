// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # CPU Backend
//!
//! Serial backend wrapping the shared row kernel in `rectify`.
//! This is the reference every other backend is compared against.

use ndarray::ArrayView2;

use super::EvidenceBackend;
use crate::error::Result;
use crate::rectify::compute_rectified_sum;
use crate::spatial::SparseWeights;
use crate::types::{PeakSign, SampleValue};

/// Serial CPU backend
pub struct CPUBackend {
    /// Backend name for logging
    name: String,
}

impl CPUBackend {
    pub fn new() -> Self {
        Self {
            name: "CPU (serial)".to_string(),
        }
    }
}

impl Default for CPUBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SampleValue> EvidenceBackend<T> for CPUBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn compute_evidence(
        &mut self,
        chunk: ArrayView2<'_, T>,
        sign: PeakSign,
        weights: Option<&SparseWeights<T>>,
    ) -> Result<Vec<T>> {
        Ok(compute_rectified_sum(chunk, sign, weights).to_vec())
    }
}
