// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Spatial Weighting
//!
//! Pairwise channel weights derived from probe geometry:
//! `w = exp(-d / radius)` with entries below [`WEIGHT_CUTOFF`] forced to zero.
//!
//! The dense matrix is the public contract; every backend consumes the
//! column-compressed [`SparseWeights`] built from it.

use ndarray::{Array2, ArrayView2};

use crate::error::{DetectorError, Result};
use crate::types::SampleValue;

/// Weights below this value contribute nothing
pub const WEIGHT_CUTOFF: f64 = 0.01;

/// Build the dense spatial weight matrix for `geometry` (channels x coords)
///
/// Returns `Ok(None)` when `radius` is `None` (no pooling).
pub fn build_spatial_matrix(
    geometry: ArrayView2<'_, f64>,
    radius: Option<f64>,
) -> Result<Option<Array2<f64>>> {
    let channel_count = geometry.nrows();
    if channel_count == 0 {
        return Err(DetectorError::config("geometry must contain at least one channel"));
    }
    if geometry.iter().any(|c| !c.is_finite()) {
        return Err(DetectorError::config("geometry coordinates must be finite"));
    }

    let radius = match radius {
        None => return Ok(None),
        Some(r) if r.is_finite() && r > 0.0 => r,
        Some(r) => {
            return Err(DetectorError::config(format!(
                "adjacency_radius must be > 0, got {}",
                r
            )))
        }
    };

    let mut matrix = Array2::<f64>::zeros((channel_count, channel_count));
    for i in 0..channel_count {
        matrix[[i, i]] = 1.0;
        for j in (i + 1)..channel_count {
            let d = geometry
                .row(i)
                .iter()
                .zip(geometry.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            let mut w = (-d / radius).exp();
            if w < WEIGHT_CUTOFF {
                w = 0.0;
            }
            matrix[[i, j]] = w;
            matrix[[j, i]] = w;
        }
    }

    Ok(Some(matrix))
}

/// Column-compressed weight matrix
///
/// For output channel `j`, `sources[offsets[j]..offsets[j + 1]]` lists the
/// contributing channels in ascending order and `values` their weights.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseWeights<T> {
    channel_count: usize,
    offsets: Vec<usize>,
    sources: Vec<usize>,
    values: Vec<T>,
}

impl<T: SampleValue> SparseWeights<T> {
    /// Keep only the non-zero entries of `dense`
    ///
    /// `dense[[i, j]]` is the weight of source `i` into output `j`.
    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let channel_count = dense.ncols();
        let mut offsets = Vec::with_capacity(channel_count + 1);
        let mut sources = Vec::new();
        let mut values = Vec::new();

        offsets.push(0);
        for j in 0..channel_count {
            for i in 0..dense.nrows() {
                let w = dense[[i, j]];
                if w != 0.0 {
                    sources.push(i);
                    values.push(T::from_f64(w));
                }
            }
            offsets.push(sources.len());
        }

        Self {
            channel_count,
            offsets,
            sources,
            values,
        }
    }

    /// One unit weight per channel; pooling with it leaves values unchanged
    pub fn identity(channel_count: usize) -> Self {
        Self {
            channel_count,
            offsets: (0..=channel_count).collect(),
            sources: (0..channel_count).collect(),
            values: vec![T::one(); channel_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of stored (non-zero) weights
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `(source channel, weight)` pairs feeding output channel `j`
    #[inline]
    pub fn column(&self, j: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.offsets[j]..self.offsets[j + 1];
        self.sources[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}
