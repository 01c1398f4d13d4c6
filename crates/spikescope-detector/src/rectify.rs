// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Rectified Sum
//!
//! Collapses a (time x channel) block of normalized samples into one evidence
//! value per row: rectify per [`PeakSign`], pool each channel with its spatial
//! neighbours, then take the maximum over channels.
//!
//! Rows are independent and every row goes through [`row_evidence`] with a
//! fixed accumulation order, so the serial path, the rayon path and any
//! split of the signal into contiguous sub-ranges agree bit-for-bit.

use ndarray::parallel::prelude::*;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::spatial::SparseWeights;
use crate::types::{PeakSign, SampleValue};

/// Evidence value of a single time row
///
/// `scratch` holds the rectified row and is reused across calls.
#[inline]
pub fn row_evidence<T: SampleValue>(
    row: ArrayView1<'_, T>,
    sign: PeakSign,
    weights: Option<&SparseWeights<T>>,
    scratch: &mut Vec<T>,
) -> T {
    let mut best = T::zero();
    match weights {
        None => {
            for &x in row.iter() {
                let r = sign.rectify(x);
                if r > best {
                    best = r;
                }
            }
        }
        Some(weights) => {
            scratch.clear();
            scratch.extend(row.iter().map(|&x| sign.rectify(x)));
            for j in 0..weights.channel_count() {
                let mut acc = T::zero();
                for (i, w) in weights.column(j) {
                    acc = acc + scratch[i] * w;
                }
                if acc > best {
                    best = acc;
                }
            }
        }
    }
    best
}

/// Serial evidence computation over every row of `signal`
pub fn compute_rectified_sum<T: SampleValue>(
    signal: ArrayView2<'_, T>,
    sign: PeakSign,
    weights: Option<&SparseWeights<T>>,
) -> Array1<T> {
    let mut scratch = Vec::with_capacity(signal.ncols());
    signal
        .axis_iter(Axis(0))
        .map(|row| row_evidence(row, sign, weights, &mut scratch))
        .collect()
}

/// Rayon evidence computation; identical output to [`compute_rectified_sum`]
pub fn compute_rectified_sum_parallel<T: SampleValue>(
    signal: ArrayView2<'_, T>,
    sign: PeakSign,
    weights: Option<&SparseWeights<T>>,
) -> Array1<T> {
    let channel_count = signal.ncols();
    let values: Vec<T> = signal
        .axis_iter(Axis(0))
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(channel_count),
            |scratch, row| row_evidence(row, sign, weights, scratch),
        )
        .collect();
    Array1::from(values)
}
