// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Debounced local-maximum extraction over an evidence signal.
//!
//! Key semantics:
//! - A sample is a peak when it reaches the threshold and dominates the closed
//!   window `[i - n_span, i + n_span]`.
//! - Left neighbours must be strictly smaller, right neighbours smaller or
//!   equal, so a plateau of equal maxima yields its leftmost sample only.
//! - Samples closer than `n_span` to either end are never evaluated.
//! - Accepted peaks are therefore more than `n_span` samples apart.

use crate::types::SampleValue;

/// Relative indices of debounced local maxima in `evidence`
pub fn find_local_maxima<T: SampleValue>(
    evidence: &[T],
    n_span: usize,
    threshold: T,
) -> Vec<usize> {
    let len = evidence.len();
    if len < 2 * n_span + 1 {
        return Vec::new();
    }

    let mut peaks = Vec::new();
    let mut i = n_span;
    while i < len - n_span {
        let v = evidence[i];
        if !(v >= threshold) {
            i += 1;
            continue;
        }

        let left_ok = evidence[i - n_span..i].iter().all(|&x| x < v);
        let right_ok = evidence[i + 1..=i + n_span].iter().all(|&x| x <= v);
        if left_ok && right_ok {
            peaks.push(i);
            // Samples inside the right window now have `v` on their left
            i += n_span + 1;
        } else {
            i += 1;
        }
    }

    peaks
}
