// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Offline Detection
//!
//! Whole-signal reference detector: one spatial matrix, one evidence pass,
//! one extraction pass. Streaming engines are checked against this.

use ndarray::{Array1, ArrayView2};
use tracing::debug;

use crate::error::{DetectorError, Result};
use crate::extract::find_local_maxima;
use crate::rectify::compute_rectified_sum;
use crate::spatial::{build_spatial_matrix, SparseWeights};
use crate::types::{PeakDetectionParams, SampleValue};

/// Result of an offline pass
#[derive(Debug, Clone)]
pub struct OfflineDetection<T> {
    /// Absolute sample indices, strictly increasing
    pub peaks: Vec<u64>,

    /// Evidence value of every sample (diagnostics)
    pub evidence: Array1<T>,

    /// Debounce half-window used
    pub n_span: usize,
}

/// Detect peaks in a complete (time x channel) signal
pub fn detect<T: SampleValue>(
    signal: ArrayView2<'_, T>,
    sample_rate: f64,
    geometry: ArrayView2<'_, f64>,
    params: &PeakDetectionParams,
) -> Result<OfflineDetection<T>> {
    params.validate()?;
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(DetectorError::Configuration(format!(
            "sample_rate must be > 0, got {}",
            sample_rate
        )));
    }
    if geometry.nrows() != signal.ncols() {
        return Err(DetectorError::Configuration(format!(
            "geometry has {} rows but signal has {} channels",
            geometry.nrows(),
            signal.ncols()
        )));
    }

    let n_span = params.n_span(sample_rate);
    let weights = build_spatial_matrix(geometry, params.adjacency_radius)?
        .map(|dense| SparseWeights::<T>::from_dense(&dense));

    let evidence = compute_rectified_sum(signal, params.peak_sign, weights.as_ref());
    let threshold = T::from_f64(params.relative_threshold);
    let peaks: Vec<u64> = match evidence.as_slice() {
        Some(values) => find_local_maxima(values, n_span, threshold),
        None => find_local_maxima(&evidence.to_vec(), n_span, threshold),
    }
    .into_iter()
    .map(|i| i as u64)
    .collect();

    debug!(
        samples = signal.nrows(),
        channels = signal.ncols(),
        n_span,
        peaks = peaks.len(),
        "offline detection complete"
    );

    Ok(OfflineDetection {
        peaks,
        evidence,
        n_span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{linear_geometry, PeakSign};
    use ndarray::Array2;

    #[test]
    fn test_single_negative_deflection() {
        let mut signal = Array2::<f32>::zeros((1000, 2));
        signal[[500, 0]] = -1.0;
        signal[[500, 1]] = -1.0;
        let geometry = linear_geometry(2, 50.0);
        let params = PeakDetectionParams::new(PeakSign::Negative, 0.5, 10.0);

        let result = detect(signal.view(), 1000.0, geometry.view(), &params).unwrap();
        assert_eq!(result.n_span, 5);
        assert_eq!(result.peaks, vec![500]);
        assert_eq!(result.evidence.len(), 1000);
        assert_eq!(result.evidence[500], 1.0);
    }

    #[test]
    fn test_wrong_sign_finds_nothing() {
        let mut signal = Array2::<f64>::zeros((200, 1));
        signal[[100, 0]] = -4.0;
        let geometry = linear_geometry(1, 50.0);
        let params = PeakDetectionParams::new(PeakSign::Positive, 1.0, 10.0);
        let result = detect(signal.view(), 1000.0, geometry.view(), &params).unwrap();
        assert!(result.peaks.is_empty());
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let signal = Array2::<f32>::zeros((100, 3));
        let geometry = linear_geometry(2, 50.0);
        let params = PeakDetectionParams::new(PeakSign::Negative, 0.5, 10.0);
        let err = detect(signal.view(), 1000.0, geometry.view(), &params).unwrap_err();
        assert!(matches!(err, DetectorError::Configuration(_)));
    }

    #[test]
    fn test_pooling_changes_evidence_not_location() {
        let mut signal = Array2::<f32>::zeros((400, 3));
        signal[[150, 1]] = -6.0;
        signal[[150, 0]] = -2.0;
        let geometry = linear_geometry(3, 50.0);
        let params =
            PeakDetectionParams::new(PeakSign::Negative, 5.0, 2.0).with_adjacency_radius(100.0);
        let pooled = detect(signal.view(), 10_000.0, geometry.view(), &params).unwrap();
        assert_eq!(pooled.peaks, vec![150]);
        assert!(pooled.evidence[150] > 6.0);
    }
}
