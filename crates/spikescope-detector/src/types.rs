// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core detection types: sample values, peak sign, detection parameters and
//! engine construction settings.

use std::fmt;
use std::ops::{Add, Mul, Neg};
use std::str::FromStr;

use ndarray::Array2;

use crate::error::{DetectorError, Result};

/// Numeric type of the normalized signal (`value_type` at construction)
///
/// All evidence arithmetic runs in this type, so chunked and whole-signal
/// passes over the same rows produce identical bits.
pub trait SampleValue:
    Copy
    + Send
    + Sync
    + fmt::Debug
    + PartialOrd
    + Add<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_f64(value: f64) -> Self;
}

impl SampleValue for f32 {
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl SampleValue for f64 {
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }

    #[inline(always)]
    fn one() -> Self {
        1.0
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Direction of the excursion that counts as an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeakSign {
    /// Positive deflections (`'+'`)
    Positive,
    /// Negative deflections (`'-'`)
    Negative,
}

impl PeakSign {
    /// Rectify one sample: `max(0, x)` for `'+'`, `max(0, -x)` for `'-'`
    #[inline(always)]
    pub fn rectify<T: SampleValue>(self, x: T) -> T {
        let v = match self {
            PeakSign::Positive => x,
            PeakSign::Negative => -x,
        };
        if v > T::zero() {
            v
        } else {
            T::zero()
        }
    }

    /// Multiplier applied before clamping (used by the GPU kernel)
    pub fn factor(self) -> f32 {
        match self {
            PeakSign::Positive => 1.0,
            PeakSign::Negative => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeakSign::Positive => "+",
            PeakSign::Negative => "-",
        }
    }
}

impl fmt::Display for PeakSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeakSign {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "+" => Ok(PeakSign::Positive),
            "-" => Ok(PeakSign::Negative),
            other => Err(DetectorError::config(format!(
                "peak_sign must be '+' or '-', got '{}'",
                other
            ))),
        }
    }
}

/// Parameters accepted by `change_params` and the offline detector
#[derive(Debug, Clone, PartialEq)]
pub struct PeakDetectionParams {
    pub peak_sign: PeakSign,

    /// Threshold in units of the normalized signal (noise SD)
    pub relative_threshold: f64,

    /// Full debounce span in milliseconds
    pub peak_span_ms: f64,

    /// Spatial pooling radius in geometry units; `None` disables pooling
    pub adjacency_radius: Option<f64>,
}

impl PeakDetectionParams {
    pub fn new(peak_sign: PeakSign, relative_threshold: f64, peak_span_ms: f64) -> Self {
        Self {
            peak_sign,
            relative_threshold,
            peak_span_ms,
            adjacency_radius: None,
        }
    }

    pub fn with_adjacency_radius(mut self, radius: f64) -> Self {
        self.adjacency_radius = Some(radius);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.relative_threshold.is_finite() && self.relative_threshold > 0.0) {
            return Err(DetectorError::config(format!(
                "relative_threshold must be > 0, got {}",
                self.relative_threshold
            )));
        }
        if !(self.peak_span_ms.is_finite() && self.peak_span_ms > 0.0) {
            return Err(DetectorError::config(format!(
                "peak_span_ms must be > 0, got {}",
                self.peak_span_ms
            )));
        }
        if let Some(radius) = self.adjacency_radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(DetectorError::config(format!(
                    "adjacency_radius must be > 0, got {}",
                    radius
                )));
            }
        }
        Ok(())
    }

    /// Debounce half-window in samples: `floor(sample_rate * span_ms / 1000) / 2`
    pub fn n_span(&self, sample_rate: f64) -> usize {
        ((sample_rate * self.peak_span_ms / 1000.0).floor() as usize) / 2
    }
}

/// Construction-time settings of a streaming engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub sample_rate: f64,
    pub channel_count: usize,
    pub chunk_size: usize,

    /// One row of coordinates per channel
    pub geometry: Array2<f64>,
}

impl EngineSettings {
    pub fn new(
        sample_rate: f64,
        channel_count: usize,
        chunk_size: usize,
        geometry: Array2<f64>,
    ) -> Self {
        Self {
            sample_rate,
            channel_count,
            chunk_size,
            geometry,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DetectorError::config(format!(
                "sample_rate must be > 0, got {}",
                self.sample_rate
            )));
        }
        if self.channel_count == 0 {
            return Err(DetectorError::config("channel_count must be >= 1"));
        }
        if self.chunk_size == 0 {
            return Err(DetectorError::config("chunk_size must be >= 1"));
        }
        if self.geometry.nrows() != self.channel_count {
            return Err(DetectorError::config(format!(
                "geometry has {} rows but channel_count is {}",
                self.geometry.nrows(),
                self.channel_count
            )));
        }
        Ok(())
    }
}

/// Channels laid out on a line with constant spacing (2-D, `y = 0`)
pub fn linear_geometry(channel_count: usize, spacing: f64) -> Array2<f64> {
    Array2::from_shape_fn((channel_count, 2), |(ch, axis)| {
        if axis == 0 {
            ch as f64 * spacing
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_span_rounding() {
        let params = PeakDetectionParams::new(PeakSign::Negative, 0.5, 10.0);
        assert_eq!(params.n_span(1000.0), 5);

        // 30 kHz, 0.9 ms -> 27 samples -> 13
        let params = PeakDetectionParams::new(PeakSign::Negative, 8.0, 0.9);
        assert_eq!(params.n_span(30_000.0), 13);

        // Span shorter than two samples collapses to zero
        let params = PeakDetectionParams::new(PeakSign::Positive, 5.0, 0.01);
        assert_eq!(params.n_span(1000.0), 0);
    }

    #[test]
    fn test_peak_sign_parse() {
        assert_eq!("+".parse::<PeakSign>().unwrap(), PeakSign::Positive);
        assert_eq!("-".parse::<PeakSign>().unwrap(), PeakSign::Negative);
        let err = "both".parse::<PeakSign>().unwrap_err();
        assert!(matches!(err, DetectorError::Configuration(_)));
    }

    #[test]
    fn test_rectify() {
        assert_eq!(PeakSign::Negative.rectify(-2.5f32), 2.5);
        assert_eq!(PeakSign::Negative.rectify(1.0f32), 0.0);
        assert_eq!(PeakSign::Positive.rectify(3.0f64), 3.0);
        assert_eq!(PeakSign::Positive.rectify(-3.0f64), 0.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(PeakDetectionParams::new(PeakSign::Negative, 5.0, 0.5)
            .validate()
            .is_ok());
        assert!(PeakDetectionParams::new(PeakSign::Negative, 0.0, 0.5)
            .validate()
            .is_err());
        assert!(PeakDetectionParams::new(PeakSign::Negative, 5.0, -1.0)
            .validate()
            .is_err());
        assert!(PeakDetectionParams::new(PeakSign::Negative, 5.0, 0.5)
            .with_adjacency_radius(-100.0)
            .validate()
            .is_err());
        assert!(PeakDetectionParams::new(PeakSign::Negative, f64::NAN, 0.5)
            .validate()
            .is_err());
    }

    #[test]
    fn test_settings_validation() {
        let ok = EngineSettings::new(1000.0, 4, 256, linear_geometry(4, 50.0));
        assert!(ok.validate().is_ok());

        let mismatch = EngineSettings::new(1000.0, 4, 256, linear_geometry(3, 50.0));
        assert!(mismatch.validate().is_err());

        let no_channels = EngineSettings::new(1000.0, 0, 256, linear_geometry(0, 50.0));
        assert!(no_channels.validate().is_err());

        let no_chunk = EngineSettings::new(1000.0, 4, 0, linear_geometry(4, 50.0));
        assert!(no_chunk.validate().is_err());

        let bad_rate = EngineSettings::new(0.0, 4, 256, linear_geometry(4, 50.0));
        assert!(bad_rate.validate().is_err());
    }

    #[test]
    fn test_linear_geometry() {
        let geometry = linear_geometry(3, 50.0);
        assert_eq!(geometry.shape(), &[3, 2]);
        assert_eq!(geometry[[2, 0]], 100.0);
        assert_eq!(geometry[[2, 1]], 0.0);
    }
}
