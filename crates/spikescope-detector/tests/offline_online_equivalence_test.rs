// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Offline vs streaming equivalence
//!
//! Noise plus injected spikes, fed through every CPU engine at several chunk
//! sizes, both peak signs, with and without spatial pooling. The streamed peak
//! list must equal the offline one over the consumed samples.

use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spikescope_detector::*;

const SAMPLE_RATE: f64 = 10_000.0;
const CHANNELS: usize = 10;

/// Approximately unit-variance noise with sparse multichannel spikes
fn synthetic_recording(len: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut signal = Array2::from_shape_fn((len, CHANNELS), |_| {
        // Irwin-Hall(12) - 6 is close to N(0, 1)
        (0..12).map(|_| rng.gen::<f32>()).sum::<f32>() - 6.0
    });

    let n_spikes = len / 400;
    for _ in 0..n_spikes {
        let t = rng.gen_range(20..len - 20);
        let centre = rng.gen_range(0..CHANNELS);
        let amplitude: f32 = rng.gen_range(6.0..15.0);
        let sign = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
        for ch in 0..CHANNELS {
            let falloff = 1.0 / (1.0 + (ch as f32 - centre as f32).abs());
            signal[[t, ch]] += sign * amplitude * falloff;
            signal[[t + 1, ch]] += sign * 0.5 * amplitude * falloff;
        }
    }
    signal
}

fn stream_all(
    engine: &mut dyn PeakDetectorEngine<f32>,
    signal: &Array2<f32>,
    chunk_size: usize,
) -> Vec<u64> {
    let n_chunks = signal.nrows() / chunk_size;
    let mut peaks = Vec::new();
    for i in 0..n_chunks {
        let end = (i + 1) * chunk_size;
        let chunk = signal.slice(s![end - chunk_size..end, ..]);
        let found = engine.process_data(end as u64, chunk).unwrap();
        assert_eq!(found.count, found.indices.as_ref().map_or(0, |v| v.len()));
        peaks.extend(found.into_vec());
    }
    peaks
}

fn all_params() -> Vec<PeakDetectionParams> {
    let mut out = Vec::new();
    for sign in [PeakSign::Negative, PeakSign::Positive] {
        let base = PeakDetectionParams::new(sign, 5.0, 0.5);
        out.push(base.clone());
        out.push(base.with_adjacency_radius(100.0));
    }
    out
}

#[test]
fn test_streaming_matches_offline_all_engines() {
    let geometry = linear_geometry(CHANNELS, 50.0);
    let registry = EngineRegistry::<f32>::with_cpu_engines();
    let signal = synthetic_recording(30 * 1024, 7);

    for params in all_params() {
        for chunk_size in [1024usize, 333, 64, 7] {
            let consumed = (signal.nrows() / chunk_size) * chunk_size;
            let offline = detect(
                signal.slice(s![..consumed, ..]),
                SAMPLE_RATE,
                geometry.view(),
                &params,
            )
            .unwrap();
            assert!(!offline.peaks.is_empty(), "recording must contain spikes");

            for name in registry.names() {
                let settings =
                    EngineSettings::new(SAMPLE_RATE, CHANNELS, chunk_size, geometry.clone());
                let mut engine = registry.create(name, settings).unwrap();
                engine.change_params(params.clone()).unwrap();
                let online = stream_all(engine.as_mut(), &signal, chunk_size);

                assert_eq!(
                    online, offline.peaks,
                    "engine={} chunk={} params={:?}",
                    name, chunk_size, params
                );
            }
        }
    }
}

#[test]
fn test_streamed_peaks_are_increasing_and_debounced() {
    let geometry = linear_geometry(CHANNELS, 50.0);
    let signal = synthetic_recording(16 * 1024, 11);
    let params = PeakDetectionParams::new(PeakSign::Negative, 4.0, 1.0);
    let n_span = params.n_span(SAMPLE_RATE) as u64;

    let settings = EngineSettings::new(SAMPLE_RATE, CHANNELS, 256, geometry);
    let mut engine = StreamingDetector::new(settings, CPUBackend::new()).unwrap();
    engine.change_params(params).unwrap();
    let peaks = stream_all(&mut engine, &signal, 256);

    for pair in peaks.windows(2) {
        assert!(pair[1] > pair[0] + n_span, "{:?}", pair);
    }
}

#[test]
fn test_f64_streaming_matches_offline() {
    let geometry = linear_geometry(CHANNELS, 50.0);
    let signal = synthetic_recording(8 * 1000, 3).mapv(f64::from);
    let params =
        PeakDetectionParams::new(PeakSign::Positive, 5.0, 0.5).with_adjacency_radius(100.0);
    let offline = detect(signal.view(), SAMPLE_RATE, geometry.view(), &params).unwrap();

    let registry = EngineRegistry::<f64>::with_default_engines();
    let settings = EngineSettings::new(SAMPLE_RATE, CHANNELS, 1000, geometry);
    let mut engine = registry.create("cpu-parallel", settings).unwrap();
    engine.change_params(params).unwrap();

    let mut online = Vec::new();
    for i in 0..8 {
        let end = (i + 1) * 1000;
        let chunk = signal.slice(s![end - 1000..end, ..]);
        online.extend(engine.process_data(end as u64, chunk).unwrap().into_vec());
    }
    assert_eq!(online, offline.peaks);
}

#[test]
fn test_close_pair_reported_once() {
    // Two crossings 3 samples apart with n_span = 5: one peak, the larger
    let mut signal = Array2::<f32>::zeros((1024, 2));
    signal[[400, 0]] = -1.0;
    signal[[403, 0]] = -1.5;
    let geometry = linear_geometry(2, 50.0);
    let params = PeakDetectionParams::new(PeakSign::Negative, 0.5, 10.0);

    let offline = detect(signal.view(), 1000.0, geometry.view(), &params).unwrap();
    assert_eq!(offline.peaks, vec![403]);

    for chunk_size in [256usize, 128, 2] {
        let settings = EngineSettings::new(1000.0, 2, chunk_size, geometry.clone());
        let mut engine = StreamingDetector::new(settings, ParallelCPUBackend::new()).unwrap();
        engine.change_params(params.clone()).unwrap();
        assert_eq!(stream_all(&mut engine, &signal, chunk_size), vec![403]);
    }
}
