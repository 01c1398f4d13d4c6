// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! WGPU backend vs CPU backend
//!
//! Skipped (passes trivially) when no adapter is present.

#![cfg(feature = "gpu")]

use ndarray::{s, Array2};
use spikescope_detector::*;

fn gpu_or_skip() -> Option<WGPUBackend> {
    match WGPUBackend::new() {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("⚠️  Skipping GPU test: {}", e);
            None
        }
    }
}

fn recording(len: usize, channels: usize) -> Array2<f32> {
    let mut signal = Array2::from_shape_fn((len, channels), |(t, c)| {
        (((t * 7919 + c * 104_729) % 1000) as f32 / 1000.0 - 0.5) * 2.0
    });
    for (i, t) in (100..len - 100).step_by(250).enumerate() {
        let ch = i % channels;
        signal[[t, ch]] = -12.0 - (i % 5) as f32;
    }
    signal
}

#[test]
fn test_gpu_evidence_close_to_cpu() {
    let Some(mut gpu) = gpu_or_skip() else {
        return;
    };
    let geometry = linear_geometry(16, 50.0);
    let dense = build_spatial_matrix(geometry.view(), Some(100.0))
        .unwrap()
        .unwrap();
    let weights = SparseWeights::<f32>::from_dense(&dense);
    let chunk = recording(2048, 16);

    gpu.prepare(16, 2048, Some(&weights)).unwrap();
    let gpu_evidence = gpu
        .compute_evidence(chunk.view(), PeakSign::Negative, Some(&weights))
        .unwrap();
    let cpu_evidence = compute_rectified_sum(chunk.view(), PeakSign::Negative, Some(&weights));

    for (g, c) in gpu_evidence.iter().zip(cpu_evidence.iter()) {
        assert!((g - c).abs() <= 1e-4 * c.abs().max(1.0), "gpu={} cpu={}", g, c);
    }
}

#[test]
fn test_gpu_engine_peaks_match_offline() {
    let Some(gpu) = gpu_or_skip() else {
        return;
    };
    let geometry = linear_geometry(16, 50.0);
    let signal = recording(8 * 1024, 16);
    let params = PeakDetectionParams::new(PeakSign::Negative, 6.0, 1.0);
    let offline = detect(signal.view(), 20_000.0, geometry.view(), &params).unwrap();

    let settings = EngineSettings::new(20_000.0, 16, 1024, geometry);
    let mut engine = StreamingDetector::new(settings, gpu).unwrap();
    engine.change_params(params).unwrap();
    let mut online = Vec::new();
    for i in 0..8 {
        let end = (i + 1) * 1024;
        let chunk = signal.slice(s![end - 1024..end, ..]);
        online.extend(engine.process_data(end as u64, chunk).unwrap().into_vec());
    }
    // Injected spikes are far above the noise, so rounding cannot move them
    assert_eq!(online, offline.peaks);
}
