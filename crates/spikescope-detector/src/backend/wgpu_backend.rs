// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # WGPU Backend
//!
//! GPU-accelerated evidence computation using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows).
//!
//! Each call is synchronous: upload chunk, dispatch, wait, read back.

use ndarray::ArrayView2;
use tracing::{debug, info};

use super::EvidenceBackend;
use crate::error::{DetectorError, Result};
use crate::spatial::SparseWeights;
use crate::types::PeakSign;

/// Invocations per workgroup (must match `@workgroup_size` in the shader)
const WORKGROUP_SIZE: u32 = 64;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct RectifiedSumParams {
    n_rows: u32,
    n_channels: u32,
    sign: f32,
    _padding: u32,
}

/// WGPU backend for GPU acceleration (`f32` samples only)
pub struct WGPUBackend {
    /// Backend name for logging
    name: String,

    /// WGPU device
    device: wgpu::Device,

    /// WGPU command queue
    queue: wgpu::Queue,

    /// Rectified-sum compute pipeline
    pipeline: wgpu::ComputePipeline,

    /// Per-configuration buffers, built by `prepare`
    buffers: Option<WGPUBuffers>,
}

/// GPU buffer management (6 bindings - Metal compatible)
struct WGPUBuffers {
    samples: wgpu::Buffer,
    evidence: wgpu::Buffer,
    staging: wgpu::Buffer,
    params: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    // Kept alive for the bind group
    _weight_offsets: wgpu::Buffer,
    _weight_sources: wgpu::Buffer,
    _weight_values: wgpu::Buffer,

    channel_count: usize,
    row_capacity: usize,
}

impl WGPUBackend {
    /// Create a new WGPU backend
    pub fn new() -> Result<Self> {
        // Initialize WGPU
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Request adapter (GPU)
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| DetectorError::Backend("Failed to find WGPU adapter".to_string()))?;

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        // Request device and queue
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Spikescope Detector Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| DetectorError::Backend(format!("Failed to create device: {}", e)))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Rectified Sum Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/rectified_sum.wgsl").into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Rectified Sum Pipeline"),
            layout: None, // Auto-layout from shader
            module: &shader,
            entry_point: "rectified_sum_main",
        });

        info!("{} ready, rectified sum shader loaded", name);

        Ok(Self {
            name,
            device,
            queue,
            pipeline,
            buffers: None,
        })
    }

    fn storage_buffer(
        &self,
        label: &str,
        contents: &[u8],
        extra: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: contents.len() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | extra,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, contents);
        buffer
    }

    /// Upload weights and allocate chunk buffers, then bind everything
    fn build_buffers(
        &self,
        weights: &SparseWeights<f32>,
        channel_count: usize,
        row_capacity: usize,
    ) -> WGPUBuffers {
        let offsets: Vec<u32> = weights.offsets().iter().map(|&o| o as u32).collect();
        let sources: Vec<u32> = weights.sources().iter().map(|&s| s as u32).collect();

        let weight_offsets = self.storage_buffer(
            "Weight Offsets",
            bytemuck::cast_slice(&offsets),
            wgpu::BufferUsages::empty(),
        );
        let weight_sources = self.storage_buffer(
            "Weight Sources",
            bytemuck::cast_slice(&sources),
            wgpu::BufferUsages::empty(),
        );
        let weight_values = self.storage_buffer(
            "Weight Values",
            bytemuck::cast_slice(weights.values()),
            wgpu::BufferUsages::empty(),
        );

        let samples_size = (row_capacity * channel_count * std::mem::size_of::<f32>()) as u64;
        let samples = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Chunk Samples"),
            size: samples_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let evidence_size = (row_capacity * std::mem::size_of::<f32>()) as u64;
        let evidence = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Evidence"),
            size: evidence_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        // Staging buffer for GPU→CPU transfer
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Evidence Staging"),
            size: evidence_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rectified Sum Params"),
            size: std::mem::size_of::<RectifiedSumParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Bind group layout derived from the shader
        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Rectified Sum Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: samples.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: weight_offsets.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: weight_sources.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: weight_values.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: evidence.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        WGPUBuffers {
            samples,
            evidence,
            staging,
            params,
            bind_group,
            _weight_offsets: weight_offsets,
            _weight_sources: weight_sources,
            _weight_values: weight_values,
            channel_count,
            row_capacity,
        }
    }

    /// Copy `rows` evidence values back from the staging buffer (blocking)
    fn read_back(&self, buffers: &WGPUBuffers, rows: usize) -> Result<Vec<f32>> {
        let byte_len = (rows * std::mem::size_of::<f32>()) as u64;
        let buffer_slice = buffers.staging.slice(..byte_len);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below
            let _ = sender.send(result);
        });

        // Wait for mapping to complete
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| {
                DetectorError::Backend("Failed to receive evidence map result".to_string())
            })?
            .map_err(|e| {
                DetectorError::Backend(format!("Failed to map evidence buffer: {:?}", e))
            })?;

        let data = buffer_slice.get_mapped_range();
        let values: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        buffers.staging.unmap();

        Ok(values)
    }
}

impl EvidenceBackend<f32> for WGPUBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn prepare(
        &mut self,
        channel_count: usize,
        chunk_size: usize,
        weights: Option<&SparseWeights<f32>>,
    ) -> Result<()> {
        let identity;
        let weights = match weights {
            Some(w) => w,
            None => {
                identity = SparseWeights::identity(channel_count);
                &identity
            }
        };
        if weights.channel_count() != channel_count {
            return Err(DetectorError::Configuration(format!(
                "weight matrix covers {} channels, engine has {}",
                weights.channel_count(),
                channel_count
            )));
        }

        self.buffers = Some(self.build_buffers(weights, channel_count, chunk_size));
        debug!(
            channel_count,
            chunk_size,
            nnz = weights.nnz(),
            "uploaded spatial weights to GPU"
        );
        Ok(())
    }

    /// Weights are taken from the last `prepare`; `_weights` is only used by CPU backends
    fn compute_evidence(
        &mut self,
        chunk: ArrayView2<'_, f32>,
        sign: PeakSign,
        _weights: Option<&SparseWeights<f32>>,
    ) -> Result<Vec<f32>> {
        let buffers = self
            .buffers
            .as_ref()
            .ok_or_else(|| DetectorError::Backend("GPU buffers not prepared".to_string()))?;

        let rows = chunk.nrows();
        if chunk.ncols() != buffers.channel_count || rows > buffers.row_capacity {
            return Err(DetectorError::Shape {
                expected_rows: buffers.row_capacity,
                expected_cols: buffers.channel_count,
                rows,
                cols: chunk.ncols(),
            });
        }
        if rows == 0 {
            return Ok(Vec::new());
        }

        // Row-major upload regardless of the view's memory layout
        let samples: Vec<f32> = chunk.iter().copied().collect();
        self.queue
            .write_buffer(&buffers.samples, 0, bytemuck::cast_slice(&samples));

        let params = RectifiedSumParams {
            n_rows: rows as u32,
            n_channels: buffers.channel_count as u32,
            sign: sign.factor(),
            _padding: 0,
        };
        self.queue
            .write_buffer(&buffers.params, 0, bytemuck::bytes_of(&params));

        let workgroup_count = (rows as u32 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Rectified Sum Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Rectified Sum Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &buffers.bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroup_count, 1, 1);
        }

        let byte_len = (rows * std::mem::size_of::<f32>()) as u64;
        encoder.copy_buffer_to_buffer(&buffers.evidence, 0, &buffers.staging, 0, byte_len);

        // Submit commands
        self.queue.submit(Some(encoder.finish()));

        self.read_back(buffers, rows)
    }
}
