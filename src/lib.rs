// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Spikescope
//!
//! Spike peak detection for multichannel recordings, offline or streamed in
//! fixed-size chunks, with identical results either way.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! spikescope = "0.1"  # Default: detector + config
//! ```
//!
//! ## Feature Flags
//! - **`config`** (default): TOML configuration and config-driven sessions
//! - **`observability`**: `tracing-subscriber` initialization with per-crate debug flags
//! - **`gpu`**: WGPU evidence backend (f32)
//!
//! ## Usage Examples
//!
//! ### Offline
//!
//! ```rust
//! use spikescope::prelude::*;
//! use ndarray::Array2;
//!
//! let mut signal = Array2::<f32>::zeros((1000, 2));
//! signal[[500, 0]] = -1.0;
//! let geometry = linear_geometry(2, 50.0);
//! let params = PeakDetectionParams::new(PeakSign::Negative, 0.5, 10.0);
//! let result = detect(signal.view(), 1000.0, geometry.view(), &params).unwrap();
//! assert_eq!(result.peaks, vec![500]);
//! ```
//!
//! ### Streaming
//!
//! ```rust
//! use spikescope::prelude::*;
//! use ndarray::Array2;
//!
//! let registry = EngineRegistry::<f32>::with_default_engines();
//! let settings = EngineSettings::new(1000.0, 2, 256, linear_geometry(2, 50.0));
//! let mut engine = registry.create("cpu", settings).unwrap();
//! engine
//!     .change_params(PeakDetectionParams::new(PeakSign::Negative, 0.5, 10.0))
//!     .unwrap();
//! let chunk = Array2::<f32>::zeros((256, 2));
//! let peaks = engine.process_data(256, chunk.view()).unwrap();
//! assert_eq!(peaks.count, 0);
//! ```

// Re-export components
pub use spikescope_detector as detector;

#[cfg(feature = "config")]
pub use spikescope_config as config;

#[cfg(feature = "observability")]
pub use spikescope_observability as observability;

#[cfg(feature = "config")]
pub mod session;

#[cfg(all(feature = "config", feature = "observability"))]
pub mod logging;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::detector::{
        detect, linear_geometry, BackendConfig, BackendType, ChunkPeaks, DetectorError,
        EngineRegistry, EngineSettings, EngineState, PeakDetectionParams, PeakDetectorEngine,
        PeakSign, StreamingDetector,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, validate_config, SpikescopeConfig};

    #[cfg(feature = "config")]
    pub use crate::session::DetectionSession;

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_logging, parse_debug_flags, LogFormat};

    #[cfg(all(feature = "config", feature = "observability"))]
    pub use crate::logging::init_logging_from_config;
}
