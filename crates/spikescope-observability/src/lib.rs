// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikescope-observability
//!
//! Unified logging initialization for spikescope.
//!
//! Provides consistent logging across all spikescope crates with per-crate
//! debug flag support (`--debug-spikescope-detector`, `SPIKESCOPE_DEBUG=all`).

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use init::*;

/// Known spikescope crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "spikescope",
    "spikescope-detector",
    "spikescope-config",
    "spikescope-observability",
];
