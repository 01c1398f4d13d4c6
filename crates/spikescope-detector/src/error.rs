// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for peak detection

/// Result type alias using DetectorError
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Error types for detection, streaming and backend selection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectorError {
    /// Invalid parameters, geometry or construction settings
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// `process_data` called before `change_params`
    #[error("Engine not configured - call change_params() first")]
    NotConfigured,

    /// Chunk position is not contiguous with the previous chunk
    #[error("non-contiguous chunk: expected chunk_end={expected}, got chunk_end={actual}")]
    Sequence { expected: u64, actual: u64 },

    /// A previous sequence error broke the stream; the engine must be rebuilt
    #[error("stream faulted by an earlier sequence error - construct a new engine")]
    StreamFaulted,

    /// Chunk dimensions do not match the configured chunk size / channel count
    #[error("chunk shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    Shape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// No constructor registered under this name
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Backend execution failure (device loss, mapping failure, ...)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Sequence,
    Shape,
    Backend,
}

impl DetectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetectorError::Configuration(_)
            | DetectorError::NotConfigured
            | DetectorError::UnknownBackend(_) => ErrorKind::Configuration,
            DetectorError::Sequence { .. } | DetectorError::StreamFaulted => ErrorKind::Sequence,
            DetectorError::Shape { .. } => ErrorKind::Shape,
            DetectorError::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Sequence errors end the streaming session
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Sequence
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        DetectorError::Configuration(msg.into())
    }
}
