//! Error types for the encoder core.

use std::ffi::CStr;

/// Stable integer codes reported across the C boundary.
///
/// The numeric values are part of the ABI and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    InvalidParameter = -1,
    MemoryAllocation = -2,
    EngineCreateFailed = -3,
    EngineInitFailed = -4,
    NullEncoder = -5,
    EncodeFailed = -6,
    OutputBufferTooSmall = -7,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::Ok,
        ErrorCode::InvalidParameter,
        ErrorCode::MemoryAllocation,
        ErrorCode::EngineCreateFailed,
        ErrorCode::EngineInitFailed,
        ErrorCode::NullEncoder,
        ErrorCode::EncodeFailed,
        ErrorCode::OutputBufferTooSmall,
    ];

    pub fn from_i32(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as i32 == code)
    }

    /// Short human-readable description of the code, NUL-terminated for C.
    pub fn description(&self) -> &'static CStr {
        match self {
            ErrorCode::Ok => c"success",
            ErrorCode::InvalidParameter => c"invalid parameter",
            ErrorCode::MemoryAllocation => c"memory allocation failed",
            ErrorCode::EngineCreateFailed => c"encoder engine creation failed",
            ErrorCode::EngineInitFailed => c"encoder engine initialization failed",
            ErrorCode::NullEncoder => c"encoder is absent or already destroyed",
            ErrorCode::EncodeFailed => c"frame encoding failed",
            ErrorCode::OutputBufferTooSmall => c"output buffer too small",
        }
    }
}

/// Errors that can occur during encoder creation or operation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncoderError {
    /// Malformed or missing input, caught before any engine interaction.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Memory allocation failed: {0}")]
    MemoryAllocation(String),

    /// The engine instance could not be instantiated.
    #[error("Failed to create encoder engine: {0}")]
    EngineCreateFailed(String),

    /// The engine rejected the derived configuration.
    #[error("Failed to initialize encoder engine: {0}")]
    EngineInitFailed(String),

    /// The operation was invoked after the engine was released.
    #[error("Encoder engine is absent (destroyed or never created)")]
    NullEncoder,

    /// The engine reported a failure for the submitted frame.
    #[error("Frame encoding failed: {0}")]
    EncodeFailed(String),

    /// The caller-provided buffer cannot hold the access unit. Nothing was written.
    #[error("Output buffer too small: {required} bytes required, {capacity} available")]
    OutputBufferTooSmall { required: usize, capacity: usize },
}

impl EncoderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EncoderError::InvalidParameter(_) => ErrorCode::InvalidParameter,
            EncoderError::MemoryAllocation(_) => ErrorCode::MemoryAllocation,
            EncoderError::EngineCreateFailed(_) => ErrorCode::EngineCreateFailed,
            EncoderError::EngineInitFailed(_) => ErrorCode::EngineInitFailed,
            EncoderError::NullEncoder => ErrorCode::NullEncoder,
            EncoderError::EncodeFailed(_) => ErrorCode::EncodeFailed,
            EncoderError::OutputBufferTooSmall { .. } => ErrorCode::OutputBufferTooSmall,
        }
    }
}

impl From<std::collections::TryReserveError> for EncoderError {
    fn from(err: std::collections::TryReserveError) -> Self {
        EncoderError::MemoryAllocation(err.to_string())
    }
}
