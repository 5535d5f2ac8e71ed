//! Encoder configuration and derivation of the complete engine parameter set.
//!
//! [`EncoderConfig`] carries the handful of values a caller controls. Everything
//! else is fixed policy for a real-time, single-layer, rate-controlled encoder
//! and is filled in by [`EncoderConfig::derive_params`]. The resulting
//! [`EncoderParams`] does not depend on any particular engine; the engine
//! backend translates it into its native structure.

use crate::error::EncoderError;
use serde::{Deserialize, Serialize};

/// Peak bitrate is capped at this multiple of the target bitrate.
pub const MAX_BITRATE_FACTOR: i32 = 2;

/// Initial quantization parameter of the spatial layer.
pub const INITIAL_QP: i32 = 26;

/// `threads` value meaning "let the encoder decide" (maps to one thread).
pub const AUTO_THREADS: i32 = 0;

const DEFAULT_THREADS: u16 = 1;

/// Caller-controlled encoder settings.
///
/// The integer types mirror the C interface so that values coming from the
/// ABI are validated here rather than truncated on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Picture width in pixels.
    pub width: i32,
    /// Picture height in pixels.
    pub height: i32,
    /// Frame rate in frames per second.
    pub fps: i32,
    /// Target bitrate in bits per second.
    pub bitrate: i32,
    /// Distance between forced IDR frames, in frames.
    pub keyint: i32,
    /// Engine worker threads; [`AUTO_THREADS`] selects single-threaded operation.
    #[serde(default)]
    pub threads: i32,
}

impl EncoderConfig {
    pub fn new(width: i32, height: i32, fps: i32, bitrate: i32, keyint: i32) -> Self {
        Self {
            width,
            height,
            fps,
            bitrate,
            keyint,
            threads: AUTO_THREADS,
        }
    }

    /// Set the engine parallelism hint.
    pub fn threads(mut self, threads: i32) -> Self {
        self.threads = threads;
        self
    }

    /// Check that every mandatory value is strictly positive.
    pub fn validate(&self) -> Result<(), EncoderError> {
        let checks = [
            ("width", self.width),
            ("height", self.height),
            ("fps", self.fps),
            ("bitrate", self.bitrate),
            ("keyint", self.keyint),
        ];
        for (name, value) in checks {
            if value <= 0 {
                return Err(EncoderError::InvalidParameter(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Engine thread count: positive values pass through, anything else is one thread.
    pub fn effective_threads(&self) -> u16 {
        if self.threads > 0 {
            u16::try_from(self.threads).unwrap_or(u16::MAX)
        } else {
            DEFAULT_THREADS
        }
    }

    /// Build the full engine configuration.
    ///
    /// Fails with [`EncoderError::InvalidParameter`] when the config does not
    /// validate; no engine resources are touched in that case.
    pub fn derive_params(&self) -> Result<EncoderParams, EncoderError> {
        self.validate()?;

        let max_bitrate = self.bitrate.saturating_mul(MAX_BITRATE_FACTOR);
        let frame_rate = self.fps as f32;

        Ok(EncoderParams {
            usage: UsageType::CameraVideoRealTime,
            width: self.width,
            height: self.height,
            max_frame_rate: frame_rate,
            rc_mode: RateControlMode::Bitrate,
            target_bitrate: self.bitrate,
            max_bitrate,
            intra_period: self.keyint as u32,
            temporal_layers: 1,
            spatial_layers: vec![SpatialLayerParams {
                width: self.width,
                height: self.height,
                frame_rate,
                bitrate: self.bitrate,
                max_bitrate,
                profile: Profile::Baseline,
                qp: INITIAL_QP,
                slice_mode: SliceMode::Single,
            }],
            denoise: false,
            background_detection: true,
            adaptive_quant: true,
            frame_skip: true,
            long_term_reference: false,
            loop_filter: LoopFilter::default(),
            sps_pps_strategy: ParameterSetStrategy::ConstantId,
            threads: self.effective_threads(),
            input_format: PixelFormat::I420,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageType {
    /// Live camera capture, latency-sensitive.
    CameraVideoRealTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateControlMode {
    /// Track a target bitrate.
    Bitrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceMode {
    /// One slice per frame.
    Single,
}

/// How SPS/PPS identifiers evolve over the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterSetStrategy {
    /// Same IDs for the whole session.
    ConstantId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar Y, U, V with 2x2 chroma subsampling.
    I420,
}

/// Deblocking filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoopFilter {
    /// `0` keeps the filter enabled.
    pub disable_idc: i32,
    pub alpha_c0_offset: i32,
    pub beta_offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialLayerParams {
    pub width: i32,
    pub height: i32,
    pub frame_rate: f32,
    pub bitrate: i32,
    pub max_bitrate: i32,
    pub profile: Profile,
    pub qp: i32,
    pub slice_mode: SliceMode,
}

/// Complete, engine-independent encoder configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderParams {
    pub usage: UsageType,
    pub width: i32,
    pub height: i32,
    pub max_frame_rate: f32,
    pub rc_mode: RateControlMode,
    pub target_bitrate: i32,
    pub max_bitrate: i32,
    pub intra_period: u32,
    pub temporal_layers: i32,
    pub spatial_layers: Vec<SpatialLayerParams>,
    pub denoise: bool,
    pub background_detection: bool,
    pub adaptive_quant: bool,
    pub frame_skip: bool,
    pub long_term_reference: bool,
    pub loop_filter: LoopFilter,
    pub sps_pps_strategy: ParameterSetStrategy,
    pub threads: u16,
    pub input_format: PixelFormat,
}
