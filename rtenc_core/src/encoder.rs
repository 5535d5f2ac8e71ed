//! Encoder lifecycle and the per-frame pipeline.
//!
//! An [`Encoder`] owns one engine instance from creation to release:
//!
//! ```text
//! EncoderConfig -> derive_params -> Engine::create -> Engine::initialize
//!     -> encode(picture, output)* -> destroy / drop
//! ```
//!
//! Every call is synchronous. Nothing is buffered across `encode` calls; the
//! bytes of one access unit are copied into the caller's output slice before
//! the call returns.

use crate::engine::{Engine, FrameType};
use crate::error::EncoderError;
use crate::packing;
use crate::params::EncoderConfig;
use crate::picture::Picture;
use log::{debug, error, trace, warn};
use serde::Serialize;

/// Result of one accepted picture.
///
/// The bytes themselves are the leading `size` bytes of the output slice
/// passed to [`Encoder::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessUnit {
    /// Bytes written into the output slice.
    pub size: usize,
    /// `true` for IDR and I frames.
    pub keyframe: bool,
    /// Frame type reported by the engine.
    pub frame_type: FrameType,
}

impl AccessUnit {
    fn skipped() -> Self {
        Self {
            size: 0,
            keyframe: false,
            frame_type: FrameType::Skip,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.frame_type == FrameType::Skip
    }
}

/// Running counters of one encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncoderStats {
    /// Pictures handed to the engine.
    pub frames_submitted: u64,
    /// Pictures that produced a non-empty access unit.
    pub frames_encoded: u64,
    /// Pictures dropped by rate control.
    pub frames_skipped: u64,
    /// Pictures that failed in the engine or did not fit the output buffer.
    pub frames_failed: u64,
    pub keyframes: u64,
    pub forced_keyframes: u64,
    pub bytes_written: u64,
}

/// Object-safe encoder capability.
///
/// This is what the C interface stores behind a handle; the concrete engine
/// stays hidden behind it.
pub trait FrameEncoder {
    fn encode(
        &mut self,
        picture: &Picture<'_>,
        output: &mut [u8],
    ) -> Result<AccessUnit, EncoderError>;

    fn request_keyframe(&mut self) -> Result<(), EncoderError>;

    fn destroy(&mut self);

    fn stats(&self) -> EncoderStats;

    fn config(&self) -> &EncoderConfig;
}

/// Single-owner encoder over an [`Engine`].
///
/// # Lifecycle
///
/// 1. Create with [`Encoder::new`] (or [`Encoder::with_factory`]).
/// 2. Feed pictures in temporal order with [`encode`](Self::encode).
/// 3. Optionally call [`request_keyframe`](Self::request_keyframe) between frames.
/// 4. Call [`destroy`](Self::destroy) to release the engine
///    (also happens automatically on drop).
pub struct Encoder<E: Engine> {
    /// The engine; `None` once released.
    engine: Option<E>,
    config: EncoderConfig,
    /// One-shot request consumed by the next `encode`.
    force_idr: bool,
    /// Pictures submitted so far, used to derive engine timestamps.
    frame_index: u64,
    stats: EncoderStats,
}

impl<E: Engine> Encoder<E> {
    /// Create an encoder with the engine's own constructor.
    pub fn new(config: EncoderConfig) -> Result<Self, EncoderError> {
        Self::with_factory(config, E::create)
    }

    /// Create an encoder with a custom engine constructor.
    ///
    /// # Errors
    ///
    /// - [`EncoderError::InvalidParameter`] if the config does not validate.
    ///   The factory is not called in that case.
    /// - [`EncoderError::EngineCreateFailed`] from the factory.
    /// - [`EncoderError::EngineInitFailed`] if the engine rejects the derived
    ///   parameters. The engine is released before returning.
    pub fn with_factory<F>(config: EncoderConfig, factory: F) -> Result<Self, EncoderError>
    where
        F: FnOnce() -> Result<E, EncoderError>,
    {
        let params = config.derive_params().inspect_err(|e| {
            warn!("Rejected encoder config {:?}: {}", config, e);
        })?;

        let mut engine = factory().inspect_err(|e| error!("{}", e))?;
        if let Err(e) = engine.initialize(&params) {
            error!("{}", e);
            drop(engine);
            return Err(e);
        }

        debug!(
            "Encoder created: {}x{} @ {} fps, {} bps, keyint {}, threads {}",
            config.width, config.height, config.fps, config.bitrate, config.keyint, params.threads
        );
        Ok(Self {
            engine: Some(engine),
            config,
            force_idr: false,
            frame_index: 0,
            stats: EncoderStats::default(),
        })
    }

    /// `false` once the engine has been released.
    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    /// Make the next encoded picture an IDR frame.
    ///
    /// Repeated requests before the next `encode` have the effect of one.
    pub fn request_keyframe(&mut self) -> Result<(), EncoderError> {
        if self.engine.is_none() {
            return Err(EncoderError::NullEncoder);
        }
        self.force_idr = true;
        debug!("Keyframe requested at frame {}", self.frame_index);
        Ok(())
    }

    /// Release the engine. Calling it again is a no-op.
    pub fn destroy(&mut self) {
        if let Some(engine) = self.engine.take() {
            drop(engine);
            debug!(
                "Encoder destroyed after {} frames ({} bytes)",
                self.stats.frames_submitted, self.stats.bytes_written
            );
        }
    }

    /// Encode one picture into the front of `output`.
    ///
    /// A frame dropped by rate control is not an error: it comes back as a
    /// zero-size, non-key [`AccessUnit`].
    ///
    /// # Errors
    ///
    /// - [`EncoderError::InvalidParameter`] if the picture geometry differs
    ///   from the encoder geometry.
    /// - [`EncoderError::NullEncoder`] after [`destroy`](Self::destroy).
    /// - [`EncoderError::EncodeFailed`] if the engine fails.
    /// - [`EncoderError::OutputBufferTooSmall`] if the access unit does not
    ///   fit; `output` is left untouched.
    pub fn encode(
        &mut self,
        picture: &Picture<'_>,
        output: &mut [u8],
    ) -> Result<AccessUnit, EncoderError> {
        if picture.width() != self.config.width || picture.height() != self.config.height {
            warn!(
                "Rejected {}x{} picture for a {}x{} encoder",
                picture.width(),
                picture.height(),
                self.config.width,
                self.config.height
            );
            return Err(EncoderError::InvalidParameter(format!(
                "picture is {}x{}, encoder expects {}x{}",
                picture.width(),
                picture.height(),
                self.config.width,
                self.config.height
            )));
        }
        let engine = self.engine.as_mut().ok_or(EncoderError::NullEncoder)?;

        let result = Self::encode_with(
            engine,
            &mut self.force_idr,
            &mut self.stats,
            &mut self.frame_index,
            self.config.fps,
            picture,
            output,
        );
        if result.is_err() {
            self.stats.frames_failed += 1;
        }
        result
    }

    fn encode_with(
        engine: &mut E,
        force_idr: &mut bool,
        stats: &mut EncoderStats,
        next_index: &mut u64,
        fps: i32,
        picture: &Picture<'_>,
        output: &mut [u8],
    ) -> Result<AccessUnit, EncoderError> {
        if *force_idr {
            engine.force_intra_frame()?;
            *force_idr = false;
            stats.forced_keyframes += 1;
        }

        let frame_index = *next_index;
        *next_index += 1;
        let timestamp_ms = timestamp_ms(frame_index, fps);
        stats.frames_submitted += 1;
        let frame = engine.encode_frame(picture, timestamp_ms)?;

        if frame.frame_type == FrameType::Skip {
            stats.frames_skipped += 1;
            trace!("Frame {} skipped by rate control", frame_index);
            return Ok(AccessUnit::skipped());
        }

        let size = packing::pack_layers(&frame.layers, output).inspect_err(|e| {
            warn!("Frame {}: {}", frame_index, e);
        })?;
        let keyframe = frame.frame_type.is_keyframe();

        stats.frames_encoded += 1;
        stats.bytes_written += size as u64;
        if keyframe {
            stats.keyframes += 1;
        }
        trace!(
            "Frame {} encoded: {:?}, {} layer(s), {} bytes",
            frame_index,
            frame.frame_type,
            frame.layers.len(),
            size
        );

        Ok(AccessUnit {
            size,
            keyframe,
            frame_type: frame.frame_type,
        })
    }
}

/// Engine timestamp of the `frame_index`-th picture at `fps`, in milliseconds.
pub fn timestamp_ms(frame_index: u64, fps: i32) -> i64 {
    let fps = u64::try_from(fps).unwrap_or(1).max(1);
    i64::try_from(frame_index.saturating_mul(1000) / fps).unwrap_or(i64::MAX)
}

impl<E: Engine> FrameEncoder for Encoder<E> {
    fn encode(
        &mut self,
        picture: &Picture<'_>,
        output: &mut [u8],
    ) -> Result<AccessUnit, EncoderError> {
        Encoder::encode(self, picture, output)
    }

    fn request_keyframe(&mut self) -> Result<(), EncoderError> {
        Encoder::request_keyframe(self)
    }

    fn destroy(&mut self) {
        Encoder::destroy(self)
    }

    fn stats(&self) -> EncoderStats {
        Encoder::stats(self)
    }

    fn config(&self) -> &EncoderConfig {
        Encoder::config(self)
    }
}

impl<E: Engine> Drop for Encoder<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<E: Engine> std::fmt::Debug for Encoder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("active", &self.engine.is_some())
            .field("config", &self.config)
            .field("force_idr", &self.force_idr)
            .field("frame_index", &self.frame_index)
            .field("stats", &self.stats)
            .finish()
    }
}
