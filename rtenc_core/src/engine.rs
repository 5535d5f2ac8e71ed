//! The seam between the encoder lifecycle and the compression engine.
//!
//! An [`Engine`] owns exactly one native encoder instance. It is created,
//! initialized once with [`EncoderParams`], driven one picture at a time, and
//! released when dropped. Rate control, entropy coding and reference
//! management all live behind this trait.

#[cfg(feature = "openh264")]
pub mod openh264;

use crate::error::EncoderError;
use crate::params::EncoderParams;
use crate::picture::Picture;

/// Frame type reported by the engine for one encoded picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Invalid,
    /// Instantaneous decoder refresh, a random-access point.
    Idr,
    I,
    P,
    /// Dropped by rate control; no bitstream was produced.
    Skip,
    IpMixed,
}

impl FrameType {
    /// IDR and I frames are self-contained and count as keyframes.
    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameType::Idr | FrameType::I)
    }
}

/// Output of one engine encode call.
///
/// The layer slices borrow the engine's internal bitstream buffer and are
/// valid until the next call on the engine.
#[derive(Debug)]
pub struct EngineFrame<'a> {
    pub frame_type: FrameType,
    pub layers: Vec<&'a [u8]>,
}

impl EngineFrame<'_> {
    pub fn skipped() -> Self {
        Self {
            frame_type: FrameType::Skip,
            layers: Vec::new(),
        }
    }
}

pub trait Engine: Sized {
    /// Instantiate the native engine.
    ///
    /// Fails with [`EncoderError::EngineCreateFailed`].
    fn create() -> Result<Self, EncoderError>;

    /// Apply the derived parameters and initialize the engine.
    ///
    /// Fails with [`EncoderError::EngineInitFailed`].
    fn initialize(&mut self, params: &EncoderParams) -> Result<(), EncoderError>;

    /// Make the next encoded picture an IDR frame.
    fn force_intra_frame(&mut self) -> Result<(), EncoderError>;

    /// Encode one picture synchronously.
    ///
    /// Fails with [`EncoderError::EncodeFailed`]. A frame dropped by rate
    /// control is not a failure and comes back as [`FrameType::Skip`].
    fn encode_frame(
        &mut self,
        picture: &Picture<'_>,
        timestamp_ms: i64,
    ) -> Result<EngineFrame<'_>, EncoderError>;
}
