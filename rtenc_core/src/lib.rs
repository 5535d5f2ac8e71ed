//! Real-time H.264 encoder core.
//!
//! The crate turns a small [`EncoderConfig`] into a complete real-time encoder
//! configuration, drives a compression [`engine::Engine`] one raw 4:2:0
//! picture at a time and packs the produced layers into caller-owned buffers.
//! The C interface lives in the `rtenc_capi` crate.

pub mod encoder;
pub mod engine;
pub mod error;
pub mod packing;
pub mod params;
pub mod picture;
/// Scripted engine and frame helpers for tests.
pub mod test;

pub use encoder::{AccessUnit, Encoder, EncoderStats, FrameEncoder};
pub use engine::{Engine, FrameType};
pub use error::{EncoderError, ErrorCode};
pub use params::{EncoderConfig, EncoderParams};
pub use picture::Picture;

#[cfg(feature = "openh264")]
pub use engine::openh264::OpenH264Engine;

/// Encoder over the bundled OpenH264 engine.
#[cfg(feature = "openh264")]
pub type H264Encoder = Encoder<OpenH264Engine>;

use lazy_static::lazy_static;

lazy_static! {
    static ref VERSION_CRC32: u32 = crc32fast::hash(env!("CARGO_PKG_VERSION").as_bytes());
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns version in CRC32 format
///
pub fn version_crc32() -> u32 {
    *VERSION_CRC32
}
