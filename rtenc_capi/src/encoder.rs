//! Encoder entry points of the C API.
//!
//! Every function returns an error code from [`crate::capi`] (or a handle for
//! [`rtenc_encoder_create`]). Panics are caught at this boundary.

use crate::capi::{RTENC_ERR_ENCODE_FAILED, RTENC_ERR_INVALID_PARAMETER, RTENC_OK};
use crate::registry;
use log::{error, warn};
use rtenc_core::picture::{chroma_dim, PLANE_U, PLANE_V, PLANE_Y};
use rtenc_core::{EncoderConfig, EncoderError, EncoderStats, H264Encoder, Picture};
use std::ffi::c_int;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::slice::{from_raw_parts, from_raw_parts_mut};

/// Encoder counters as seen from C.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtencEncoderStats {
    pub frames_submitted: u64,
    pub frames_encoded: u64,
    pub frames_skipped: u64,
    pub frames_failed: u64,
    pub keyframes: u64,
    pub forced_keyframes: u64,
    pub bytes_written: u64,
}

impl From<EncoderStats> for RtencEncoderStats {
    fn from(stats: EncoderStats) -> Self {
        Self {
            frames_submitted: stats.frames_submitted,
            frames_encoded: stats.frames_encoded,
            frames_skipped: stats.frames_skipped,
            frames_failed: stats.frames_failed,
            keyframes: stats.keyframes,
            forced_keyframes: stats.forced_keyframes,
            bytes_written: stats.bytes_written,
        }
    }
}

fn code_of(result: Result<(), EncoderError>) -> c_int {
    match result {
        Ok(()) => RTENC_OK,
        Err(e) => e.code() as c_int,
    }
}

fn create(config: EncoderConfig) -> Result<usize, EncoderError> {
    let encoder = H264Encoder::new(config)?;
    registry::register(Box::new(encoder))
}

/// Create an OpenH264 encoder.
///
/// `threads <= 0` selects single-threaded encoding. Returns a non-zero handle,
/// or `0` on any failure (the reason is logged).
#[no_mangle]
pub extern "C" fn rtenc_encoder_create(
    width: c_int,
    height: c_int,
    fps: c_int,
    bitrate: c_int,
    keyint: c_int,
    threads: c_int,
) -> usize {
    let config = EncoderConfig::new(width, height, fps, bitrate, keyint).threads(threads);
    match catch_unwind(|| create(config)) {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            error!("rtenc_encoder_create failed: {}", e);
            0
        }
        Err(_) => {
            error!("rtenc_encoder_create panicked for {:?}", config);
            0
        }
    }
}

/// Encode one I420 picture into `output`.
///
/// `*out_size` and `*is_keyframe` are reset before anything else happens, so
/// they never hold stale values after an error. A frame dropped by rate
/// control succeeds with `*out_size == 0`.
///
/// # Safety
///
/// The planes must hold `height` (luma) or `(height + 1) / 2` (chroma) rows of
/// their respective stride, `output` must be writable for `capacity` bytes,
/// and `out_size` and `is_keyframe` must be valid for writes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rtenc_encoder_encode(
    handle: usize,
    y: *const u8,
    u: *const u8,
    v: *const u8,
    stride_y: c_int,
    stride_u: c_int,
    stride_v: c_int,
    output: *mut u8,
    capacity: usize,
    out_size: *mut usize,
    is_keyframe: *mut bool,
) -> c_int {
    if !out_size.is_null() {
        *out_size = 0;
    }
    if !is_keyframe.is_null() {
        *is_keyframe = false;
    }
    if handle == 0
        || y.is_null()
        || u.is_null()
        || v.is_null()
        || output.is_null()
        || out_size.is_null()
        || is_keyframe.is_null()
    {
        warn!("rtenc_encoder_encode: absent handle, plane, or output pointer");
        return RTENC_ERR_INVALID_PARAMETER;
    }
    let Some(encoder) = registry::lookup(handle) else {
        return EncoderError::NullEncoder.code() as c_int;
    };

    let strides = [stride_y, stride_u, stride_v];
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut encoder = encoder.lock();
        let (width, height) = (encoder.config().width, encoder.config().height);
        let plane_len = |plane: usize| {
            let (plane_width, rows) = if plane == PLANE_Y {
                (width, height)
            } else {
                (chroma_dim(width), chroma_dim(height))
            };
            Picture::min_plane_len(strides[plane], plane_width, rows)
        };
        let picture = Picture::new(
            width,
            height,
            from_raw_parts(y, plane_len(PLANE_Y)),
            from_raw_parts(u, plane_len(PLANE_U)),
            from_raw_parts(v, plane_len(PLANE_V)),
            strides,
        )?;
        let output = from_raw_parts_mut(output, capacity);
        encoder.encode(&picture, output)
    }));

    match result {
        Ok(Ok(unit)) => {
            *out_size = unit.size;
            *is_keyframe = unit.keyframe;
            RTENC_OK
        }
        Ok(Err(e)) => {
            warn!("rtenc_encoder_encode({}): {}", handle, e);
            e.code() as c_int
        }
        Err(_) => {
            error!("rtenc_encoder_encode({}) panicked", handle);
            RTENC_ERR_ENCODE_FAILED
        }
    }
}

/// Make the next encoded frame an IDR frame.
///
/// Returns the null-encoder code for `0` or a destroyed handle.
#[no_mangle]
pub extern "C" fn rtenc_encoder_request_keyframe(handle: usize) -> c_int {
    let Some(encoder) = registry::lookup(handle) else {
        return EncoderError::NullEncoder.code() as c_int;
    };
    let result = encoder.lock().request_keyframe();
    code_of(result)
}

/// Release the encoder behind `handle`. Unknown handles and `0` are ignored.
#[no_mangle]
pub extern "C" fn rtenc_encoder_destroy(handle: usize) {
    if let Some(encoder) = registry::unregister(handle) {
        encoder.lock().destroy();
    }
}

/// Copy the counters of `handle` into `*stats`.
///
/// # Safety
///
/// `stats` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn rtenc_encoder_stats(handle: usize, stats: *mut RtencEncoderStats) -> c_int {
    if stats.is_null() {
        return RTENC_ERR_INVALID_PARAMETER;
    }
    *stats = RtencEncoderStats::default();
    let Some(encoder) = registry::lookup(handle) else {
        return EncoderError::NullEncoder.code() as c_int;
    };
    *stats = encoder.lock().stats().into();
    RTENC_OK
}
