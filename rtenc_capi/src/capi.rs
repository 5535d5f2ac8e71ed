//! # C API for the rtenc encoder core
//!
//! Version, error code and diagnostic entry points. The encoder functions
//! are in [`crate::encoder`].

use rtenc_core::ErrorCode;
use std::ffi::{c_char, c_int, CStr};

pub const RTENC_OK: c_int = 0;
pub const RTENC_ERR_INVALID_PARAMETER: c_int = -1;
pub const RTENC_ERR_MEMORY_ALLOCATION: c_int = -2;
pub const RTENC_ERR_ENGINE_CREATE_FAILED: c_int = -3;
pub const RTENC_ERR_ENGINE_INIT_FAILED: c_int = -4;
pub const RTENC_ERR_NULL_ENCODER: c_int = -5;
pub const RTENC_ERR_ENCODE_FAILED: c_int = -6;
pub const RTENC_ERR_OUTPUT_BUFFER_TOO_SMALL: c_int = -7;

const VERSION_PREFIX: &str = "rtenc ";
const VERSION: &str = concat!("rtenc ", env!("CARGO_PKG_VERSION"), "\0");

/// Static, NUL-terminated identification string, e.g. `rtenc 0.3.0`.
#[no_mangle]
pub extern "C" fn rtenc_version() -> *const c_char {
    VERSION.as_ptr().cast()
}

/// `true` if `external_version` names the library version, either bare
/// (`0.3.0`) or as returned by [`rtenc_version`] (`rtenc 0.3.0`).
///
/// # Safety
///
/// `external_version` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn rtenc_check_version(external_version: *const c_char) -> bool {
    if external_version.is_null() {
        return false;
    }
    let external_version = CStr::from_ptr(external_version);
    external_version
        .to_str()
        .map(|v| v.strip_prefix(VERSION_PREFIX).unwrap_or(v) == rtenc_core::version())
        .unwrap_or(false)
}

/// Static description of an error code returned by this library.
#[no_mangle]
pub extern "C" fn rtenc_error_message(code: c_int) -> *const c_char {
    ErrorCode::from_i32(code)
        .map_or(c"unknown error", |code| code.description())
        .as_ptr()
}
