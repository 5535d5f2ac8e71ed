//! Process-wide table of live encoders addressed by integer handles.
//!
//! Handles are issued from a monotonically increasing counter starting at 1
//! and are never reused, so a stale handle can only miss.

use lazy_static::lazy_static;
use log::debug;
use parking_lot::{const_mutex, Mutex};
use rtenc_core::{EncoderError, FrameEncoder};
use std::collections::HashMap;
use std::sync::Arc;

/// One registered encoder. The per-encoder lock serializes calls on a handle
/// without holding the table lock during an encode.
pub type SharedEncoder = Arc<Mutex<Box<dyn FrameEncoder + Send>>>;

#[derive(Default)]
struct Registry {
    encoders: HashMap<usize, SharedEncoder>,
    last_handle: usize,
}

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = const_mutex(Registry::default());
}

/// Take ownership of `encoder` and issue a handle for it.
///
/// Fails with [`EncoderError::MemoryAllocation`] if the table cannot grow; the
/// encoder is dropped in that case.
pub fn register(encoder: Box<dyn FrameEncoder + Send>) -> Result<usize, EncoderError> {
    let mut registry = REGISTRY.lock();
    registry.encoders.try_reserve(1)?;
    let handle = registry
        .last_handle
        .checked_add(1)
        .ok_or_else(|| EncoderError::MemoryAllocation("encoder handles exhausted".into()))?;
    registry.last_handle = handle;
    registry
        .encoders
        .insert(handle, Arc::new(Mutex::new(encoder)));
    debug!("Encoder handle {} registered", handle);
    Ok(handle)
}

pub fn lookup(handle: usize) -> Option<SharedEncoder> {
    if handle == 0 {
        return None;
    }
    REGISTRY.lock().encoders.get(&handle).cloned()
}

/// Remove `handle` from the table. The caller releases the returned encoder.
pub fn unregister(handle: usize) -> Option<SharedEncoder> {
    if handle == 0 {
        return None;
    }
    let removed = REGISTRY.lock().encoders.remove(&handle);
    if removed.is_some() {
        debug!("Encoder handle {} unregistered", handle);
    }
    removed
}
