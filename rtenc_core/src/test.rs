//! Test helpers shared by this crate and its dependents.
//!
//! [`ScriptedEngine`] is an in-memory [`Engine`] that produces Annex-B shaped
//! layers without any native library. Every instance reports to an
//! [`EngineProbe`] so tests can observe what the encoder asked of it.

use crate::engine::{Engine, EngineFrame, FrameType};
use crate::error::EncoderError;
use crate::params::EncoderParams;
use crate::picture::Picture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const START_CODE: [u8; 4] = [0, 0, 0, 1];
pub const NAL_SPS: u8 = 0x67;
pub const NAL_PPS: u8 = 0x68;
pub const NAL_IDR: u8 = 0x65;
pub const NAL_SLICE: u8 = 0x41;

const DEFAULT_PAYLOAD_LEN: usize = 32;

#[derive(Default)]
struct ProbeState {
    created: AtomicUsize,
    live: AtomicUsize,
    initialized: AtomicUsize,
    forced: AtomicUsize,
    encode_calls: AtomicUsize,
    last_params: Mutex<Option<EncoderParams>>,
    timestamps: Mutex<Vec<i64>>,
}

/// Shared view into every [`ScriptedEngine`] created from it.
#[derive(Clone, Default)]
pub struct EngineProbe {
    state: Arc<ProbeState>,
}

impl EngineProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Engines created and not yet dropped.
    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn initialized(&self) -> usize {
        self.state.initialized.load(Ordering::SeqCst)
    }

    pub fn forced(&self) -> usize {
        self.state.forced.load(Ordering::SeqCst)
    }

    pub fn encode_calls(&self) -> usize {
        self.state.encode_calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<EncoderParams> {
        self.state.last_params.lock().clone()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.state.timestamps.lock().clone()
    }
}

/// One scripted engine response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Behave like a periodic real-time encoder (see [`ScriptedEngine`]).
    Auto,
    /// Report the frame as dropped by rate control.
    Skip,
    /// Report an engine failure.
    Fail,
    /// Emit exactly these layers with this frame type.
    Frame(FrameType, Vec<Vec<u8>>),
}

/// Deterministic stand-in for a native engine.
///
/// Without a script every frame is [`ScriptStep::Auto`]: the first frame, every
/// `intra_period`-th frame and any forced frame is an IDR made of SPS, PPS and
/// IDR slice layers; everything else is a single P slice layer.
pub struct ScriptedEngine {
    probe: EngineProbe,
    script: VecDeque<ScriptStep>,
    fail_init: bool,
    fail_force: bool,
    payload_len: usize,
    intra_period: u64,
    force_pending: bool,
    frame_index: u64,
    output: Vec<Vec<u8>>,
}

impl ScriptedEngine {
    pub fn new(probe: &EngineProbe) -> Self {
        probe.state.created.fetch_add(1, Ordering::SeqCst);
        probe.state.live.fetch_add(1, Ordering::SeqCst);
        Self {
            probe: probe.clone(),
            script: VecDeque::new(),
            fail_init: false,
            fail_force: false,
            payload_len: DEFAULT_PAYLOAD_LEN,
            intra_period: 0,
            force_pending: false,
            frame_index: 0,
            output: Vec::new(),
        }
    }

    /// Responses consumed one per encode call; [`ScriptStep::Auto`] afterwards.
    pub fn script(mut self, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        self.script = steps.into_iter().collect();
        self
    }

    pub fn fail_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Reject the next forced-IDR request.
    pub fn fail_force(mut self) -> Self {
        self.fail_force = true;
        self
    }

    /// Slice payload size of generated frames (excluding the NAL header).
    pub fn payload_len(mut self, len: usize) -> Self {
        self.payload_len = len;
        self
    }

    pub fn nal(nal_type: u8, payload_len: usize, fill: u8) -> Vec<u8> {
        let mut nal = Vec::with_capacity(START_CODE.len() + 1 + payload_len);
        nal.extend_from_slice(&START_CODE);
        nal.push(nal_type);
        nal.resize(START_CODE.len() + 1 + payload_len, fill);
        nal
    }

    fn auto_frame(&mut self) -> (FrameType, Vec<Vec<u8>>) {
        let periodic = self.intra_period > 0 && self.frame_index % self.intra_period == 0;
        let fill = (self.frame_index & 0xff) as u8;
        if self.frame_index == 0 || periodic || self.force_pending {
            (
                FrameType::Idr,
                vec![
                    Self::nal(NAL_SPS, 8, 0x11),
                    Self::nal(NAL_PPS, 4, 0x22),
                    Self::nal(NAL_IDR, self.payload_len * 4, fill),
                ],
            )
        } else {
            (
                FrameType::P,
                vec![Self::nal(NAL_SLICE, self.payload_len, fill)],
            )
        }
    }
}

impl Engine for ScriptedEngine {
    fn create() -> Result<Self, EncoderError> {
        Ok(Self::new(&EngineProbe::new()))
    }

    fn initialize(&mut self, params: &EncoderParams) -> Result<(), EncoderError> {
        if self.fail_init {
            return Err(EncoderError::EngineInitFailed(
                "scripted initialization failure".into(),
            ));
        }
        self.intra_period = u64::from(params.intra_period);
        *self.probe.state.last_params.lock() = Some(params.clone());
        self.probe.state.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn force_intra_frame(&mut self) -> Result<(), EncoderError> {
        if self.fail_force {
            self.fail_force = false;
            return Err(EncoderError::EncodeFailed(
                "scripted forced-IDR failure".into(),
            ));
        }
        self.force_pending = true;
        self.probe.state.forced.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn encode_frame(
        &mut self,
        _picture: &Picture<'_>,
        timestamp_ms: i64,
    ) -> Result<EngineFrame<'_>, EncoderError> {
        self.probe.state.encode_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.state.timestamps.lock().push(timestamp_ms);

        let step = self.script.pop_front().unwrap_or(ScriptStep::Auto);
        let produced = match step {
            ScriptStep::Auto => Some(self.auto_frame()),
            ScriptStep::Skip => None,
            ScriptStep::Fail => {
                self.frame_index += 1;
                return Err(EncoderError::EncodeFailed("scripted encode failure".into()));
            }
            ScriptStep::Frame(frame_type, layers) => Some((frame_type, layers)),
        };
        self.frame_index += 1;

        let Some((frame_type, layers)) = produced else {
            return Ok(EngineFrame::skipped());
        };
        if frame_type.is_keyframe() {
            self.force_pending = false;
        }
        self.output = layers;
        Ok(EngineFrame {
            frame_type,
            layers: self.output.iter().map(Vec::as_slice).collect(),
        })
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.probe.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Tightly packed mid-gray I420 frame buffer.
pub fn gray_i420(width: i32, height: i32) -> Vec<u8> {
    let (cw, ch) = (
        crate::picture::chroma_dim(width) as usize,
        crate::picture::chroma_dim(height) as usize,
    );
    vec![0x80; width as usize * height as usize + 2 * cw * ch]
}
