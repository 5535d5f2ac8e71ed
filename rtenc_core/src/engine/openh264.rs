//! OpenH264-backed engine.
//!
//! The native encoder is reached through its C vtable. Every vtable slot is
//! looked up lazily and a missing slot is reported as an error of the phase
//! that needed it rather than as a panic.

use super::{Engine, EngineFrame, FrameType};
use crate::error::EncoderError;
use crate::params::{
    EncoderParams, ParameterSetStrategy, PixelFormat, Profile, RateControlMode, SliceMode,
    UsageType,
};
use crate::picture::{Picture, PLANE_U, PLANE_V, PLANE_Y};
use log::{debug, error};
use openh264_sys2 as sys;
use openh264_sys2::API;
use std::ffi::c_int;
use std::mem::MaybeUninit;

/// One native OpenH264 encoder instance.
pub struct OpenH264Engine {
    api: sys::DynamicAPI,
    inner: *mut sys::ISVCEncoder,
    initialized: bool,
    // Reused between calls; the layer pointers inside refer to engine-owned memory.
    info: Box<sys::SFrameBSInfo>,
}

// Safety: the native instance is only touched through `&mut self`, and the
// encoder does not depend on thread-local state of the creating thread.
unsafe impl Send for OpenH264Engine {}

impl std::fmt::Debug for OpenH264Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenH264Engine")
            .field("inner", &self.inner)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl OpenH264Engine {
    fn vtbl(&self) -> &sys::ISVCEncoderVtbl {
        // Safety: `inner` is non-null for the whole lifetime of `self`
        // (checked in `create`) and points to the engine's vtable pointer.
        unsafe { &**self.inner }
    }

    fn apply_params(param: &mut sys::SEncParamExt, params: &EncoderParams) {
        param.iUsageType = match params.usage {
            UsageType::CameraVideoRealTime => sys::CAMERA_VIDEO_REAL_TIME,
        };
        param.iPicWidth = params.width;
        param.iPicHeight = params.height;
        param.iTargetBitrate = params.target_bitrate;
        param.iMaxBitrate = params.max_bitrate;
        param.iRCMode = match params.rc_mode {
            RateControlMode::Bitrate => sys::RC_BITRATE_MODE,
        };
        param.fMaxFrameRate = params.max_frame_rate;
        param.uiIntraPeriod = params.intra_period;
        param.iTemporalLayerNum = params.temporal_layers;
        param.iSpatialLayerNum = params.spatial_layers.len() as c_int;
        param.eSpsPpsIdStrategy = match params.sps_pps_strategy {
            ParameterSetStrategy::ConstantId => sys::CONSTANT_ID,
        };
        param.bEnableDenoise = params.denoise;
        param.bEnableBackgroundDetection = params.background_detection;
        param.bEnableAdaptiveQuant = params.adaptive_quant;
        param.bEnableFrameSkip = params.frame_skip;
        param.bEnableLongTermReference = params.long_term_reference;
        param.iLoopFilterDisableIdc = params.loop_filter.disable_idc;
        param.iLoopFilterAlphaC0Offset = params.loop_filter.alpha_c0_offset;
        param.iLoopFilterBetaOffset = params.loop_filter.beta_offset;
        param.iMultipleThreadIdc = params.threads;

        for (slot, layer) in param.sSpatialLayers.iter_mut().zip(&params.spatial_layers) {
            slot.iVideoWidth = layer.width;
            slot.iVideoHeight = layer.height;
            slot.fFrameRate = layer.frame_rate;
            slot.iSpatialBitrate = layer.bitrate;
            slot.iMaxSpatialBitrate = layer.max_bitrate;
            slot.uiProfileIdc = match layer.profile {
                Profile::Baseline => sys::PRO_BASELINE,
            };
            slot.iDLayerQp = layer.qp;
            slot.sSliceArgument.uiSliceMode = match layer.slice_mode {
                SliceMode::Single => sys::SM_SINGLE_SLICE,
            };
        }
    }
}

#[allow(non_upper_case_globals)]
fn frame_type(native: sys::EVideoFrameType) -> FrameType {
    match native {
        sys::videoFrameTypeIDR => FrameType::Idr,
        sys::videoFrameTypeI => FrameType::I,
        sys::videoFrameTypeP => FrameType::P,
        sys::videoFrameTypeSkip => FrameType::Skip,
        sys::videoFrameTypeIPMixed => FrameType::IpMixed,
        _ => FrameType::Invalid,
    }
}

impl Engine for OpenH264Engine {
    fn create() -> Result<Self, EncoderError> {
        let api = sys::DynamicAPI::from_source();
        let mut inner: *mut sys::ISVCEncoder = std::ptr::null_mut();
        let code = unsafe { api.WelsCreateSVCEncoder(&mut inner) };
        if code != 0 || inner.is_null() {
            return Err(EncoderError::EngineCreateFailed(format!(
                "WelsCreateSVCEncoder() failed: code={code}"
            )));
        }
        // Safety: an all-zero SFrameBSInfo is a valid "no layers" value.
        let info = Box::new(unsafe { MaybeUninit::<sys::SFrameBSInfo>::zeroed().assume_init() });
        debug!("OpenH264 encoder instance created: {:?}", inner);
        Ok(Self {
            api,
            inner,
            initialized: false,
            info,
        })
    }

    fn initialize(&mut self, params: &EncoderParams) -> Result<(), EncoderError> {
        let unavailable =
            |name: &str| EncoderError::EngineInitFailed(format!("{name} is unavailable"));
        let vtbl = self.vtbl();
        let get_default_params = vtbl
            .GetDefaultParams
            .ok_or_else(|| unavailable("ISVCEncoder.GetDefaultParams"))?;
        let initialize_ext = vtbl
            .InitializeExt
            .ok_or_else(|| unavailable("ISVCEncoder.InitializeExt"))?;
        let set_option = vtbl
            .SetOption
            .ok_or_else(|| unavailable("ISVCEncoder.SetOption"))?;

        // Safety: SEncParamExt is plain data and is filled by GetDefaultParams.
        let mut param = unsafe { MaybeUninit::<sys::SEncParamExt>::zeroed().assume_init() };
        let code = unsafe { get_default_params(self.inner, &mut param) };
        if code != 0 {
            return Err(EncoderError::EngineInitFailed(format!(
                "ISVCEncoder.GetDefaultParams() failed: code={code}"
            )));
        }

        Self::apply_params(&mut param, params);

        let code = unsafe { initialize_ext(self.inner, &mut param) };
        if code != 0 {
            return Err(EncoderError::EngineInitFailed(format!(
                "ISVCEncoder.InitializeExt() rejected {}x{} @ {} bps: code={code}",
                params.width, params.height, params.target_bitrate
            )));
        }
        self.initialized = true;

        let mut format = match params.input_format {
            PixelFormat::I420 => sys::videoFormatI420,
        };
        let code = unsafe {
            set_option(
                self.inner,
                sys::ENCODER_OPTION_DATAFORMAT,
                (&mut format as *mut sys::EVideoFormatType).cast(),
            )
        };
        if code != 0 {
            return Err(EncoderError::EngineInitFailed(format!(
                "ISVCEncoder.SetOption(DATAFORMAT) failed: code={code}"
            )));
        }

        debug!(
            "OpenH264 encoder initialized: {}x{}, {} fps, {} bps (max {}), intra period {}, {} thread(s)",
            params.width,
            params.height,
            params.max_frame_rate,
            params.target_bitrate,
            params.max_bitrate,
            params.intra_period,
            params.threads
        );
        Ok(())
    }

    fn force_intra_frame(&mut self) -> Result<(), EncoderError> {
        let force_intra_frame = self.vtbl().ForceIntraFrame.ok_or_else(|| {
            EncoderError::EncodeFailed("ISVCEncoder.ForceIntraFrame is unavailable".into())
        })?;
        let code = unsafe { force_intra_frame(self.inner, true) };
        if code != 0 {
            return Err(EncoderError::EncodeFailed(format!(
                "ISVCEncoder.ForceIntraFrame() failed: code={code}"
            )));
        }
        Ok(())
    }

    fn encode_frame(
        &mut self,
        picture: &Picture<'_>,
        timestamp_ms: i64,
    ) -> Result<EngineFrame<'_>, EncoderError> {
        let encode_frame = self.vtbl().EncodeFrame.ok_or_else(|| {
            EncoderError::EncodeFailed("ISVCEncoder.EncodeFrame is unavailable".into())
        })?;

        // Safety: SSourcePicture is plain data; unused plane slots stay null.
        let mut source = unsafe { MaybeUninit::<sys::SSourcePicture>::zeroed().assume_init() };
        source.iColorFormat = sys::videoFormatI420 as c_int;
        source.iPicWidth = picture.width();
        source.iPicHeight = picture.height();
        for plane in [PLANE_Y, PLANE_U, PLANE_V] {
            source.iStride[plane] = picture.stride(plane);
            // The engine only reads from the source planes.
            source.pData[plane] = picture.plane(plane).as_ptr().cast_mut();
        }
        source.uiTimeStamp = timestamp_ms;

        *self.info = unsafe { MaybeUninit::<sys::SFrameBSInfo>::zeroed().assume_init() };
        let code = unsafe { encode_frame(self.inner, &mut source, &mut *self.info) };
        if code != 0 {
            error!("ISVCEncoder.EncodeFrame() failed: code={code}");
            return Err(EncoderError::EncodeFailed(format!(
                "ISVCEncoder.EncodeFrame() failed: code={code}"
            )));
        }

        let info: &sys::SFrameBSInfo = &self.info;
        let frame_type = frame_type(info.eFrameType);
        if frame_type == FrameType::Skip {
            return Ok(EngineFrame::skipped());
        }

        let layer_count = info.iLayerNum.max(0) as usize;
        let mut layers = Vec::with_capacity(layer_count);
        for layer in info.sLayerInfo.iter().take(layer_count) {
            // With a zero NAL count the length pointer may be dangling.
            if layer.iNalCount <= 0 || layer.pNalLengthInByte.is_null() || layer.pBsBuf.is_null() {
                continue;
            }
            let size = unsafe {
                std::slice::from_raw_parts(layer.pNalLengthInByte, layer.iNalCount as usize)
            }
            .iter()
            .map(|len| (*len).max(0) as usize)
            .sum::<usize>();
            // Safety: the NALs of one layer are stored contiguously in pBsBuf
            // and stay valid until the next call on this engine.
            layers.push(unsafe { std::slice::from_raw_parts(layer.pBsBuf as *const u8, size) });
        }

        Ok(EngineFrame { frame_type, layers })
    }
}

impl Drop for OpenH264Engine {
    fn drop(&mut self) {
        unsafe {
            if self.initialized {
                if let Some(uninitialize) = self.vtbl().Uninitialize {
                    uninitialize(self.inner);
                }
            }
            self.api.WelsDestroySVCEncoder(self.inner);
        }
        debug!("OpenH264 encoder instance released: {:?}", self.inner);
    }
}
