//! Integration tests for the OpenH264-backed encoder.
//!
//! Run with: `cargo test -p rtenc_core`

#![cfg(feature = "openh264")]

use rtenc_core::{EncoderConfig, EncoderError, FrameType, H264Encoder, Picture};

const WIDTH: i32 = 640;
const HEIGHT: i32 = 360;

fn init() {
    let _ = env_logger::try_init();
}

fn config() -> EncoderConfig {
    EncoderConfig::new(WIDTH, HEIGHT, 30, 500_000, 60).threads(0)
}

/// I420 frame with a diagonal gradient that moves with `index`.
fn gradient_frame(index: usize) -> Vec<u8> {
    let (w, h) = (WIDTH as usize, HEIGHT as usize);
    let mut data = vec![128u8; w * h + 2 * (w / 2) * (h / 2)];
    for row in 0..h {
        for col in 0..w {
            data[row * w + col] = ((row + col + index * 4) & 0xff) as u8;
        }
    }
    data
}

fn output_buffer() -> Vec<u8> {
    vec![0u8; (WIDTH * HEIGHT * 3 / 2) as usize]
}

// ─── Round trip ──────────────────────────────────────────────────────────

#[test]
fn test_round_trip() {
    init();
    let mut encoder = H264Encoder::new(config()).expect("encoder creation failed");
    let mut out = output_buffer();

    let frame = gradient_frame(0);
    let pic = Picture::from_i420(WIDTH, HEIGHT, &frame).unwrap();
    let au = encoder.encode(&pic, &mut out).unwrap();
    assert!(au.keyframe, "first frame must be intra");
    assert_eq!(au.frame_type, FrameType::Idr);
    assert!(au.size > 4);
    assert_eq!(&out[..4], &[0, 0, 0, 1]);

    let mut keyframes = 0;
    for index in 1..60 {
        let frame = gradient_frame(index);
        let pic = Picture::from_i420(WIDTH, HEIGHT, &frame).unwrap();
        let au = encoder.encode(&pic, &mut out).unwrap();
        if au.keyframe {
            keyframes += 1;
        }
        if au.is_skipped() {
            assert_eq!(au.size, 0);
        }
    }
    assert!(keyframes <= 1, "unexpected keyframes: {keyframes}");

    encoder.request_keyframe().unwrap();
    let frame = gradient_frame(60);
    let pic = Picture::from_i420(WIDTH, HEIGHT, &frame).unwrap();
    let au = encoder.encode(&pic, &mut out).unwrap();
    assert!(au.keyframe, "forced frame must be intra");

    let stats = encoder.stats();
    assert_eq!(stats.frames_submitted, 61);
    assert_eq!(stats.forced_keyframes, 1);
    assert!(stats.bytes_written > 0);

    encoder.destroy();
    assert_eq!(
        encoder.encode(&pic, &mut out).unwrap_err(),
        EncoderError::NullEncoder
    );
}

#[test]
fn test_output_buffer_too_small() {
    init();
    let mut encoder = H264Encoder::new(config()).unwrap();
    let frame = gradient_frame(0);
    let pic = Picture::from_i420(WIDTH, HEIGHT, &frame).unwrap();
    let mut out = vec![0xA5u8; 16];

    let err = encoder.encode(&pic, &mut out).unwrap_err();
    assert!(matches!(
        err,
        EncoderError::OutputBufferTooSmall { capacity: 16, .. }
    ));
    assert!(out.iter().all(|b| *b == 0xA5));
}

#[test]
fn test_padded_strides() {
    init();
    let mut encoder = H264Encoder::new(config()).unwrap();
    let (y_stride, c_stride) = (WIDTH + 64, WIDTH / 2 + 32);
    let y = vec![16u8; (y_stride * HEIGHT) as usize];
    let c = vec![128u8; (c_stride * HEIGHT / 2) as usize];
    let pic = Picture::new(WIDTH, HEIGHT, &y, &c, &c, [y_stride, c_stride, c_stride]).unwrap();
    let mut out = output_buffer();

    let au = encoder.encode(&pic, &mut out).unwrap();
    assert!(au.keyframe);
}

#[test]
fn test_invalid_config() {
    init();
    let err = H264Encoder::new(EncoderConfig::new(WIDTH, HEIGHT, 30, 0, 60)).unwrap_err();
    assert!(matches!(err, EncoderError::InvalidParameter(_)));
}

#[test]
fn test_independent_encoders() {
    init();
    let handles: Vec<_> = (0..2)
        .map(|_| {
            std::thread::spawn(|| {
                let mut encoder = H264Encoder::new(config()).unwrap();
                let mut out = output_buffer();
                for index in 0..5 {
                    let frame = gradient_frame(index);
                    let pic = Picture::from_i420(WIDTH, HEIGHT, &frame).unwrap();
                    encoder.encode(&pic, &mut out).unwrap();
                }
                encoder.stats().frames_submitted
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
}
