use super::*;

#[test]
fn f32le_decoding_roundtrips_sample_values() {
    let mut bytes = Vec::new();
    for v in [0.0f32, 0.5, -1.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    assert_eq!(
        f32le_bytes_to_samples(&bytes).unwrap(),
        vec![0.0, 0.5, -1.0]
    );
    assert!(f32le_bytes_to_samples(&bytes[..5]).is_err());
}

#[test]
fn pcm_frame_count_uses_channels() {
    let pcm = AudioPcm {
        sample_rate: MIX_SAMPLE_RATE,
        channels: 2,
        interleaved_f32: vec![0.0; 10],
    };
    assert_eq!(pcm.frames(), 5);
}

#[test]
fn video_reader_rejects_degenerate_requests() {
    let req = VideoDecodeRequest {
        path: PathBuf::from("missing.mp4"),
        start: MediaTime::ZERO,
        sample_fps: 30.0,
        frame_count: 1,
        width: 0,
        height: 10,
    };
    assert!(matches!(
        VideoFrameReader::spawn(&req),
        Err(CompileError::Validation(_))
    ));

    let req = VideoDecodeRequest {
        width: 10,
        sample_fps: 0.0,
        ..req
    };
    assert!(matches!(
        VideoFrameReader::spawn(&req),
        Err(CompileError::Validation(_))
    ));
}
