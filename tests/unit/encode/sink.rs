use super::*;
use crate::foundation::core::Rgba8;

#[test]
fn in_memory_sink_captures_config_and_frames() {
    let mut sink = InMemorySink::new();
    sink.begin(SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::default(),
        audio: None,
    })
    .unwrap();
    sink.push_frame(0, &FrameRGBA::filled(2, 2, Rgba8::BLACK)).unwrap();
    sink.push_frame(1, &FrameRGBA::filled(2, 2, Rgba8::WHITE)).unwrap();
    sink.end().unwrap();

    assert!(sink.ended());
    assert_eq!(sink.config().map(|c| c.width), Some(2));
    let idx: Vec<_> = sink.frames().iter().map(|(i, _)| *i).collect();
    assert_eq!(idx, vec![0, 1]);
    assert_eq!(sink.frames()[1].1.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[test]
fn begin_resets_previous_capture() {
    let mut sink = InMemorySink::new();
    let cfg = SinkConfig {
        width: 1,
        height: 1,
        fps: Fps::default(),
        audio: None,
    };
    sink.begin(cfg.clone()).unwrap();
    sink.push_frame(0, &FrameRGBA::filled(1, 1, Rgba8::BLACK)).unwrap();
    sink.end().unwrap();
    sink.begin(cfg).unwrap();
    assert!(sink.frames().is_empty());
    assert!(!sink.ended());
}
