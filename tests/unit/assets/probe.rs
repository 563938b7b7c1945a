use super::*;

const PORTRAIT_PHONE_CLIP: &str = r#"{
  "streams": [
    {
      "codec_type": "video",
      "width": 1920,
      "height": 1080,
      "duration": "9.980000",
      "side_data_list": [{ "side_data_type": "Display Matrix", "rotation": -90 }]
    },
    { "codec_type": "audio", "duration": "10.000000" }
  ],
  "format": { "duration": "10.010000" }
}"#;

#[test]
fn parses_duration_geometry_rotation_and_audio() {
    let probe = parse_probe_json(Path::new("clip.mov"), PORTRAIT_PHONE_CLIP.as_bytes()).unwrap();
    assert_eq!(probe.duration, MediaTime::from_millis(10_010));
    assert_eq!(
        probe.video,
        Some(VideoStreamInfo {
            width: 1920,
            height: 1080,
            rotation_deg: 270,
        })
    );
    assert!(probe.has_audio);
}

#[test]
fn legacy_rotate_tag_and_stream_duration_fallback() {
    let json = r#"{
      "streams": [
        { "codec_type": "video", "width": 640, "height": 480, "duration": "4.5",
          "tags": { "rotate": "90" } }
      ]
    }"#;
    let probe = parse_probe_json(Path::new("old.mp4"), json.as_bytes()).unwrap();
    assert_eq!(probe.duration, MediaTime::from_millis(4500));
    assert_eq!(probe.video.map(|v| v.rotation_deg), Some(90));
    assert!(!probe.has_audio);
}

#[test]
fn audio_only_file_has_no_video_track() {
    let json = r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"3.0"}}"#;
    let probe = parse_probe_json(Path::new("song.m4a"), json.as_bytes()).unwrap();
    assert!(probe.video.is_none());
    assert!(probe.has_audio);
    assert_eq!(probe.duration, MediaTime::from_secs(3));
}

#[test]
fn missing_duration_is_a_clip_load_error() {
    let json = r#"{"streams":[{"codec_type":"video","width":2,"height":2}]}"#;
    let err = parse_probe_json(Path::new("x.mp4"), json.as_bytes()).unwrap_err();
    assert!(matches!(err, CompileError::ClipLoadFailed { .. }));
}

#[test]
fn rotation_normalizes_to_quarter_turns() {
    assert_eq!(normalize_rotation(0.0), 0);
    assert_eq!(normalize_rotation(-90.0), 270);
    assert_eq!(normalize_rotation(90.0), 90);
    assert_eq!(normalize_rotation(180.0), 180);
    assert_eq!(normalize_rotation(-180.0), 180);
    assert_eq!(normalize_rotation(450.0), 90);
    assert_eq!(normalize_rotation(f64::NAN), 0);
}
