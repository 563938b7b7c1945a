use super::*;

#[test]
fn orientation_maps_to_exact_pixels() {
    assert_eq!(
        Orientation::Landscape.canvas(),
        Canvas {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(
        Orientation::Portrait.canvas(),
        Canvas {
            width: 1080,
            height: 1920
        }
    );
}

#[test]
fn defaults_mirror_the_app() {
    let s = VideoCompilationSettings::default();
    assert_eq!(s.orientation, Orientation::Landscape);
    assert_eq!(s.transition, TransitionStyle::Fade);
    assert!(!s.include_title_screen);
    assert!(s.music.is_none());
    assert!(!s.loop_duration.is_looping());
}

#[test]
fn title_card_requires_flag_and_text() {
    let mut s = VideoCompilationSettings {
        include_title_screen: true,
        ..Default::default()
    };
    assert!(!s.wants_title_card());
    s.title_text = "  ".to_owned();
    assert!(s.wants_title_card());
    s.title_text = "Hi".to_owned();
    assert!(s.wants_title_card());
    s.include_title_screen = false;
    assert!(!s.wants_title_card());
}

#[test]
fn loop_estimate_and_snapping() {
    assert_eq!(LoopDuration::snap_minutes(7.0).minutes, 5);
    assert_eq!(LoopDuration::snap_minutes(100.0).minutes, 120);
    assert_eq!(LoopDuration::snap_minutes(-3.0).minutes, 0);

    let hour = LoopDuration { minutes: 60 };
    assert_eq!(hour.estimated_loop_count(MediaTime::from_secs(23)), 156);
    assert_eq!(hour.estimated_loop_count(MediaTime::ZERO), 1);
    assert_eq!(
        LoopDuration::NONE.estimated_loop_count(MediaTime::from_secs(5)),
        1
    );
    assert_eq!(
        LoopDuration { minutes: 10 }.estimated_loop_count(MediaTime::from_secs(3600)),
        1
    );

    assert_eq!(LoopDuration::NONE.label(), "No loop (play once)");
    assert_eq!(LoopDuration { minutes: 60 }.label(), "1 hour");
    assert_eq!(LoopDuration { minutes: 240 }.label(), "4 hours");
    assert_eq!(LoopDuration { minutes: 15 }.label(), "15 minutes");
}

#[test]
fn music_volume_is_range_checked() {
    let mut s = VideoCompilationSettings {
        music: Some(MusicTrack {
            source: SourceHandle::new("song.m4a"),
            volume: 0.5,
        }),
        ..Default::default()
    };
    assert!(s.validate().is_ok());
    if let Some(m) = s.music.as_mut() {
        m.volume = 1.5;
    }
    assert!(s.validate().is_err());
}

#[test]
fn settings_json_uses_snake_case_and_defaults() {
    let s: VideoCompilationSettings = serde_json::from_str(
        r#"{"orientation":"portrait","transition":"none","music":{"source":"m.mp3"}}"#,
    )
    .unwrap();
    assert_eq!(s.orientation, Orientation::Portrait);
    assert_eq!(s.transition, TransitionStyle::None);
    assert_eq!(s.music.as_ref().map(|m| m.volume), Some(0.5));
    assert_eq!(s.background_color, Rgba8::BLACK);
}
