use super::*;

fn secs(s: i64) -> MediaTime {
    MediaTime::from_secs(s)
}

#[test]
fn new_item_uses_full_length_defaults() {
    let item = MediaItem::new(SourceHandle::new("a.mp4"));
    assert_eq!(item.start_time, MediaTime::ZERO);
    assert_eq!(item.end_time, None);
    assert_eq!(item.slow_mo, None);
    assert!(!item.is_muted);
    assert_eq!(item.resolved_end(secs(10)), secs(10));
    assert_eq!(item.effective_duration(secs(10)).unwrap(), secs(10));
}

#[test]
fn ids_are_unique() {
    let a = MediaItem::new(SourceHandle::new("a.mp4"));
    let b = MediaItem::new(SourceHandle::new("a.mp4"));
    assert_ne!(a.id, b.id);
}

#[test]
fn effective_duration_without_slow_mo_is_trim_length() {
    let item = MediaItem::new(SourceHandle::new("a.mp4")).with_trim(secs(2), Some(secs(8)));
    assert_eq!(item.effective_duration(secs(10)).unwrap(), secs(6));
}

#[test]
fn effective_duration_with_slow_mo_doubles_window() {
    let item = MediaItem::new(SourceHandle::new("a.mp4"))
        .with_trim(secs(2), Some(secs(8)))
        .with_slow_mo(secs(4), secs(6));
    assert_eq!(item.effective_duration(secs(10)).unwrap(), secs(8));
}

#[test]
fn validate_rejects_bad_orderings() {
    let native = secs(10);
    let ok = MediaItem::new(SourceHandle::new("a.mp4"))
        .with_trim(secs(1), Some(secs(9)))
        .with_slow_mo(secs(1), secs(9));
    assert!(ok.validate(native).is_ok());

    let inverted = MediaItem::new(SourceHandle::new("a.mp4")).with_trim(secs(5), Some(secs(5)));
    assert!(inverted.validate(native).is_err());

    let past_end = MediaItem::new(SourceHandle::new("a.mp4")).with_trim(secs(0), Some(secs(11)));
    assert!(past_end.validate(native).is_err());

    let slow_outside = MediaItem::new(SourceHandle::new("a.mp4"))
        .with_trim(secs(2), Some(secs(8)))
        .with_slow_mo(secs(1), secs(3));
    assert!(slow_outside.validate(native).is_err());

    let slow_inverted = MediaItem::new(SourceHandle::new("a.mp4"))
        .with_trim(secs(2), Some(secs(8)))
        .with_slow_mo(secs(6), secs(4));
    assert!(slow_inverted.validate(native).is_err());
}

#[test]
fn deserializes_with_defaults() {
    let item: MediaItem = serde_json::from_str(
        r#"{"source":"clips/a.mp4","start_time":1.5,"slow_mo":{"start":2.0,"end":3.0}}"#,
    )
    .unwrap();
    assert_eq!(item.source.as_str(), "clips/a.mp4");
    assert_eq!(item.start_time, MediaTime::from_millis(1500));
    assert_eq!(item.end_time, None);
    assert_eq!(
        item.slow_mo,
        Some(SlowMoRange {
            start: secs(2),
            end: secs(3)
        })
    );
    assert!(!item.is_muted);
}
