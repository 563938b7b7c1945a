use crate::foundation::core::MediaTime;
use crate::foundation::error::{CompileError, CompileResult};

/// Playback rate of the slow-motion sub-range.
pub const SLOW_MO_RATE: f64 = 0.5;

/// Opaque, stable identifier of one selected clip.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MediaId(pub uuid::Uuid);

impl MediaId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Read-only reference into the external media library.
///
/// For the ffprobe-backed resolver this is a path relative to the library root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SourceHandle(pub String);

impl SourceHandle {
    /// Create a handle from any string-like reference.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the raw reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive-exclusive slow-motion window within a clip's native timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlowMoRange {
    /// Native time where half-speed playback begins.
    pub start: MediaTime,
    /// Native time where half-speed playback ends.
    pub end: MediaTime,
}

/// One user-selected source clip with its trim and slow-motion settings.
///
/// The compiler only ever sees an immutable snapshot of these.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaItem {
    /// Stable identity for list ordering and equality in the UI.
    #[serde(default)]
    pub id: MediaId,
    /// Reference into the media library.
    pub source: SourceHandle,
    /// Cached preview image (encoded bytes); advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,
    /// Trim start in native time.
    #[serde(default)]
    pub start_time: MediaTime,
    /// Trim end in native time; `None` plays to the natural end.
    #[serde(default)]
    pub end_time: Option<MediaTime>,
    /// Optional slow-motion window, within `[start_time, end_time]`.
    #[serde(default)]
    pub slow_mo: Option<SlowMoRange>,
    /// Exclude this clip's own audio from the output.
    #[serde(default)]
    pub is_muted: bool,
}

impl MediaItem {
    /// New item with full-length trim defaults.
    pub fn new(source: SourceHandle) -> Self {
        Self {
            id: MediaId::new(),
            source,
            thumbnail: None,
            start_time: MediaTime::ZERO,
            end_time: None,
            slow_mo: None,
            is_muted: false,
        }
    }

    /// Set the trim range (builder style).
    pub fn with_trim(mut self, start: MediaTime, end: Option<MediaTime>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Set the slow-motion window (builder style).
    pub fn with_slow_mo(mut self, start: MediaTime, end: MediaTime) -> Self {
        self.slow_mo = Some(SlowMoRange { start, end });
        self
    }

    /// Set the muted flag (builder style).
    pub fn muted(mut self, muted: bool) -> Self {
        self.is_muted = muted;
        self
    }

    /// Trim end, resolving "natural end" against the clip's native duration.
    pub fn resolved_end(&self, native_duration: MediaTime) -> MediaTime {
        self.end_time.unwrap_or(native_duration)
    }

    /// Check the trim/slow-mo ordering invariants against a native duration.
    ///
    /// `start < end <= native` always; `start <= slow.start <= slow.end <= end` when slow-mo
    /// is present.
    pub fn validate(&self, native_duration: MediaTime) -> CompileResult<()> {
        let start = self.start_time;
        let end = self.resolved_end(native_duration);
        if start.0 < 0 {
            return Err(CompileError::validation(format!(
                "clip '{}': start_time must be >= 0",
                self.source
            )));
        }
        if start >= end {
            return Err(CompileError::validation(format!(
                "clip '{}': start_time {start} must be before end_time {end}",
                self.source
            )));
        }
        if end > native_duration {
            return Err(CompileError::validation(format!(
                "clip '{}': end_time {end} exceeds native duration {native_duration}",
                self.source
            )));
        }
        if let Some(slow) = self.slow_mo
            && !(start <= slow.start && slow.start <= slow.end && slow.end <= end)
        {
            return Err(CompileError::validation(format!(
                "clip '{}': slow-mo [{}, {}] must lie within trim [{start}, {end}]",
                self.source, slow.start, slow.end
            )));
        }
        Ok(())
    }

    /// Output duration this clip occupies once slow-mo scaling is applied.
    pub fn effective_duration(&self, native_duration: MediaTime) -> CompileResult<MediaTime> {
        let end = self.resolved_end(native_duration);
        match self.slow_mo {
            None => Ok(end - self.start_time),
            Some(slow) => {
                let pre = slow.start - self.start_time;
                let slowed = (slow.end - slow.start).scaled_by_rate(SLOW_MO_RATE)?;
                let post = end - slow.end;
                Ok(pre + slowed + post)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/media.rs"]
mod tests;
