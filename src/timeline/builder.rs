//! Timeline assembly: clips, trims and slow-motion windows onto one contiguous output axis.
//!
//! Each clip contributes up to three sub-ranges (pre-slow-mo, slow-mo, post-slow-mo). Sub-ranges
//! are appended at a shared write cursor; the cursor advances by each sub-range's *output*
//! duration, so a half-speed window occupies twice its source length.

use crate::assets::resolver::ResolvedClip;
use crate::foundation::core::{Canvas, Fps, MediaTime, TimeRange};
use crate::foundation::error::{CompileError, CompileResult};
use crate::model::media::{MediaId, MediaItem, SLOW_MO_RATE, SourceHandle};
use crate::model::settings::VideoCompilationSettings;
use crate::timeline::transform::ClipTransform;
use std::path::PathBuf;

/// A contiguous portion of a clip's native timeline played at one constant rate.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubRange {
    /// Native start time.
    pub source_start: MediaTime,
    /// Native span length.
    pub source_duration: MediaTime,
    /// Playback rate multiplier (1.0 normal, 0.5 half speed).
    pub rate: f64,
    /// Where this sub-range begins on the output timeline.
    pub output_start: MediaTime,
    /// Output span length (`source_duration / rate`).
    pub output_duration: MediaTime,
}

impl SubRange {
    /// Output span as a range.
    pub fn output_range(&self) -> TimeRange {
        TimeRange {
            start: self.output_start,
            duration: self.output_duration,
        }
    }

    /// Native time shown at output time `t` (clamped into the sub-range).
    pub fn source_time_at(&self, t: MediaTime) -> MediaTime {
        let rel = (t - self.output_start).max(MediaTime::ZERO).min(self.output_duration);
        let src = MediaTime::from_secs_f64(rel.as_secs_f64() * self.rate);
        self.source_start + src.min(self.source_duration)
    }
}

/// One clip placed on the output timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlacedClip {
    /// Position of the clip in the caller's media list.
    pub media_index: usize,
    /// Identity of the source [`MediaItem`].
    pub media_id: MediaId,
    /// Handle the clip was resolved from.
    pub source: SourceHandle,
    /// File backing the resolved asset.
    pub path: PathBuf,
    /// Output timeline offset of the clip's first frame.
    pub composition_start: MediaTime,
    /// Output span after slow-mo scaling.
    pub effective_duration: MediaTime,
    /// Non-empty sub-ranges in playback order.
    pub sub_ranges: Vec<SubRange>,
    /// Aspect-fit framing for the clip's whole span.
    pub transform: ClipTransform,
    /// Whether the clip's own audio was placed on the audio track.
    pub has_audio: bool,
}

impl PlacedClip {
    /// Output span as a range.
    pub fn output_range(&self) -> TimeRange {
        TimeRange {
            start: self.composition_start,
            duration: self.effective_duration,
        }
    }

    /// Exclusive end on the output timeline.
    pub fn composition_end(&self) -> MediaTime {
        self.composition_start + self.effective_duration
    }
}

/// A clip left out of the timeline, surfaced as a non-fatal diagnostic.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SkippedClip {
    /// Position of the clip in the caller's media list.
    pub media_index: usize,
    /// Identity of the source [`MediaItem`].
    pub media_id: MediaId,
    /// Handle of the skipped clip.
    pub source: SourceHandle,
    /// Why the clip was skipped.
    pub reason: String,
}

/// Media kind of an output track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Picture track; must stay gap-free.
    Video,
    /// Sound track; may have silent gaps (muted clips, clips without audio).
    Audio,
}

/// One source window inserted into an output track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackSegment {
    /// Index into [`Timeline::clips`].
    pub clip: usize,
    /// Source container.
    pub path: PathBuf,
    /// Native source window.
    pub source: TimeRange,
    /// Playback rate multiplier.
    pub rate: f64,
    /// Output window.
    pub output: TimeRange,
}

/// An append-only output track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputTrack {
    /// Media kind.
    pub kind: TrackKind,
    /// Segments in output order.
    pub segments: Vec<TrackSegment>,
}

impl OutputTrack {
    /// Allocate an empty track.
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            segments: Vec::new(),
        }
    }

    /// Output time just past the last segment.
    pub fn end(&self) -> MediaTime {
        self.segments
            .last()
            .map(|s| s.output.end())
            .unwrap_or(MediaTime::ZERO)
    }

    /// Append a segment. Overlaps are rejected; video additionally rejects gaps.
    pub fn insert(&mut self, seg: TrackSegment) -> CompileResult<()> {
        if seg.output.is_empty() {
            return Err(CompileError::validation("cannot insert an empty segment"));
        }
        let end = self.end();
        if seg.output.start < end {
            return Err(CompileError::validation(format!(
                "{:?} segment at {} overlaps track end {end}",
                self.kind, seg.output.start
            )));
        }
        if self.kind == TrackKind::Video && seg.output.start != end {
            return Err(CompileError::validation(format!(
                "video segment at {} leaves a gap after {end}",
                seg.output.start
            )));
        }
        self.segments.push(seg);
        Ok(())
    }
}

/// The assembled output timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    /// Placed clips, contiguous and non-overlapping.
    pub clips: Vec<PlacedClip>,
    /// Clips omitted because their asset had no video track.
    pub skipped: Vec<SkippedClip>,
    /// Picture track.
    pub video_track: OutputTrack,
    /// Clip-audio track.
    pub audio_track: OutputTrack,
}

impl Timeline {
    /// Total output duration (sum of effective durations).
    pub fn duration(&self) -> MediaTime {
        self.clips.iter().map(|c| c.effective_duration).sum()
    }

    /// Output timestamps where one clip ends and the next begins.
    pub fn boundaries(&self) -> Vec<MediaTime> {
        if self.clips.len() < 2 {
            return Vec::new();
        }
        self.clips[..self.clips.len() - 1]
            .iter()
            .map(PlacedClip::composition_end)
            .collect()
    }

    /// Clip and sub-range visible at output time `t`.
    pub fn locate(&self, t: MediaTime) -> Option<(&PlacedClip, &SubRange)> {
        let idx = self
            .clips
            .partition_point(|c| c.composition_end() <= t);
        let clip = self.clips.get(idx)?;
        if !clip.output_range().contains(t) {
            return None;
        }
        let sub = clip
            .sub_ranges
            .iter()
            .find(|s| s.output_range().contains(t))?;
        Some((clip, sub))
    }

    /// Check record contiguity and track agreement.
    pub fn validate(&self) -> CompileResult<()> {
        let mut cursor = MediaTime::ZERO;
        for (i, clip) in self.clips.iter().enumerate() {
            if clip.composition_start != cursor {
                return Err(CompileError::validation(format!(
                    "timeline record {i} starts at {} but previous ended at {cursor}",
                    clip.composition_start
                )));
            }
            let sub_total: MediaTime = clip.sub_ranges.iter().map(|s| s.output_duration).sum();
            if sub_total != clip.effective_duration {
                return Err(CompileError::validation(format!(
                    "timeline record {i} sub-ranges sum to {sub_total}, expected {}",
                    clip.effective_duration
                )));
            }
            cursor += clip.effective_duration;
        }
        if self.video_track.end() != cursor {
            return Err(CompileError::validation(format!(
                "video track ends at {} but timeline ends at {cursor}",
                self.video_track.end()
            )));
        }
        Ok(())
    }
}

/// Transform instruction for one placed clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipInstruction {
    /// Index into [`Timeline::clips`].
    pub clip: usize,
    /// Output span the transform applies to.
    pub time_range: TimeRange,
    /// Framing for the span.
    pub transform: ClipTransform,
}

/// Everything the renderer needs besides the overlay stack.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderInstructionSet {
    /// Output canvas.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// One instruction per placed clip, in timeline order.
    pub clip_instructions: Vec<ClipInstruction>,
    /// Output timestamps of clip boundaries (none after the last clip).
    pub boundaries: Vec<MediaTime>,
}

/// Split one clip's trim window into its non-empty sub-ranges (output offsets relative to 0).
pub fn split_sub_ranges(
    item: &MediaItem,
    native_duration: MediaTime,
) -> CompileResult<Vec<SubRange>> {
    let start = item.start_time;
    let end = item.resolved_end(native_duration);

    let mut pieces: Vec<(MediaTime, MediaTime, f64)> = Vec::with_capacity(3);
    match item.slow_mo {
        None => pieces.push((start, end - start, 1.0)),
        Some(slow) => {
            pieces.push((start, slow.start - start, 1.0));
            pieces.push((slow.start, slow.end - slow.start, SLOW_MO_RATE));
            pieces.push((slow.end, end - slow.end, 1.0));
        }
    }

    let mut out = Vec::with_capacity(pieces.len());
    let mut cursor = MediaTime::ZERO;
    for (source_start, source_duration, rate) in pieces {
        if !source_duration.is_positive() {
            continue;
        }
        let output_duration = source_duration.scaled_by_rate(rate)?;
        out.push(SubRange {
            source_start,
            source_duration,
            rate,
            output_start: cursor,
            output_duration,
        });
        cursor += output_duration;
    }
    Ok(out)
}

/// Build the timeline and its render instructions.
///
/// `resolved[i]` must be the asset for `items[i]`. `on_clip(i, n)` is called before each clip is
/// processed. Clips whose asset has no video track are skipped and recorded in
/// [`Timeline::skipped`].
#[tracing::instrument(skip_all, fields(clips = items.len()))]
pub fn build_timeline(
    items: &[MediaItem],
    resolved: &[ResolvedClip],
    settings: &VideoCompilationSettings,
    fps: Fps,
    on_clip: &mut dyn FnMut(usize, usize),
) -> CompileResult<(Timeline, RenderInstructionSet)> {
    if items.len() != resolved.len() {
        return Err(CompileError::validation(format!(
            "got {} resolved assets for {} media items",
            resolved.len(),
            items.len()
        )));
    }

    let canvas = settings.canvas();
    let mut timeline = Timeline {
        clips: Vec::with_capacity(items.len()),
        skipped: Vec::new(),
        video_track: OutputTrack::new(TrackKind::Video),
        audio_track: OutputTrack::new(TrackKind::Audio),
    };
    let mut instructions = Vec::with_capacity(items.len());
    let mut cursor = MediaTime::ZERO;

    for (media_index, (item, asset)) in items.iter().zip(resolved).enumerate() {
        on_clip(media_index, items.len());

        let Some(video) = asset.video else {
            tracing::warn!(
                media_index,
                source = %item.source,
                "asset has no video track; clip skipped"
            );
            timeline.skipped.push(SkippedClip {
                media_index,
                media_id: item.id,
                source: item.source.clone(),
                reason: "asset has no video track".to_owned(),
            });
            continue;
        };

        item.validate(asset.duration)?;
        let mut sub_ranges = split_sub_ranges(item, asset.duration)?;
        let clip_idx = timeline.clips.len();
        let clip_start = cursor;
        let wants_audio = !item.is_muted && asset.has_audio;
        let mut audio_placed = false;

        for sub in &mut sub_ranges {
            sub.output_start = cursor;
            let source = TimeRange::new(sub.source_start, sub.source_duration)?;
            let output = TimeRange::new(cursor, sub.output_duration)?;
            timeline.video_track.insert(TrackSegment {
                clip: clip_idx,
                path: asset.path.clone(),
                source,
                rate: sub.rate,
                output,
            })?;

            if wants_audio {
                let seg = TrackSegment {
                    clip: clip_idx,
                    path: asset.path.clone(),
                    source,
                    rate: sub.rate,
                    output,
                };
                match timeline.audio_track.insert(seg) {
                    Ok(()) => audio_placed = true,
                    Err(e) => tracing::warn!(
                        media_index,
                        source = %item.source,
                        error = %e,
                        "audio insert failed; sub-range continues video-only"
                    ),
                }
            }
            cursor += sub.output_duration;
        }

        let effective_duration = cursor - clip_start;
        let transform = ClipTransform::aspect_fit(video, canvas);
        tracing::debug!(
            media_index,
            source = %item.source,
            start = %clip_start,
            duration = %effective_duration,
            sub_ranges = sub_ranges.len(),
            scale = transform.scale,
            "clip placed"
        );

        instructions.push(ClipInstruction {
            clip: clip_idx,
            time_range: TimeRange::new(clip_start, effective_duration)?,
            transform,
        });
        timeline.clips.push(PlacedClip {
            media_index,
            media_id: item.id,
            source: item.source.clone(),
            path: asset.path.clone(),
            composition_start: clip_start,
            effective_duration,
            sub_ranges,
            transform,
            has_audio: audio_placed,
        });
    }

    let boundaries = timeline.boundaries();
    Ok((
        timeline,
        RenderInstructionSet {
            canvas,
            fps,
            clip_instructions: instructions,
            boundaries,
        },
    ))
}

/// Output duration of `items` without rendering, for settings-screen estimates.
///
/// `native_durations[i]` is the native length of `items[i]`; `None` marks a clip that will be
/// skipped.
pub fn estimate_output_duration(
    items: &[MediaItem],
    native_durations: &[Option<MediaTime>],
) -> CompileResult<MediaTime> {
    if items.len() != native_durations.len() {
        return Err(CompileError::validation(
            "native_durations must match media items one-to-one",
        ));
    }
    let mut total = MediaTime::ZERO;
    for (item, native) in items.iter().zip(native_durations) {
        let Some(native) = native else { continue };
        total += item.effective_duration(*native)?;
    }
    Ok(total)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
