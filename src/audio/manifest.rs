//! Audio manifests: which decoded source samples land where on the output sample axis.
//!
//! Two manifests exist per compile: the clip-audio manifest of the primary render (one segment
//! per audio track insertion), and the music-pass manifest (rendered audio at unity gain plus the
//! looped music at the configured volume).

use crate::assets::decode::{AudioPcm, MIX_SAMPLE_RATE};
use crate::foundation::core::{MediaTime, TICKS_PER_SEC};
use crate::foundation::error::{CompileError, CompileResult};
use crate::timeline::builder::Timeline;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One source window placed on the output sample axis.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    /// First output sample frame (inclusive).
    pub timeline_start_sample: u64,
    /// Last output sample frame (exclusive).
    pub timeline_end_sample: u64,
    /// Source read position at the segment start.
    pub source_start_sec: f64,
    /// Source position where reading stops, if bounded.
    pub source_end_sec: Option<f64>,
    /// Source seconds consumed per output second.
    pub playback_rate: f64,
    /// Constant linear gain.
    pub volume: f32,
    /// Decoded source.
    pub source: Arc<AudioPcm>,
}

/// A full mix description.
#[derive(Clone, Debug)]
pub struct AudioManifest {
    /// Output sample rate.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Output length in sample frames.
    pub total_samples: u64,
    /// Segments, summed in any order.
    pub segments: Vec<AudioSegment>,
}

impl AudioManifest {
    /// Empty stereo manifest of `duration` at [`MIX_SAMPLE_RATE`].
    pub fn silent(duration: MediaTime) -> Self {
        Self {
            sample_rate: MIX_SAMPLE_RATE,
            channels: 2,
            total_samples: time_to_sample(duration, MIX_SAMPLE_RATE),
            segments: Vec::new(),
        }
    }

    /// `true` when no segment contributes sound.
    pub fn is_silent(&self) -> bool {
        self.segments.iter().all(|s| {
            s.volume == 0.0 || s.timeline_end_sample <= s.timeline_start_sample
        })
    }
}

/// Sample frame index at output time `t` (rounded to nearest, negative clamps to zero).
pub fn time_to_sample(t: MediaTime, sample_rate: u32) -> u64 {
    if t.ticks() <= 0 {
        return 0;
    }
    let num = i128::from(t.ticks()) * i128::from(sample_rate);
    let den = i128::from(TICKS_PER_SEC);
    ((num + den / 2) / den) as u64
}

/// Build the clip-audio manifest of a timeline.
///
/// `decode` is called once per distinct source file on the audio track.
pub fn build_clip_audio_manifest(
    timeline: &Timeline,
    decode: &mut dyn FnMut(&Path) -> CompileResult<AudioPcm>,
) -> CompileResult<AudioManifest> {
    let mut manifest = AudioManifest::silent(timeline.duration());
    let mut cache: HashMap<PathBuf, Arc<AudioPcm>> = HashMap::new();

    for seg in &timeline.audio_track.segments {
        let pcm = match cache.get(&seg.path) {
            Some(pcm) => pcm.clone(),
            None => {
                let pcm = Arc::new(decode(&seg.path)?);
                cache.insert(seg.path.clone(), pcm.clone());
                pcm
            }
        };
        if pcm.frames() == 0 {
            tracing::warn!(path = %seg.path.display(), "clip audio decoded empty; segment dropped");
            continue;
        }
        manifest.segments.push(AudioSegment {
            timeline_start_sample: time_to_sample(seg.output.start, manifest.sample_rate),
            timeline_end_sample: time_to_sample(seg.output.end(), manifest.sample_rate),
            source_start_sec: seg.source.start.as_secs_f64(),
            source_end_sec: Some(seg.source.end().as_secs_f64()),
            playback_rate: seg.rate,
            volume: 1.0,
            source: pcm,
        });
    }
    Ok(manifest)
}

/// One insertion of the music file on the output timeline. Every insertion reads the music
/// from its beginning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MusicInsertion {
    /// Output time of the insertion.
    pub at: MediaTime,
    /// Length read from the start of the music file.
    pub duration: MediaTime,
}

/// Tile `music` over `video`: insertions of `min(remaining, music)` until the video is covered.
pub fn plan_music_loop(
    video: MediaTime,
    music: MediaTime,
) -> CompileResult<Vec<MusicInsertion>> {
    if !music.is_positive() {
        return Err(CompileError::track_creation(
            "music has no playable duration",
        ));
    }
    let mut out = Vec::new();
    let mut at = MediaTime::ZERO;
    while at < video {
        let duration = (video - at).min(music);
        out.push(MusicInsertion { at, duration });
        at += duration;
    }
    Ok(out)
}

/// Manifest for the music pass: `rendered` at unity gain under `music` looped at `volume`.
pub fn build_music_manifest(
    video: MediaTime,
    rendered: Option<Arc<AudioPcm>>,
    music: Arc<AudioPcm>,
    volume: f32,
) -> CompileResult<AudioManifest> {
    if music.frames() == 0 {
        return Err(CompileError::track_creation(
            "music file has no audio samples",
        ));
    }
    let music_duration =
        MediaTime::from_secs_f64(music.frames() as f64 / f64::from(music.sample_rate));
    let insertions = plan_music_loop(video, music_duration)?;

    let mut manifest = AudioManifest::silent(video);
    let sr = manifest.sample_rate;
    if let Some(pcm) = rendered
        && pcm.frames() > 0
    {
        manifest.segments.push(AudioSegment {
            timeline_start_sample: 0,
            timeline_end_sample: manifest.total_samples,
            source_start_sec: 0.0,
            source_end_sec: None,
            playback_rate: 1.0,
            volume: 1.0,
            source: pcm,
        });
    }
    for ins in insertions {
        manifest.segments.push(AudioSegment {
            timeline_start_sample: time_to_sample(ins.at, sr),
            timeline_end_sample: time_to_sample(ins.at + ins.duration, sr),
            source_start_sec: 0.0,
            source_end_sec: Some(ins.duration.as_secs_f64()),
            playback_rate: 1.0,
            volume,
            source: music.clone(),
        });
    }
    Ok(manifest)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/manifest.rs"]
mod tests;
