//! Export passes: the primary render of timeline plus overlays, and the music post-process.

use crate::assets::decode::{
    AudioPcm, MIX_SAMPLE_RATE, VideoDecodeRequest, VideoFrameReader, decode_audio_f32_stereo,
};
use crate::assets::probe::probe_media;
use crate::assets::resolver::ResolvedClip;
use crate::audio::manifest::{build_clip_audio_manifest, build_music_manifest};
use crate::audio::mix::{mix_manifest, write_mix_to_f32le_file};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, QualityPreset, remux_with_audio};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::error::{CompileError, CompileResult};
use crate::overlay::stack::OverlayStack;
use crate::pipeline::progress::CancelToken;
use crate::render::compose::{FrameComposer, FrameSpan, plan_frame_spans};
use crate::timeline::builder::{RenderInstructionSet, Timeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Inputs of the primary export.
#[derive(Clone, Copy, Debug)]
pub struct PrimaryRender<'a> {
    /// Assembled timeline (tracks and clip records).
    pub timeline: &'a Timeline,
    /// Per-clip transforms and boundaries.
    pub instructions: &'a RenderInstructionSet,
    /// Layers drawn over the video.
    pub overlays: &'a OverlayStack,
    /// Container file to write.
    pub out_path: &'a Path,
}

/// Inputs of the music post-process.
#[derive(Clone, Copy, Debug)]
pub struct MusicPass<'a> {
    /// Output of the primary export.
    pub rendered: &'a Path,
    /// Resolved music asset.
    pub music: &'a ResolvedClip,
    /// Constant music gain in `[0, 1]`.
    pub volume: f32,
    /// Container file to write.
    pub out_path: &'a Path,
}

/// Drives export passes. Each call either produces its output file or fails; no partial output
/// is promised.
pub trait Renderer: Send + Sync {
    /// Render the timeline with overlays at the instruction set's fps and canvas.
    fn render_primary(&self, job: &PrimaryRender<'_>, cancel: &CancelToken) -> CompileResult<()>;

    /// Re-mux `job.rendered` against its own audio plus looped music.
    fn render_with_music(&self, job: &MusicPass<'_>, cancel: &CancelToken) -> CompileResult<()>;
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn render_primary(&self, job: &PrimaryRender<'_>, cancel: &CancelToken) -> CompileResult<()> {
        (**self).render_primary(job, cancel)
    }

    fn render_with_music(&self, job: &MusicPass<'_>, cancel: &CancelToken) -> CompileResult<()> {
        (**self).render_with_music(job, cancel)
    }
}

/// Renderer backed by the system `ffmpeg`.
#[derive(Clone, Debug, Default)]
pub struct FfmpegRenderer {
    /// Encoder quality.
    pub quality: QualityPreset,
    /// Replace existing output files.
    pub overwrite: bool,
}

impl FfmpegRenderer {
    /// Renderer with the given quality, overwriting outputs.
    pub fn new(quality: QualityPreset) -> Self {
        Self {
            quality,
            overwrite: true,
        }
    }

    fn mix_clip_audio(
        &self,
        timeline: &Timeline,
        out_path: &Path,
    ) -> CompileResult<Option<PathBuf>> {
        let manifest = build_clip_audio_manifest(timeline, &mut |path| {
            decode_audio_f32_stereo(path, MIX_SAMPLE_RATE).or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "clip audio decode failed; clip continues silent"
                );
                Ok(silent_pcm())
            })
        })?;
        if manifest.is_silent() {
            return Ok(None);
        }
        let audio_path = out_path.with_extension("clips.f32le");
        write_mix_to_f32le_file(&mix_manifest(&manifest), &audio_path)?;
        Ok(Some(audio_path))
    }

    fn encode_frames(
        &self,
        job: &PrimaryRender<'_>,
        audio: Option<&Path>,
        cancel: &CancelToken,
    ) -> CompileResult<()> {
        let ins = job.instructions;
        let bg = job.overlays.backdrop_color().unwrap_or_default();
        let mut sink = FfmpegSink::new(FfmpegSinkOpts {
            out_path: job.out_path.to_path_buf(),
            overwrite: self.overwrite,
            bg_rgba: [bg.r, bg.g, bg.b, 255],
            quality: self.quality,
        });
        let cfg = SinkConfig {
            width: ins.canvas.width,
            height: ins.canvas.height,
            fps: ins.fps,
            audio: audio.map(|path| AudioInputConfig {
                path: path.to_path_buf(),
                sample_rate: MIX_SAMPLE_RATE,
                channels: 2,
            }),
        };
        push_composed_frames(job, cfg, &mut sink, open_span_decoder, cancel)?;
        Ok(())
    }
}

/// Decoded frames of one [`FrameSpan`], in output order.
pub(crate) trait SpanFrames {
    /// Next upright frame sized to the span placement, `None` once the source runs dry.
    fn next_frame(&mut self) -> CompileResult<Option<Vec<u8>>>;
    /// Close the decoder after the span's last frame.
    fn finish(self: Box<Self>) -> CompileResult<()>;
}

impl SpanFrames for VideoFrameReader {
    fn next_frame(&mut self) -> CompileResult<Option<Vec<u8>>> {
        VideoFrameReader::next_frame(self)
    }

    fn finish(self: Box<Self>) -> CompileResult<()> {
        VideoFrameReader::finish(*self)
    }
}

fn open_span_decoder(span: &FrameSpan) -> CompileResult<Box<dyn SpanFrames>> {
    let at = span.placement;
    let reader = VideoFrameReader::spawn(&VideoDecodeRequest {
        path: span.path.clone(),
        start: span.source_start,
        sample_fps: span.sample_fps,
        frame_count: span.frame_count,
        width: at.width,
        height: at.height,
    })?;
    Ok(Box::new(reader))
}

/// Compose every output frame of `job` and push it to `sink`. Returns the frame count.
fn push_composed_frames(
    job: &PrimaryRender<'_>,
    cfg: SinkConfig,
    sink: &mut dyn FrameSink,
    mut open_span: impl FnMut(&FrameSpan) -> CompileResult<Box<dyn SpanFrames>>,
    cancel: &CancelToken,
) -> CompileResult<u64> {
    let ins = job.instructions;
    let composer = FrameComposer::new(ins.canvas, job.overlays)?;
    let spans = plan_frame_spans(job.timeline, ins)?;

    sink.begin(cfg)?;
    let mut pushed = 0u64;
    for span in &spans {
        let at = span.placement;
        let mut frames = open_span(span)?;
        let mut held: Option<Vec<u8>> = None;
        for idx in span.first_frame..span.first_frame + span.frame_count {
            cancel.check()?;
            // Short sources hold their last decoded frame.
            if let Some(px) = frames.next_frame()? {
                held = Some(px);
            }
            let t = ins.fps.frame_time(idx);
            let frame = composer.compose(t, held.as_deref().map(|px| (px, at)))?;
            sink.push_frame(idx, &frame)?;
            pushed += 1;
        }
        frames.finish()?;
    }
    sink.end()?;

    tracing::debug!(frames = pushed, spans = spans.len(), "frames encoded");
    Ok(pushed)
}

impl Renderer for FfmpegRenderer {
    #[tracing::instrument(skip(self, job, cancel), fields(out = %job.out_path.display()))]
    fn render_primary(&self, job: &PrimaryRender<'_>, cancel: &CancelToken) -> CompileResult<()> {
        cancel.check()?;
        let audio = self
            .mix_clip_audio(job.timeline, job.out_path)
            .map_err(CompileError::wrap_export)?;
        let encoded = self.encode_frames(job, audio.as_deref(), cancel);
        if let Some(path) = &audio {
            let _ = std::fs::remove_file(path);
        }
        encoded.map_err(CompileError::wrap_export)?;
        tracing::info!(out = %job.out_path.display(), "primary export finished");
        Ok(())
    }

    #[tracing::instrument(skip(self, job, cancel), fields(out = %job.out_path.display()))]
    fn render_with_music(&self, job: &MusicPass<'_>, cancel: &CancelToken) -> CompileResult<()> {
        cancel.check()?;
        let rendered = probe_media(job.rendered).map_err(CompileError::wrap_export)?;
        if rendered.video.is_none() {
            return Err(CompileError::track_creation(format!(
                "rendered file '{}' has no video track",
                job.rendered.display()
            )));
        }
        if !job.music.has_audio {
            return Err(CompileError::track_creation(format!(
                "music '{}' has no audio track",
                job.music.handle
            )));
        }

        let own = decode_audio_f32_stereo(job.rendered, MIX_SAMPLE_RATE)
            .map_err(CompileError::wrap_export)?;
        let music = decode_audio_f32_stereo(&job.music.path, MIX_SAMPLE_RATE)
            .map_err(CompileError::wrap_export)?;
        let own = (own.frames() > 0).then(|| Arc::new(own));
        let manifest =
            build_music_manifest(rendered.duration, own, Arc::new(music), job.volume)?;
        cancel.check()?;

        let audio_path = job.out_path.with_extension("music.f32le");
        let mixed = mix_manifest(&manifest);
        let result = write_mix_to_f32le_file(&mixed, &audio_path).and_then(|()| {
            remux_with_audio(
                job.rendered,
                &AudioInputConfig {
                    path: audio_path.clone(),
                    sample_rate: manifest.sample_rate,
                    channels: manifest.channels,
                },
                job.out_path,
                self.quality,
                self.overwrite,
            )
        });
        let _ = std::fs::remove_file(&audio_path);
        result.map_err(CompileError::wrap_export)?;
        tracing::info!(out = %job.out_path.display(), "music pass finished");
        Ok(())
    }
}

fn silent_pcm() -> AudioPcm {
    AudioPcm {
        sample_rate: MIX_SAMPLE_RATE,
        channels: 2,
        interleaved_f32: Vec::new(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/renderer.rs"]
mod tests;
