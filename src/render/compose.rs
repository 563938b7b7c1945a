//! Frame scheduling and per-frame compositing.
//!
//! Output frames sit on a fixed grid `frame_time(i)`. Each sub-range of the timeline owns the grid
//! points inside its output span; [`plan_frame_spans`] turns that into sequential decode requests,
//! and [`FrameComposer`] layers backdrop, video and overlays for one grid point.

use crate::foundation::core::{Canvas, Fps, MediaTime};
use crate::foundation::error::{CompileError, CompileResult};
use crate::overlay::stack::{LayerKind, OverlayStack};
use crate::render::frame::FrameRGBA;
use crate::timeline::builder::{RenderInstructionSet, Timeline};
use crate::timeline::transform::PixelPlacement;
use std::path::PathBuf;

/// A run of consecutive output frames fed by one sequential decode.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSpan {
    /// Index into [`Timeline::clips`].
    pub clip: usize,
    /// Source container.
    pub path: PathBuf,
    /// First output frame index.
    pub first_frame: u64,
    /// Number of output frames.
    pub frame_count: u64,
    /// Native time shown on the first frame.
    pub source_start: MediaTime,
    /// Source sampling rate (`fps / rate`).
    pub sample_fps: f64,
    /// Where decoded frames land on the canvas.
    pub placement: PixelPlacement,
}

/// Total output frames covering `duration`.
pub fn total_frames(fps: Fps, duration: MediaTime) -> u64 {
    fps.frames_covering(duration)
}

/// Split the output frame grid into decode spans, in output order.
///
/// Sub-ranges shorter than one frame interval may own no grid point and produce no span.
pub fn plan_frame_spans(
    timeline: &Timeline,
    instructions: &RenderInstructionSet,
) -> CompileResult<Vec<FrameSpan>> {
    let fps = instructions.fps;
    let mut spans = Vec::new();
    for ins in &instructions.clip_instructions {
        let clip = timeline.clips.get(ins.clip).ok_or_else(|| {
            CompileError::validation(format!("instruction references missing clip {}", ins.clip))
        })?;
        let placement = ins.transform.placement();
        for sub in &clip.sub_ranges {
            let first = fps.first_frame_at_or_after(sub.output_start);
            let end = fps.first_frame_at_or_after(sub.output_start + sub.output_duration);
            if end <= first {
                continue;
            }
            spans.push(FrameSpan {
                clip: ins.clip,
                path: clip.path.clone(),
                first_frame: first,
                frame_count: end - first,
                source_start: sub.source_time_at(fps.frame_time(first)),
                sample_fps: fps.as_f64() / sub.rate,
                placement,
            });
        }
    }
    Ok(spans)
}

/// Composites backdrop, one video frame and the overlay layers at a given output time.
#[derive(Debug)]
pub struct FrameComposer<'a> {
    canvas: Canvas,
    stack: &'a OverlayStack,
}

impl<'a> FrameComposer<'a> {
    /// Composer for `canvas`. Title cards in `stack` must match the canvas size.
    pub fn new(canvas: Canvas, stack: &'a OverlayStack) -> CompileResult<Self> {
        for layer in &stack.layers {
            if let LayerKind::Title { card } = &layer.kind
                && (card.width != canvas.width || card.height != canvas.height)
            {
                return Err(CompileError::image(format!(
                    "title card is {}x{}, canvas is {}x{}",
                    card.width, card.height, canvas.width, canvas.height
                )));
            }
        }
        Ok(Self { canvas, stack })
    }

    /// Build the frame shown at `t`. `video` is an upright RGBA frame sized to its placement.
    pub fn compose(
        &self,
        t: MediaTime,
        video: Option<(&[u8], PixelPlacement)>,
    ) -> CompileResult<FrameRGBA> {
        let backdrop = self.stack.backdrop_color().unwrap_or_default();
        let mut frame = FrameRGBA::filled(self.canvas.width, self.canvas.height, backdrop);

        if let Some((pixels, at)) = video {
            frame.blit_opaque(pixels, at.width, at.height, at)?;
        }

        for layer in self.stack.overlays() {
            let opacity = layer.opacity.sample(t) as f32;
            if opacity <= 0.0 {
                continue;
            }
            match &layer.kind {
                LayerKind::Title { card } => frame.over_image(card.premul_rgba8(), opacity)?,
                LayerKind::Transition { color, .. } => frame.over_color(*color, opacity),
                LayerKind::Backdrop { color } => frame.over_color(*color, opacity),
                LayerKind::Video => {}
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compose.rs"]
mod tests;
