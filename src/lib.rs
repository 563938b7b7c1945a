//! reelstitch compiles an ordered list of trimmed source clips into one continuous video.
//!
//! A compile runs four phases in strict sequence:
//!
//! - resolve every [`SourceHandle`] into a probed [`ResolvedClip`]
//! - place clips back to back on a [`Timeline`], splitting slow-motion windows and computing an
//!   aspect-fit [`ClipTransform`] per clip
//! - build the [`OverlayStack`]: backdrop, optional title card, fade transitions at boundaries
//! - export through a [`Renderer`], then loop background music under the result when requested
//!
//! [`VideoCompiler`] drives the phases, reports monotonic progress, and holds a
//! [`BackgroundLease`] for the duration of the work.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod audio;
mod encode;
mod export;
mod foundation;
mod model;
mod overlay;
mod pipeline;
mod render;
mod timeline;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, MediaTime, Point, Rect, Rgba8, Size, TICKS_PER_SEC, TimeRange, Vec2,
};
pub use crate::foundation::error::{CompileError, CompileResult};

pub use crate::model::job::CompileJob;
pub use crate::model::media::{MediaId, MediaItem, SLOW_MO_RATE, SlowMoRange, SourceHandle};
pub use crate::model::settings::{
    LOOP_MINUTE_OPTIONS, LoopDuration, MusicTrack, Orientation, TransitionStyle,
    VideoCompilationSettings,
};

pub use crate::assets::decode::{
    AudioPcm, MIX_SAMPLE_RATE, VideoDecodeRequest, VideoFrameReader, decode_audio_f32_stereo,
};
pub use crate::assets::probe::{MediaProbe, VideoStreamInfo, ffmpeg_tools_available, probe_media};
pub use crate::assets::resolver::{
    ClipResolver, FfprobeResolver, InMemoryResolver, ResolvedClip, resolve_all,
};

pub use crate::timeline::builder::{
    ClipInstruction, OutputTrack, PlacedClip, RenderInstructionSet, SkippedClip, SubRange,
    Timeline, TrackKind, TrackSegment, build_timeline, estimate_output_duration,
    split_sub_ranges,
};
pub use crate::timeline::transform::{ClipTransform, PixelPlacement};

pub use crate::overlay::keyframes::{OpacityRamp, OpacityTrack};
pub use crate::overlay::stack::{
    LayerKind, OverlayLayer, OverlayStack, TITLE_DWELL, TRANSITION_RAMP, build_overlay_stack,
    title_opacity, transition_opacity,
};
pub use crate::overlay::title_card::{TitleCard, TitleCardRenderer, title_card_svg};

pub use crate::audio::manifest::{
    AudioManifest, AudioSegment, MusicInsertion, build_clip_audio_manifest, build_music_manifest,
    plan_music_loop,
};
pub use crate::audio::mix::{mix_manifest, write_mix_to_f32le_file};

pub use crate::render::compose::{FrameComposer, FrameSpan, plan_frame_spans, total_frames};
pub use crate::render::frame::{FrameRGBA, PremulRgba8};

pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, QualityPreset, remux_with_audio};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};

pub use crate::export::renderer::{FfmpegRenderer, MusicPass, PrimaryRender, Renderer};

pub use crate::pipeline::compiler::{
    CompileHandle, CompileOpts, CompilePlan, CompileTask, VideoCompiler,
};
pub use crate::pipeline::lease::{
    BackgroundLease, LeaseId, LeaseProvider, LeaseRevocation, NoopLeaseProvider,
};
pub use crate::pipeline::progress::{
    CancelToken, CompileEvent, PROGRESS_ASSEMBLED, PROGRESS_DONE, PROGRESS_EXPORTED,
    PROGRESS_SETUP, ProgressReporter, clip_progress,
};
pub use crate::pipeline::scratch::ScratchDir;
