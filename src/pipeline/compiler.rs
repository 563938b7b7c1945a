use crate::assets::resolver::{ClipResolver, FfprobeResolver, ResolvedClip, resolve_all};
use crate::encode::ffmpeg::QualityPreset;
use crate::export::renderer::{FfmpegRenderer, MusicPass, PrimaryRender, Renderer};
use crate::foundation::core::Fps;
use crate::foundation::error::{CompileError, CompileResult};
use crate::model::job::CompileJob;
use crate::model::media::SourceHandle;
use crate::overlay::stack::{OverlayStack, build_overlay_stack};
use crate::overlay::title_card::TitleCardRenderer;
use crate::pipeline::lease::{BackgroundLease, LeaseProvider, NoopLeaseProvider};
use crate::pipeline::progress::{
    CancelToken, CompileEvent, PROGRESS_ASSEMBLED, PROGRESS_DONE, PROGRESS_EXPORTED,
    PROGRESS_SETUP, ProgressReporter, clip_progress,
};
use crate::pipeline::scratch::ScratchDir;
use crate::timeline::builder::{RenderInstructionSet, Timeline, build_timeline};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

/// Options controlling a [`VideoCompiler`].
#[derive(Clone, Debug)]
pub struct CompileOpts {
    /// Directory receiving intermediate and final renders.
    pub scratch_dir: PathBuf,
    /// Upper bound on concurrent clip resolutions.
    pub resolve_threads: usize,
    /// Output frame rate.
    pub fps: Fps,
    /// Encoder quality for the ffmpeg renderer.
    pub quality: QualityPreset,
    /// Replace existing output files.
    pub overwrite: bool,
}

impl Default for CompileOpts {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("reelstitch"),
            resolve_threads: 4,
            fps: Fps::default(),
            quality: QualityPreset::Highest,
            overwrite: true,
        }
    }
}

/// Timeline, instructions and overlays for one job, ready to export.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CompilePlan {
    /// Assembled tracks and clip records.
    pub timeline: Timeline,
    /// Per-clip transforms and boundaries.
    pub instructions: RenderInstructionSet,
    /// Layers drawn over the video.
    pub overlays: OverlayStack,
    /// Resolved background music and its gain.
    #[serde(skip)]
    pub music: Option<(ResolvedClip, f32)>,
}

/// Turns a [`CompileJob`] into one output file.
///
/// Collaborators are shared, so a compiler is cheap to clone into a background thread.
#[derive(Clone)]
pub struct VideoCompiler {
    resolver: Arc<dyn ClipResolver>,
    renderer: Arc<dyn Renderer>,
    leases: Arc<dyn LeaseProvider>,
    titles: Arc<TitleCardRenderer>,
    opts: CompileOpts,
}

impl std::fmt::Debug for VideoCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoCompiler")
            .field("titles", &self.titles)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl VideoCompiler {
    /// Compiler over explicit collaborators, without a lease provider and with system fonts.
    pub fn new(
        resolver: Arc<dyn ClipResolver>,
        renderer: Arc<dyn Renderer>,
        opts: CompileOpts,
    ) -> Self {
        Self {
            resolver,
            renderer,
            leases: Arc::new(NoopLeaseProvider),
            titles: Arc::new(TitleCardRenderer::with_system_fonts(&[])),
            opts,
        }
    }

    /// Compiler reading clips under `library_root` and encoding with the system `ffmpeg`.
    pub fn with_ffmpeg(library_root: impl Into<PathBuf>, opts: CompileOpts) -> Self {
        let renderer = FfmpegRenderer {
            quality: opts.quality,
            overwrite: opts.overwrite,
        };
        Self::new(
            Arc::new(FfprobeResolver::new(library_root)),
            Arc::new(renderer),
            opts,
        )
    }

    /// Replace the lease provider.
    pub fn with_lease_provider(mut self, leases: Arc<dyn LeaseProvider>) -> Self {
        self.leases = leases;
        self
    }

    /// Replace the title card renderer.
    pub fn with_title_renderer(mut self, titles: TitleCardRenderer) -> Self {
        self.titles = Arc::new(titles);
        self
    }

    /// Options in use.
    pub fn opts(&self) -> &CompileOpts {
        &self.opts
    }

    /// Resolve and assemble `job` without exporting anything.
    pub fn plan(&self, job: &CompileJob) -> CompileResult<CompilePlan> {
        self.assemble(job, &mut ProgressReporter::silent(), &CancelToken::new())
    }

    /// Run the whole pipeline on the calling thread and return the output path.
    ///
    /// Progress is reported at fixed checkpoints and never decreases. On failure, files already
    /// written to the scratch directory stay there.
    #[tracing::instrument(skip_all, fields(clips = job.media.len()))]
    pub fn compile(
        &self,
        job: &CompileJob,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancelToken,
    ) -> CompileResult<PathBuf> {
        let _lease = BackgroundLease::acquire(self.leases.clone(), "reelstitch-compile");
        let scratch = ScratchDir::create(&self.opts.scratch_dir)?;

        let plan = self.assemble(job, progress, cancel)?;
        progress.report(PROGRESS_ASSEMBLED);
        cancel.check()?;

        let primary = scratch.unique_path("compiled", "mp4");
        self.renderer.render_primary(
            &PrimaryRender {
                timeline: &plan.timeline,
                instructions: &plan.instructions,
                overlays: &plan.overlays,
                out_path: &primary,
            },
            cancel,
        )?;
        progress.report(PROGRESS_EXPORTED);

        let Some((music, volume)) = &plan.music else {
            progress.report(PROGRESS_DONE);
            tracing::info!(out = %primary.display(), "compile finished");
            return Ok(primary);
        };

        cancel.check()?;
        let with_music = scratch.unique_path("compiled-music", "mp4");
        self.renderer.render_with_music(
            &MusicPass {
                rendered: &primary,
                music,
                volume: *volume,
                out_path: &with_music,
            },
            cancel,
        )?;
        scratch.discard(&primary);
        progress.report(PROGRESS_DONE);
        tracing::info!(out = %with_music.display(), "compile finished");
        Ok(with_music)
    }

    fn assemble(
        &self,
        job: &CompileJob,
        progress: &mut ProgressReporter<'_>,
        cancel: &CancelToken,
    ) -> CompileResult<CompilePlan> {
        job.validate()?;
        cancel.check()?;

        let handles: Vec<SourceHandle> = job.media.iter().map(|m| m.source.clone()).collect();
        let resolved = resolve_all(self.resolver.as_ref(), &handles, self.opts.resolve_threads)?;
        let music = match &job.settings.music {
            Some(track) => Some((self.resolver.resolve(&track.source)?, track.volume)),
            None => None,
        };
        progress.report(PROGRESS_SETUP);
        cancel.check()?;

        let (timeline, instructions) = build_timeline(
            &job.media,
            &resolved,
            &job.settings,
            self.opts.fps,
            &mut |i, n| progress.report(clip_progress(i, n)),
        )?;
        if timeline.clips.is_empty() {
            return Err(CompileError::validation(format!(
                "nothing to render: all {} clips were skipped",
                timeline.skipped.len()
            )));
        }
        timeline.validate()?;
        cancel.check()?;

        let overlays = build_overlay_stack(&job.settings, &instructions, &self.titles)?;
        Ok(CompilePlan {
            timeline,
            instructions,
            overlays,
            music,
        })
    }

    /// Run [`VideoCompiler::compile`] on a background thread, streaming [`CompileEvent`]s.
    pub fn spawn(&self, job: CompileJob) -> CompileResult<CompileHandle> {
        let (tx, rx) = mpsc::channel();
        let task = self.spawn_with_sink(job, move |event| {
            // A dropped receiver only means nobody is listening any more.
            let _ = tx.send(event);
        })?;
        Ok(CompileHandle { task, events: rx })
    }

    /// Run a compile in the background, reporting through plain callbacks.
    ///
    /// `on_progress` and `on_complete` run on the worker thread. `on_complete` runs exactly once.
    pub fn spawn_with_callbacks(
        &self,
        job: CompileJob,
        mut on_progress: impl FnMut(f64) + Send + 'static,
        on_complete: impl FnOnce(CompileResult<PathBuf>) + Send + 'static,
    ) -> CompileResult<CompileTask> {
        let mut on_complete = Some(on_complete);
        self.spawn_with_sink(job, move |event| match event {
            CompileEvent::Progress(p) => on_progress(p),
            CompileEvent::Finished(result) => {
                if let Some(done) = on_complete.take() {
                    done(result);
                }
            }
        })
    }

    fn spawn_with_sink(
        &self,
        job: CompileJob,
        mut emit: impl FnMut(CompileEvent) + Send + 'static,
    ) -> CompileResult<CompileTask> {
        let cancel = CancelToken::new();
        let worker = self.clone();
        let worker_cancel = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("reelstitch-compile".to_owned())
            .spawn(move || {
                let result = {
                    let mut progress =
                        ProgressReporter::new(|p| emit(CompileEvent::Progress(p)));
                    worker.compile(&job, &mut progress, &worker_cancel)
                };
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "compile failed");
                }
                emit(CompileEvent::Finished(result));
            })
            .map_err(|e| CompileError::Other(anyhow::anyhow!("spawn compile thread: {e}")))?;
        Ok(CompileTask {
            cancel,
            thread: Some(thread),
        })
    }
}

/// A compile running on its own thread.
#[derive(Debug)]
pub struct CompileTask {
    cancel: CancelToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CompileTask {
    /// Request cancellation; the compile stops at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the worker.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Wait for the worker thread to exit.
    pub fn join(mut self) -> CompileResult<()> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> CompileResult<()> {
        match self.thread.take() {
            Some(t) => t
                .join()
                .map_err(|_| CompileError::Other(anyhow::anyhow!("compile thread panicked"))),
            None => Ok(()),
        }
    }
}

/// A background compile plus its event stream.
#[derive(Debug)]
pub struct CompileHandle {
    task: CompileTask,
    events: mpsc::Receiver<CompileEvent>,
}

impl CompileHandle {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Token shared with the worker.
    pub fn cancel_token(&self) -> &CancelToken {
        self.task.cancel_token()
    }

    /// Raw event stream. [`CompileEvent::Finished`] is always the last event.
    pub fn events(&self) -> &mpsc::Receiver<CompileEvent> {
        &self.events
    }

    /// Block until the compile finishes, ignoring progress.
    pub fn wait(self) -> CompileResult<PathBuf> {
        self.wait_with_progress(|_| {})
    }

    /// Block until the compile finishes, forwarding progress to `on_progress`.
    pub fn wait_with_progress(
        mut self,
        mut on_progress: impl FnMut(f64),
    ) -> CompileResult<PathBuf> {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                CompileEvent::Progress(p) => on_progress(p),
                CompileEvent::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }
        self.task.join_inner()?;
        outcome.unwrap_or_else(|| {
            Err(CompileError::Other(anyhow::anyhow!(
                "compile worker exited without a result"
            )))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/compiler.rs"]
mod tests;
