use super::*;
use crate::assets::probe::VideoStreamInfo;
use crate::assets::resolver::InMemoryResolver;
use crate::foundation::core::MediaTime;
use crate::model::media::MediaItem;
use crate::model::settings::{MusicTrack, VideoCompilationSettings};
use crate::pipeline::lease::{LeaseId, LeaseRevocation};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct RecordingRenderer {
    primary: Mutex<Vec<(PathBuf, usize)>>,
    music: Mutex<Vec<(PathBuf, PathBuf, f32)>>,
    fail_primary: bool,
    fail_music: bool,
}

impl Renderer for RecordingRenderer {
    fn render_primary(&self, job: &PrimaryRender<'_>, cancel: &CancelToken) -> CompileResult<()> {
        cancel.check()?;
        self.primary
            .lock()
            .unwrap()
            .push((job.out_path.to_path_buf(), job.timeline.clips.len()));
        if self.fail_primary {
            return Err(CompileError::export("encoder exited with status 1"));
        }
        std::fs::write(job.out_path, b"primary").map_err(anyhow::Error::from)?;
        Ok(())
    }

    fn render_with_music(&self, job: &MusicPass<'_>, cancel: &CancelToken) -> CompileResult<()> {
        cancel.check()?;
        assert!(job.rendered.is_file(), "primary render must exist");
        self.music.lock().unwrap().push((
            job.rendered.to_path_buf(),
            job.out_path.to_path_buf(),
            job.volume,
        ));
        if self.fail_music {
            return Err(CompileError::export("remux failed"));
        }
        std::fs::write(job.out_path, b"final").map_err(anyhow::Error::from)?;
        Ok(())
    }
}

#[derive(Default)]
struct CountingLeases {
    began: AtomicU64,
    ended: AtomicU64,
}

impl LeaseProvider for CountingLeases {
    fn begin(&self, _name: &str, _on_expire: LeaseRevocation) -> Option<LeaseId> {
        Some(LeaseId(self.began.fetch_add(1, Ordering::SeqCst)))
    }

    fn end(&self, _id: LeaseId) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

fn asset(name: &str, secs: i64, video: bool, audio: bool) -> ResolvedClip {
    ResolvedClip {
        handle: SourceHandle::new(name),
        path: PathBuf::from(format!("/library/{name}")),
        duration: MediaTime::from_secs(secs),
        video: video.then_some(VideoStreamInfo {
            width: 1280,
            height: 720,
            rotation_deg: 0,
        }),
        has_audio: audio,
    }
}

fn library() -> InMemoryResolver {
    InMemoryResolver::new()
        .with(asset("a.mp4", 10, true, true))
        .with(asset("b.mp4", 5, true, false))
        .with(asset("still.jpg", 3, false, false))
        .with(asset("song.m4a", 4, false, true))
}

fn job(names: &[&str]) -> CompileJob {
    CompileJob {
        media: names
            .iter()
            .map(|n| MediaItem::new(SourceHandle::new(*n)))
            .collect(),
        settings: VideoCompilationSettings::default(),
    }
}

fn with_music(mut job: CompileJob) -> CompileJob {
    job.settings.music = Some(MusicTrack {
        source: SourceHandle::new("song.m4a"),
        volume: 0.25,
    });
    job
}

struct Fixture {
    _scratch: tempfile::TempDir,
    renderer: Arc<RecordingRenderer>,
    leases: Arc<CountingLeases>,
    compiler: VideoCompiler,
}

fn fixture(renderer: RecordingRenderer) -> Fixture {
    let scratch = tempfile::tempdir().unwrap();
    let renderer = Arc::new(renderer);
    let leases = Arc::new(CountingLeases::default());
    let compiler = VideoCompiler::new(
        Arc::new(library()),
        renderer.clone(),
        CompileOpts {
            scratch_dir: scratch.path().to_path_buf(),
            resolve_threads: 2,
            ..CompileOpts::default()
        },
    )
    .with_lease_provider(leases.clone())
    .with_title_renderer(TitleCardRenderer::without_fonts());
    Fixture {
        _scratch: scratch,
        renderer,
        leases,
        compiler,
    }
}

fn run(
    f: &Fixture,
    job: &CompileJob,
    cancel: &CancelToken,
) -> (CompileResult<PathBuf>, Vec<f64>) {
    let seen = Mutex::new(Vec::new());
    let result = {
        let mut progress = ProgressReporter::new(|p| seen.lock().unwrap().push(p));
        f.compiler.compile(job, &mut progress, cancel)
    };
    (result, seen.into_inner().unwrap())
}

fn assert_monotonic(values: &[f64]) {
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
}

#[test]
fn default_opts_render_at_thirty_fps() {
    let opts = CompileOpts::default();
    assert_eq!(opts.fps, Fps::default());
    assert!(opts.overwrite);
    assert_eq!(opts.quality, QualityPreset::Highest);
    assert!(opts.scratch_dir.ends_with("reelstitch"));
}

#[test]
fn compile_without_music_returns_primary_render() {
    let f = fixture(RecordingRenderer::default());
    let (result, progress) = run(&f, &job(&["a.mp4", "b.mp4"]), &CancelToken::new());

    let out = result.unwrap();
    assert!(out.is_file());
    assert_eq!(out.parent(), Some(f.compiler.opts().scratch_dir.as_path()));
    assert_eq!(out.extension().and_then(|e| e.to_str()), Some("mp4"));
    assert_eq!(f.renderer.primary.lock().unwrap().len(), 1);
    assert!(f.renderer.music.lock().unwrap().is_empty());

    assert_monotonic(&progress);
    assert_eq!(progress.first(), Some(&PROGRESS_SETUP));
    assert!(progress.iter().any(|p| (p - 0.45).abs() < 1e-9));
    assert_eq!(
        &progress[progress.len() - 3..],
        &[PROGRESS_ASSEMBLED, PROGRESS_EXPORTED, PROGRESS_DONE]
    );
}

#[test]
fn music_pass_supersedes_and_deletes_primary_render() {
    let f = fixture(RecordingRenderer::default());
    let (result, progress) = run(&f, &with_music(job(&["a.mp4"])), &CancelToken::new());

    let out = result.unwrap();
    let music = f.renderer.music.lock().unwrap().clone();
    assert_eq!(music.len(), 1);
    let (rendered, music_out, volume) = &music[0];
    assert_eq!(music_out, &out);
    assert_ne!(rendered, &out);
    assert_eq!(*volume, 0.25);
    assert!(!rendered.exists(), "intermediate should be removed");
    assert_eq!(std::fs::read(&out).unwrap(), b"final");
    assert_eq!(progress.last(), Some(&PROGRESS_DONE));
}

#[test]
fn failed_music_pass_keeps_intermediate_and_stops_at_ninety_percent() {
    let f = fixture(RecordingRenderer {
        fail_music: true,
        ..RecordingRenderer::default()
    });
    let (result, progress) = run(&f, &with_music(job(&["a.mp4"])), &CancelToken::new());

    assert!(matches!(result, Err(CompileError::ExportFailed(_))));
    let (rendered, _, _) = f.renderer.music.lock().unwrap()[0].clone();
    assert!(rendered.is_file());
    assert_eq!(progress.last(), Some(&PROGRESS_EXPORTED));
}

#[test]
fn failed_primary_export_never_starts_music_pass() {
    let f = fixture(RecordingRenderer {
        fail_primary: true,
        ..RecordingRenderer::default()
    });
    let (result, progress) = run(&f, &with_music(job(&["a.mp4"])), &CancelToken::new());

    assert!(matches!(result, Err(CompileError::ExportFailed(_))));
    assert!(f.renderer.music.lock().unwrap().is_empty());
    assert_eq!(progress.last(), Some(&PROGRESS_ASSEMBLED));
}

#[test]
fn clip_without_video_is_skipped() {
    let f = fixture(RecordingRenderer::default());
    let plan = f.compiler.plan(&job(&["a.mp4", "still.jpg", "b.mp4"])).unwrap();
    assert_eq!(plan.timeline.clips.len(), 2);
    assert_eq!(plan.timeline.skipped.len(), 1);
    assert_eq!(plan.timeline.skipped[0].media_index, 1);
    assert_eq!(plan.timeline.duration(), MediaTime::from_secs(15));
    assert_eq!(plan.instructions.boundaries, vec![MediaTime::from_secs(10)]);
    assert_eq!(plan.overlays.transition_count(), 1);
    assert!(plan.music.is_none());
    assert!(f.renderer.primary.lock().unwrap().is_empty());
}

#[test]
fn all_clips_skipped_is_a_validation_error() {
    let f = fixture(RecordingRenderer::default());
    let (result, _) = run(&f, &job(&["still.jpg"]), &CancelToken::new());
    let err = result.unwrap_err();
    assert!(matches!(err, CompileError::Validation(_)));
    assert!(err.to_string().contains("nothing to render"));
    assert!(f.renderer.primary.lock().unwrap().is_empty());
}

#[test]
fn empty_job_is_rejected_before_resolution() {
    let f = fixture(RecordingRenderer::default());
    let (result, progress) = run(&f, &job(&[]), &CancelToken::new());
    assert!(matches!(result, Err(CompileError::Validation(_))));
    assert!(progress.is_empty());
}

#[test]
fn unknown_clip_or_music_fails_to_load() {
    let f = fixture(RecordingRenderer::default());
    let (result, progress) = run(&f, &job(&["a.mp4", "missing.mp4"]), &CancelToken::new());
    assert!(matches!(
        result,
        Err(CompileError::ClipLoadFailed { ref handle, .. }) if handle == "missing.mp4"
    ));
    assert!(progress.is_empty());

    let mut j = with_music(job(&["a.mp4"]));
    if let Some(m) = &mut j.settings.music {
        m.source = SourceHandle::new("nope.m4a");
    }
    let (result, _) = run(&f, &j, &CancelToken::new());
    assert!(matches!(result, Err(CompileError::ClipLoadFailed { .. })));
}

#[test]
fn lease_is_released_on_success_and_failure() {
    let f = fixture(RecordingRenderer::default());
    run(&f, &job(&["a.mp4"]), &CancelToken::new()).0.unwrap();
    run(&f, &job(&["still.jpg"]), &CancelToken::new())
        .0
        .unwrap_err();
    assert_eq!(f.leases.began.load(Ordering::SeqCst), 2);
    assert_eq!(f.leases.ended.load(Ordering::SeqCst), 2);
}

#[test]
fn cancelled_compile_does_not_render() {
    let f = fixture(RecordingRenderer::default());
    let cancel = CancelToken::new();
    cancel.cancel();
    let (result, _) = run(&f, &job(&["a.mp4"]), &cancel);
    assert!(matches!(result, Err(CompileError::Cancelled)));
    assert!(f.renderer.primary.lock().unwrap().is_empty());
    assert_eq!(f.leases.ended.load(Ordering::SeqCst), 1);
}

#[test]
fn spawned_compile_streams_progress_then_result() {
    let f = fixture(RecordingRenderer::default());
    let handle = f.compiler.spawn(with_music(job(&["a.mp4", "b.mp4"]))).unwrap();

    let mut seen = Vec::new();
    let out = handle.wait_with_progress(|p| seen.push(p)).unwrap();
    assert!(out.is_file());
    assert_monotonic(&seen);
    assert_eq!(seen.last(), Some(&PROGRESS_DONE));
}

#[test]
fn spawned_compile_reports_failure_through_wait() {
    let f = fixture(RecordingRenderer::default());
    let handle = f.compiler.spawn(job(&["still.jpg"])).unwrap();
    assert!(matches!(handle.wait(), Err(CompileError::Validation(_))));
}

#[test]
fn callbacks_receive_progress_and_one_completion() {
    let f = fixture(RecordingRenderer::default());
    let (tx, rx) = mpsc::channel();
    let progress = Arc::new(Mutex::new(Vec::new()));
    let progress_sink = progress.clone();

    let task = f
        .compiler
        .spawn_with_callbacks(
            job(&["a.mp4"]),
            move |p| progress_sink.lock().unwrap().push(p),
            move |result| tx.send(result).unwrap(),
        )
        .unwrap();
    task.join().unwrap();

    let results: Vec<_> = rx.try_iter().collect();
    assert_eq!(results.len(), 1);
    let out = results.into_iter().next().unwrap().unwrap();
    assert!(Path::new(&out).is_file());
    assert_eq!(progress.lock().unwrap().last(), Some(&PROGRESS_DONE));
}
