use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::Fps;
use crate::foundation::error::{CompileError, CompileResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Encoder quality preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    /// Best quality the encoder offers at a practical speed.
    #[default]
    Highest,
    /// Balanced size and speed.
    Balanced,
    /// Fast previews.
    Fast,
}

impl QualityPreset {
    /// x264 `-preset` name.
    pub fn x264_preset(self) -> &'static str {
        match self {
            Self::Highest => "slow",
            Self::Balanced => "medium",
            Self::Fast => "veryfast",
        }
    }

    /// x264 constant rate factor.
    pub fn crf(self) -> u8 {
        match self {
            Self::Highest => 17,
            Self::Balanced => 21,
            Self::Fast => 26,
        }
    }

    /// AAC bitrate.
    pub fn audio_bitrate(self) -> &'static str {
        match self {
            Self::Highest => "256k",
            Self::Balanced => "192k",
            Self::Fast => "128k",
        }
    }
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it exists.
    pub overwrite: bool,
    /// Background used to flatten alpha (straight RGBA8).
    pub bg_rgba: [u8; 4],
    /// Encoder quality.
    pub quality: QualityPreset,
}

impl FfmpegSinkOpts {
    /// Options for an MP4 at `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
            quality: QualityPreset::default(),
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
}

impl FfmpegSink {
    /// Sink writing to `opts.out_path`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> CompileResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(CompileError::validation(
                "export canvas has a zero dimension",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(CompileError::validation(
                "export canvas must have even width and height for yuv420p",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(CompileError::export(format!(
                "refusing to replace existing export '{}'",
                self.opts.out_path.display()
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });

        // Input: premultiplied RGBA8 flattened to opaque in push_frame.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        let quality = self.opts.quality;
        if let Some(audio) = cfg.audio.as_ref() {
            push_f32le_input(&mut cmd, audio)?;
            push_video_codec(&mut cmd, quality);
            cmd.args([
                "-c:a",
                "aac",
                "-b:a",
                quality.audio_bitrate(),
                "-shortest",
            ]);
        } else {
            cmd.arg("-an");
            push_video_codec(&mut cmd, quality);
        }
        cmd.args(["-movflags", "+faststart"]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            CompileError::export(format!(
                "could not launch ffmpeg for export: {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompileError::export("failed to open ffmpeg stdin (unexpected)"))?;
        let stderr_drain = spawn_stderr_drain(&mut child)?;

        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> CompileResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CompileError::export("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(CompileError::export(
                "frames must reach the encoder in order",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(CompileError::export(format!(
                "composed frame is {}x{} but the canvas is {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CompileError::export("ffmpeg sink is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            CompileError::export(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn end(&mut self) -> CompileResult<()> {
        drop(self.stdin.take());
        let child = self
            .child
            .take()
            .ok_or_else(|| CompileError::export("ffmpeg sink not started"))?;
        wait_for_ffmpeg(child, self.stderr_drain.take())?;
        self.cfg = None;
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Copy the video stream of `video_in` and replace its audio with raw PCM from `audio`.
///
/// Output length follows the video stream.
#[tracing::instrument(skip(audio))]
pub fn remux_with_audio(
    video_in: &Path,
    audio: &AudioInputConfig,
    out_path: &Path,
    quality: QualityPreset,
    overwrite: bool,
) -> CompileResult<()> {
    ensure_parent_dir(out_path)?;
    let mut cmd = Command::new("ffmpeg");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd.arg(if overwrite { "-y" } else { "-n" });
    cmd.args(["-loglevel", "error", "-i"]).arg(video_in);
    push_f32le_input(&mut cmd, audio)?;
    cmd.args([
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-c:v",
        "copy",
        "-c:a",
        "aac",
        "-b:a",
        quality.audio_bitrate(),
        "-shortest",
        "-movflags",
        "+faststart",
    ])
    .arg(out_path);

    let mut child = cmd.spawn().map_err(|e| {
        CompileError::export(format!("failed to spawn ffmpeg for remux: {e}"))
    })?;
    let drain = spawn_stderr_drain(&mut child)?;
    wait_for_ffmpeg(child, Some(drain))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> CompileResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // rawvideo input: `-r` before `-i` sets the input rate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn push_video_codec(cmd: &mut Command, quality: QualityPreset) {
    cmd.args([
        "-c:v",
        "libx264",
        "-preset",
        quality.x264_preset(),
        "-crf",
        &quality.crf().to_string(),
        "-pix_fmt",
        "yuv420p",
    ]);
}

fn push_f32le_input(cmd: &mut Command, audio: &AudioInputConfig) -> CompileResult<()> {
    if audio.sample_rate == 0 {
        return Err(CompileError::validation(
            "mixed audio track has a zero sample rate",
        ));
    }
    if audio.channels == 0 {
        return Err(CompileError::validation(
            "mixed audio track has no channels",
        ));
    }
    cmd.args([
        "-f",
        "f32le",
        "-ar",
        &audio.sample_rate.to_string(),
        "-ac",
        &audio.channels.to_string(),
        "-i",
    ])
    .arg(&audio.path);
    Ok(())
}

type StderrDrain = std::thread::JoinHandle<std::io::Result<Vec<u8>>>;

fn spawn_stderr_drain(child: &mut Child) -> CompileResult<StderrDrain> {
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| CompileError::export("failed to open ffmpeg stderr (unexpected)"))?;
    Ok(std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok(bytes)
    }))
}

fn wait_for_ffmpeg(mut child: Child, drain: Option<StderrDrain>) -> CompileResult<()> {
    let status = child
        .wait()
        .map_err(|e| CompileError::export(format!("failed to wait for ffmpeg to finish: {e}")))?;
    let stderr_bytes = match drain {
        Some(handle) => handle
            .join()
            .map_err(|_| CompileError::export("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| CompileError::export(format!("ffmpeg stderr read failed: {e}")))?,
        None => Vec::new(),
    };
    if !status.success() {
        return Err(CompileError::export(format!(
            "ffmpeg exited with status {status}: {}",
            String::from_utf8_lossy(&stderr_bytes).trim()
        )));
    }
    Ok(())
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> CompileResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(CompileError::export(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        if s[3] == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - u16::from(s[3]);
        for i in 0..3 {
            d[i] = (u16::from(s[i]) + mul_div255_u16(bg[i], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
