use crate::foundation::core::MediaTime;
use crate::foundation::error::{CompileError, CompileResult};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Internal audio mixing sample rate used across decode/mix/encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Length in sample frames.
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels.max(1))
    }
}

/// One sequential video decode: a source window resampled onto the output frame grid.
#[derive(Clone, Debug)]
pub struct VideoDecodeRequest {
    /// Source container.
    pub path: PathBuf,
    /// Native time of the first sampled frame.
    pub start: MediaTime,
    /// Source sampling rate: output fps divided by playback rate.
    pub sample_fps: f64,
    /// Number of frames to emit.
    pub frame_count: u64,
    /// Output frame width after scaling (display orientation).
    pub width: u32,
    /// Output frame height after scaling (display orientation).
    pub height: u32,
}

/// Streams RGBA8 frames from a child `ffmpeg` process, one frame per call.
///
/// `ffmpeg` applies the stream's display rotation before scaling, so frames arrive upright.
pub struct VideoFrameReader {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    remaining: u64,
    path: PathBuf,
}

impl VideoFrameReader {
    /// Spawn the decoder for `req`.
    pub fn spawn(req: &VideoDecodeRequest) -> CompileResult<Self> {
        if req.width == 0 || req.height == 0 {
            return Err(CompileError::validation(
                "decoded frame width/height must be non-zero",
            ));
        }
        if !req.sample_fps.is_finite() || req.sample_fps <= 0.0 {
            return Err(CompileError::validation(
                "sample fps must be finite and > 0",
            ));
        }

        let filter = format!(
            "fps={:.6},scale={}:{}:flags=bicubic",
            req.sample_fps, req.width, req.height
        );
        let mut child = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-ss",
                &format!("{:.6}", req.start.as_secs_f64().max(0.0)),
            ])
            .arg("-i")
            .arg(&req.path)
            .args([
                "-an",
                "-vf",
                &filter,
                "-frames:v",
                &req.frame_count.to_string(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CompileError::export(format!("failed to spawn ffmpeg for video decode: {e}"))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CompileError::export("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CompileError::export("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            frame_len: req.width as usize * req.height as usize * 4,
            remaining: req.frame_count,
            path: req.path.clone(),
        })
    }

    /// Read the next frame. Returns `None` once the requested count is reached or the decoder
    /// ran out of source frames.
    pub fn next_frame(&mut self) -> CompileResult<Option<Vec<u8>>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {
                self.remaining -= 1;
                Ok(Some(buf))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.remaining = 0;
                drop(self.stdout.take());
                Ok(None)
            }
            Err(e) => Err(CompileError::export(format!(
                "failed to read decoded frame from '{}': {e}",
                self.path.display()
            ))),
        }
    }

    /// Wait for the decoder and surface its exit status.
    pub fn finish(mut self) -> CompileResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| {
            CompileError::export(format!("failed to wait for ffmpeg decoder: {e}"))
        })?;
        let stderr = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CompileError::export("ffmpeg stderr drain thread panicked"))?
                .unwrap_or_default(),
            None => Vec::new(),
        };
        // Closing stdout early makes ffmpeg exit with a broken pipe; only a non-zero exit with
        // frames still expected is a real failure.
        if !status.success() && self.remaining > 0 {
            return Err(CompileError::export(format!(
                "ffmpeg video decode failed for '{}': {}",
                self.path.display(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for VideoFrameReader {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Decode audio from a media source to stereo interleaved `f32` PCM.
///
/// Sources without an audio stream decode to empty PCM.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> CompileResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| CompileError::export(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(CompileError::export(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: f32le_bytes_to_samples(&out.stdout)?,
    })
}

pub(crate) fn f32le_bytes_to_samples(bytes: &[u8]) -> CompileResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(CompileError::export(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
