use crate::foundation::core::MediaTime;
use crate::foundation::error::{CompileError, CompileResult};
use std::path::{Path, PathBuf};

/// Geometry of the first video stream in a container.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoStreamInfo {
    /// Encoded (natural) width in pixels, before rotation.
    pub width: u32,
    /// Encoded (natural) height in pixels, before rotation.
    pub height: u32,
    /// Display rotation in degrees, normalized to `0 | 90 | 180 | 270`.
    pub rotation_deg: u16,
}

/// Metadata about one probed media file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaProbe {
    /// Absolute path that was probed.
    pub path: PathBuf,
    /// Container duration.
    pub duration: MediaTime,
    /// First video stream, if any.
    pub video: Option<VideoStreamInfo>,
    /// Whether at least one audio stream exists.
    pub has_audio: bool,
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    tags: Option<ProbeTags>,
    side_data_list: Option<Vec<ProbeSideData>>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe a media file through `ffprobe`.
pub fn probe_media(path: &Path) -> CompileResult<MediaProbe> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            CompileError::clip_load(
                path.display().to_string(),
                format!("failed to run ffprobe: {e}"),
            )
        })?;
    if !out.status.success() {
        return Err(CompileError::clip_load(
            path.display().to_string(),
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }
    parse_probe_json(path, &out.stdout)
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub(crate) fn parse_probe_json(path: &Path, json: &[u8]) -> CompileResult<MediaProbe> {
    let parsed: ProbeOut = serde_json::from_slice(json).map_err(|e| {
        CompileError::clip_load(
            path.display().to_string(),
            format!("ffprobe json parse failed: {e}"),
        )
    })?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| {
            Some(VideoStreamInfo {
                width: s.width?,
                height: s.height?,
                rotation_deg: stream_rotation(s),
            })
        });
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| parse_secs(f.duration.as_deref()))
        .or_else(|| {
            parsed
                .streams
                .iter()
                .filter_map(|s| parse_secs(s.duration.as_deref()))
                .reduce(f64::max)
        })
        .ok_or_else(|| {
            CompileError::clip_load(path.display().to_string(), "ffprobe reported no duration")
        })?;

    Ok(MediaProbe {
        path: path.to_path_buf(),
        duration: MediaTime::from_secs_f64(duration),
        video,
        has_audio,
    })
}

fn parse_secs(s: Option<&str>) -> Option<f64> {
    let v: f64 = s?.trim().parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

fn stream_rotation(s: &ProbeStream) -> u16 {
    let side = s
        .side_data_list
        .iter()
        .flatten()
        .find_map(|d| d.rotation);
    let legacy = s
        .tags
        .as_ref()
        .and_then(|t| t.rotate.as_deref())
        .and_then(|r| r.trim().parse::<f64>().ok());
    normalize_rotation(side.or(legacy).unwrap_or(0.0))
}

/// Snap an arbitrary rotation in degrees to the nearest quarter turn in `[0, 360)`.
pub(crate) fn normalize_rotation(deg: f64) -> u16 {
    if !deg.is_finite() {
        return 0;
    }
    let quarter = (deg / 90.0).round() as i64;
    (quarter.rem_euclid(4) * 90) as u16
}

/// Return `true` when both `ffmpeg` and `ffprobe` can be invoked from `PATH`.
pub fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        std::process::Command::new(tool)
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/probe.rs"]
mod tests;
