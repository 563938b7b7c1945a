use crate::audio::manifest::AudioManifest;
use crate::foundation::error::{CompileError, CompileResult};
use std::path::Path;

/// Render a manifest to interleaved `f32` samples, clamped to `[-1, 1]`.
///
/// Sources are read with linear interpolation so non-unity playback rates resample cleanly.
/// Mono sources are duplicated across both output channels.
pub fn mix_manifest(manifest: &AudioManifest) -> Vec<f32> {
    let channels = usize::from(manifest.channels.max(1));
    let frames = manifest.total_samples as usize;
    let mut out = vec![0.0f32; frames * channels];

    for seg in &manifest.segments {
        if seg.volume == 0.0 || seg.timeline_end_sample <= seg.timeline_start_sample {
            continue;
        }
        let src = &seg.source.interleaved_f32;
        let src_channels = usize::from(seg.source.channels.max(1));
        let src_frames = src.len() / src_channels;
        if src_frames == 0 {
            continue;
        }

        let end = seg.timeline_end_sample.min(manifest.total_samples);
        for dst_sample in seg.timeline_start_sample..end {
            let rel_sec = (dst_sample - seg.timeline_start_sample) as f64
                / f64::from(manifest.sample_rate);
            let src_sec = seg.source_start_sec + rel_sec * seg.playback_rate;
            if let Some(end_sec) = seg.source_end_sec
                && src_sec >= end_sec
            {
                break;
            }
            let src_pos = src_sec * f64::from(seg.source.sample_rate);
            if !src_pos.is_finite() || src_pos < 0.0 {
                break;
            }
            let f0 = src_pos.floor() as usize;
            if f0 >= src_frames {
                break;
            }
            let f1 = (f0 + 1).min(src_frames - 1);
            let frac = (src_pos - f0 as f64) as f32;

            let (l, r) = if src_channels == 1 {
                let v = src[f0] + (src[f1] - src[f0]) * frac;
                (v, v)
            } else {
                let i0 = f0 * src_channels;
                let i1 = f1 * src_channels;
                (
                    src[i0] + (src[i1] - src[i0]) * frac,
                    src[i0 + 1] + (src[i1 + 1] - src[i0 + 1]) * frac,
                )
            };

            let dst = dst_sample as usize * channels;
            out[dst] += l * seg.volume;
            if channels > 1 {
                out[dst + 1] += r * seg.volume;
            }
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

/// Write interleaved samples as raw little-endian `f32`, creating parent directories.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> CompileResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CompileError::export(format!(
                "failed to create audio mix directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        CompileError::export(format!(
            "failed to write mixed audio '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
