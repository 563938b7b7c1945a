//! Clip resolution: opaque source handles to seekable, probed assets.
//!
//! Resolution is a pure read. Implementations hold no mutable state, so several clips may be
//! resolved at once and re-resolving a handle yields an equivalent asset.

use crate::assets::probe::{MediaProbe, VideoStreamInfo, probe_media};
use crate::foundation::core::MediaTime;
use crate::foundation::error::{CompileError, CompileResult};
use crate::model::media::SourceHandle;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A loadable source asset exposing at most one video and one audio track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedClip {
    /// Handle this asset was resolved from.
    pub handle: SourceHandle,
    /// Local file backing the asset.
    pub path: PathBuf,
    /// Native duration.
    pub duration: MediaTime,
    /// Video track geometry; `None` when the container has no usable video track.
    pub video: Option<VideoStreamInfo>,
    /// Whether an audio track exists.
    pub has_audio: bool,
}

impl ResolvedClip {
    fn from_probe(handle: SourceHandle, probe: MediaProbe) -> Self {
        Self {
            handle,
            path: probe.path,
            duration: probe.duration,
            video: probe.video,
            has_audio: probe.has_audio,
        }
    }
}

/// Resolves source handles into assets. Failures are fatal for the compile that asked.
pub trait ClipResolver: Send + Sync {
    /// Resolve one handle.
    fn resolve(&self, handle: &SourceHandle) -> CompileResult<ResolvedClip>;
}

impl<R: ClipResolver + ?Sized> ClipResolver for Arc<R> {
    fn resolve(&self, handle: &SourceHandle) -> CompileResult<ResolvedClip> {
        (**self).resolve(handle)
    }
}

/// Resolver backed by files under a library root, probed with `ffprobe`.
#[derive(Clone, Debug)]
pub struct FfprobeResolver {
    library_root: PathBuf,
}

impl FfprobeResolver {
    /// Resolve handles relative to `library_root`.
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
        }
    }

    /// Map a handle to a file path, rejecting absolute paths and `..` escapes.
    pub fn path_for(&self, handle: &SourceHandle) -> CompileResult<PathBuf> {
        let rel = normalize_rel_path(handle.as_str())
            .map_err(|reason| CompileError::clip_load(handle.as_str(), reason))?;
        Ok(self.library_root.join(rel))
    }
}

impl ClipResolver for FfprobeResolver {
    fn resolve(&self, handle: &SourceHandle) -> CompileResult<ResolvedClip> {
        let path = self.path_for(handle)?;
        if !path.is_file() {
            return Err(CompileError::clip_load(
                handle.as_str(),
                format!("'{}' does not exist or is not a file", path.display()),
            ));
        }
        let probe = probe_media(&path).map_err(|e| match e {
            CompileError::ClipLoadFailed { reason, .. } => {
                CompileError::clip_load(handle.as_str(), reason)
            }
            other => other,
        })?;
        Ok(ResolvedClip::from_probe(handle.clone(), probe))
    }
}

/// Resolver over a fixed table of pre-probed assets. Unknown handles fail to resolve.
#[derive(Clone, Debug, Default)]
pub struct InMemoryResolver {
    clips: HashMap<SourceHandle, ResolvedClip>,
}

impl InMemoryResolver {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under its own handle.
    pub fn insert(&mut self, clip: ResolvedClip) -> &mut Self {
        self.clips.insert(clip.handle.clone(), clip);
        self
    }

    /// Builder-style [`InMemoryResolver::insert`].
    pub fn with(mut self, clip: ResolvedClip) -> Self {
        self.insert(clip);
        self
    }
}

impl ClipResolver for InMemoryResolver {
    fn resolve(&self, handle: &SourceHandle) -> CompileResult<ResolvedClip> {
        self.clips
            .get(handle)
            .cloned()
            .ok_or_else(|| CompileError::clip_load(handle.as_str(), "handle is not in the library"))
    }
}

/// Resolve every handle with at most `max_in_flight` concurrent resolutions.
///
/// Results keep input order. The first failure in list order is returned.
pub fn resolve_all(
    resolver: &dyn ClipResolver,
    handles: &[SourceHandle],
    max_in_flight: usize,
) -> CompileResult<Vec<ResolvedClip>> {
    if handles.is_empty() {
        return Ok(Vec::new());
    }
    let threads = max_in_flight.clamp(1, handles.len());
    if threads == 1 {
        return handles.iter().map(|h| resolver.resolve(h)).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("reelstitch-resolve-{i}"))
        .build()
        .map_err(|e| CompileError::Other(anyhow::anyhow!("build resolve pool: {e}")))?;
    let results: Vec<CompileResult<ResolvedClip>> =
        pool.install(|| handles.par_iter().map(|h| resolver.resolve(h)).collect());
    results.into_iter().collect()
}

/// Normalize a library-relative path, rejecting absolute paths and parent escapes.
pub fn normalize_rel_path(source: &str) -> Result<PathBuf, String> {
    let s = source.trim();
    if s.is_empty() {
        return Err("source handle must be non-empty".to_owned());
    }
    let s = s.replace('\\', "/");
    let p = Path::new(&s);
    if p.is_absolute() {
        return Err(format!("source handle '{source}' must be library-relative"));
    }

    let mut out = PathBuf::new();
    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::Normal(c) => out.push(c),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(format!("source handle '{source}' escapes the library root"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("source handle '{source}' must be library-relative"));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(format!("source handle '{source}' names no file"));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolver.rs"]
mod tests;
