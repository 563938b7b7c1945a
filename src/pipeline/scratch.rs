use crate::foundation::error::{CompileError, CompileResult};
use std::path::{Path, PathBuf};

/// Private directory for intermediate and final renders.
///
/// Every path handed out carries a fresh v4 UUID, so concurrent compiles sharing one directory
/// never collide. Nothing here deletes files implicitly; the host may clear the directory while
/// idle.
#[derive(Clone, Debug)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Use `root`, creating it when missing.
    pub fn create(root: impl Into<PathBuf>) -> CompileResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            CompileError::Other(anyhow::anyhow!(
                "create scratch dir '{}': {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    /// Directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh path `<root>/<label>-<uuid>.<ext>`. The file is not created.
    pub fn unique_path(&self, label: &str, ext: &str) -> PathBuf {
        let id = uuid::Uuid::new_v4();
        self.root.join(format!("{label}-{}.{ext}", id.as_simple()))
    }

    /// Delete a superseded file. Failures are logged, never returned.
    pub fn discard(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed intermediate file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not remove intermediate file"
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/scratch.rs"]
mod tests;
