use crate::foundation::error::{CompileError, CompileResult};
use crate::model::media::MediaItem;
use crate::model::settings::VideoCompilationSettings;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One compile request: the ordered clip snapshot plus its settings.
///
/// This is the JSON-facing form consumed by the driver binary.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompileJob {
    /// Clips in output order.
    pub media: Vec<MediaItem>,
    /// Render configuration.
    #[serde(default)]
    pub settings: VideoCompilationSettings,
}

impl CompileJob {
    /// Parse a job from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> CompileResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CompileError::validation(format!("parse compile job JSON: {e}")))
    }

    /// Parse a job from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CompileError::validation(format!("open compile job JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> CompileResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CompileError::validation(format!("serialize compile job: {e}")))
    }

    /// Structural checks that do not need resolved media.
    pub fn validate(&self) -> CompileResult<()> {
        if self.media.is_empty() {
            return Err(CompileError::validation("compile job has no media items"));
        }
        self.settings.validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/job.rs"]
mod tests;
