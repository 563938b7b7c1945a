/// Convenience result type used across reelstitch.
pub type CompileResult<T> = Result<T, CompileError>;

/// Top-level error taxonomy surfaced through the compile completion channel.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// Caller-provided media items or settings break an invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// The output composition could not allocate a video or audio track.
    #[error("track creation failed: {0}")]
    TrackCreationFailed(String),

    /// A source clip could not be resolved into a loadable asset.
    #[error("clip load failed for '{handle}': {reason}")]
    ClipLoadFailed {
        /// Source handle that failed to resolve.
        handle: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The primary or post-processing render reported a terminal failure.
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// Synthetic title-card rasterization failed.
    #[error("image load failed: {0}")]
    ImageLoadFailed(String),

    /// The caller cancelled the compile.
    #[error("compile cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompileError {
    /// Build a [`CompileError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CompileError::TrackCreationFailed`] value.
    pub fn track_creation(msg: impl Into<String>) -> Self {
        Self::TrackCreationFailed(msg.into())
    }

    /// Build a [`CompileError::ClipLoadFailed`] value.
    pub fn clip_load(handle: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClipLoadFailed {
            handle: handle.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`CompileError::ExportFailed`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailed(msg.into())
    }

    /// Build a [`CompileError::ImageLoadFailed`] value.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageLoadFailed(msg.into())
    }

    /// Wrap any error as an export failure, keeping its message.
    pub fn wrap_export(err: CompileError) -> Self {
        match err {
            e @ (Self::ExportFailed(_) | Self::Cancelled) => e,
            other => Self::ExportFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
