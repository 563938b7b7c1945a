use crate::foundation::error::{CompileError, CompileResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Setup (resolution, track allocation) finished.
pub const PROGRESS_SETUP: f64 = 0.1;
/// Share of the progress range spent placing clips.
pub const PROGRESS_TIMELINE_SPAN: f64 = 0.7;
/// Timeline, transforms and overlays assembled.
pub const PROGRESS_ASSEMBLED: f64 = 0.8;
/// Primary export finished.
pub const PROGRESS_EXPORTED: f64 = 0.9;
/// Output file ready.
pub const PROGRESS_DONE: f64 = 1.0;

/// Progress while placing clip `index` of `count`.
pub fn clip_progress(index: usize, count: usize) -> f64 {
    if count == 0 {
        return PROGRESS_SETUP;
    }
    PROGRESS_SETUP + (index as f64 / count as f64) * PROGRESS_TIMELINE_SPAN
}

/// Status stream of one compile.
#[derive(Debug)]
pub enum CompileEvent {
    /// Fraction complete in `[0, 1]`, non-decreasing.
    Progress(f64),
    /// Terminal result; always the last event.
    Finished(CompileResult<PathBuf>),
}

/// Forwards progress to a callback, dropping values that would move backwards.
pub struct ProgressReporter<'a> {
    last: Option<f64>,
    sink: Box<dyn FnMut(f64) + Send + 'a>,
}

impl std::fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl<'a> ProgressReporter<'a> {
    /// Reporter calling `sink` for each accepted value.
    pub fn new(sink: impl FnMut(f64) + Send + 'a) -> Self {
        Self {
            last: None,
            sink: Box::new(sink),
        }
    }

    /// Reporter that discards everything.
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    /// Report `value`, clamped to `[0, 1]`. Values below the last reported one are ignored.
    pub fn report(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if let Some(last) = self.last
            && value < last
        {
            return;
        }
        self.last = Some(value);
        (self.sink)(value);
    }

    /// Last accepted value.
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

/// Cooperative cancellation flag shared between a caller and a running compile.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> CompileResult<()> {
        if self.is_cancelled() {
            return Err(CompileError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
