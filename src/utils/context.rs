use crate::models::error::SError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanProgress {
    pub done: usize,
    pub total: usize,
}

type ProgressFn = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Cooperative cancellation and progress reporting for a running scan.
/// Clones share the same cancel flag.
#[derive(Clone, Default)]
pub struct ScanContext {
    cancelled: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
}

impl ScanContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(f));
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), SError> {
        if self.is_cancelled() {
            return Err(SError::Cancelled);
        }
        Ok(())
    }

    pub fn emit(&self, progress: ScanProgress) {
        if let Some(f) = &self.progress {
            f(progress);
        }
    }
}

impl std::fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
