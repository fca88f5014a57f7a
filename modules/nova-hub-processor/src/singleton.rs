use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::BatchProcessor;

/// Guards `trigger()` so at most one batch runs process-wide. Unlike a
/// supervisor lock backed by a DB row consulted across processes, this hub
/// is single-process, so a plain `AtomicBool` is enough — acquire/run/release
/// follows the same shape regardless.
pub struct SingletonGuard {
    running: AtomicBool,
}

impl SingletonGuard {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Nonblocking: if a batch is already in flight, this is a no-op.
    /// Otherwise spawns one on the current Tokio runtime.
    pub fn trigger(self: &Arc<Self>, processor: Arc<BatchProcessor>) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("batch already in flight, trigger is a no-op");
            return;
        }

        let guard = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = processor.run_once().await {
                warn!(error = %e, "batch run failed");
            }
            guard.running.store(false, Ordering::SeqCst);
        });
    }
}

impl Default for SingletonGuard {
    fn default() -> Self {
        Self::new()
    }
}
