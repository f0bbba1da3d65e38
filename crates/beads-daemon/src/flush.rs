//! Debounced auto-flush scheduling.
//!
//! Every mutation marks the daemon dirty; after the last mutation quiesces
//! for the configured delay, one flush runs. Bursts of mutations coalesce
//! into a single flush.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default quiesce window before a flush runs.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_secs(5);

/// Builds the standard flush action: one sync cycle against the workspace.
///
/// Errors are logged, never propagated -- the next mutation schedules
/// another attempt.
pub fn sync_flush_fn(
    store: Arc<dyn beads_storage::Storage>,
    paths: beads_config::WorkspacePaths,
    config: beads_config::BeadsConfig,
    repo_root: Option<std::path::PathBuf>,
    actor: String,
) -> impl Fn() + Send + Sync + 'static {
    move || {
        match beads_sync::sync_cycle(
            store.as_ref(),
            &paths,
            &config,
            repo_root.as_deref(),
            &actor,
        ) {
            Ok(outcome) => debug!(
                exported = outcome.exported,
                committed = outcome.committed,
                "auto-flush cycle complete"
            ),
            Err(e) => warn!(error = %e, "auto-flush cycle failed"),
        }
    }
}

/// Handle for marking the daemon dirty.
#[derive(Clone)]
pub struct FlushScheduler {
    tx: mpsc::UnboundedSender<()>,
    dirty: Arc<AtomicBool>,
}

impl FlushScheduler {
    /// Spawns the scheduler task. `flush` runs on the tokio runtime after
    /// each quiesce window; it must be cheap to call repeatedly.
    pub fn spawn<F>(delay: Duration, flush: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let dirty = Arc::new(AtomicBool::new(false));
        let dirty_task = dirty.clone();

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Debounce: keep extending the window while marks arrive.
                loop {
                    match tokio::time::timeout(delay, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return, // all senders dropped
                        Err(_) => break,    // quiesced
                    }
                }
                dirty_task.store(false, Ordering::SeqCst);
                debug!("flush window quiesced; running flush");
                flush();
            }
        });

        Self { tx, dirty }
    }

    /// Records a mutation and schedules a flush.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        if self.tx.send(()).is_err() {
            warn!("flush scheduler task is gone; mutation will not auto-flush");
        }
    }

    /// Whether a mutation is awaiting flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}
