// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deferred deletion of printed source files.
//
// Print spoolers often keep reading a file for a moment after the submitting
// command has returned, so a printed file is only removed after a grace
// period.  Requests are queued to a background worker that arms one timer per
// file; the request path never waits for the deletion.  Every deletion can be
// cancelled through the handle returned when it was scheduled.  Failures are
// logged and otherwise ignored: a leftover upload is untidy, not incorrect.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// A queued deletion.
struct CleanupRequest {
    path: PathBuf,
    delay: Duration,
    cancel: oneshot::Receiver<()>,
}

/// Handle to a scheduled deletion.
///
/// Dropping the handle leaves the deletion scheduled; call [`cancel`] to
/// keep the file.
///
/// [`cancel`]: CleanupHandle::cancel
#[derive(Debug)]
pub struct CleanupHandle {
    path: PathBuf,
    cancel: oneshot::Sender<()>,
}

impl CleanupHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancel the deletion.  Returns `false` if it already ran (or the
    /// worker has shut down).
    pub fn cancel(self) -> bool {
        let cancelled = self.cancel.send(()).is_ok();
        if cancelled {
            debug!(path = %self.path.display(), "file cleanup cancelled");
        }
        cancelled
    }
}

/// Schedules source-file deletion on a background worker.
///
/// Cheap to clone; all clones feed the same worker.  Must be created inside
/// a Tokio runtime.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    tx: mpsc::UnboundedSender<CleanupRequest>,
    delay: Duration,
}

impl CleanupScheduler {
    /// Start the worker.  Files are deleted `delay` after being scheduled.
    pub fn spawn(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx));
        debug!(delay_ms = delay.as_millis() as u64, "file cleanup worker started");
        Self { tx, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delete `path` after the configured delay.
    pub fn schedule(&self, path: impl Into<PathBuf>) -> CleanupHandle {
        self.schedule_after(path, self.delay)
    }

    /// Delete `path` after `delay`.
    pub fn schedule_after(&self, path: impl Into<PathBuf>, delay: Duration) -> CleanupHandle {
        let path = path.into();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let request = CleanupRequest {
            path: path.clone(),
            delay,
            cancel: cancel_rx,
        };
        if self.tx.send(request).is_err() {
            warn!(path = %path.display(), "file cleanup worker is gone, file will be kept");
        }
        CleanupHandle {
            path,
            cancel: cancel_tx,
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<CleanupRequest>) {
    while let Some(request) = rx.recv().await {
        tokio::spawn(run_cleanup(request));
    }
    debug!("file cleanup worker stopped");
}

async fn run_cleanup(request: CleanupRequest) {
    let CleanupRequest {
        path,
        delay,
        cancel,
    } = request;

    // A dropped handle makes `cancel` resolve to `Err`, which disables that
    // branch and leaves the timer running.
    tokio::select! {
        _ = tokio::time::sleep(delay) => remove_source_file(&path).await,
        Ok(()) = cancel => {}
    }
}

async fn remove_source_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "printed file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "printed file already gone");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove printed file"),
    }
}
