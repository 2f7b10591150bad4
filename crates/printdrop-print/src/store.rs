// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job registry.
//
// Jobs live in memory for the lifetime of the process.  The store is shared
// between every in-flight print request, so all access goes through a single
// mutex around the map and every mutation replaces one record atomically:
// the mutation runs on a copy, and the copy is written back only if the
// mutation succeeds.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{debug, info, instrument};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{JobId, PrintJob};

/// Storage for print job records.
///
/// The dispatcher is the only writer; everything else reads.
pub trait JobStore: Send + Sync {
    /// Insert a new job.  Fails with `DuplicateKey` if the id is taken.
    fn create(&self, job: PrintJob) -> Result<()>;

    /// Apply `mutation` to the job with `id` and return the updated record.
    ///
    /// Fails with `NotFound` if the job does not exist.  If the mutation
    /// returns an error the stored record is left untouched.
    fn update(
        &self,
        id: &JobId,
        mutation: &mut dyn FnMut(&mut PrintJob) -> Result<()>,
    ) -> Result<PrintJob>;

    fn get(&self, id: &JobId) -> Option<PrintJob>;

    /// All jobs, newest first.
    fn list_all(&self) -> Vec<PrintJob>;
}

/// In-memory job store.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, PrintJob>>,
    /// Jobs finished longer ago than this are dropped on the next insert.
    retention: Option<Duration>,
}

impl MemoryJobStore {
    /// A store that keeps every job until the process exits.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that forgets jobs once they have been finished for longer than
    /// `retention`.  Pending and printing jobs are never dropped.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Mutex::default(),
            retention: Some(retention),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned lock only means another request panicked mid-read: records
    // are replaced whole, so the map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, PrintJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune_expired(&self, jobs: &mut HashMap<JobId, PrintJob>) {
        let Some(retention) = self.retention else {
            return;
        };
        let Ok(window) = TimeDelta::from_std(retention) else {
            return;
        };
        let cutoff = Utc::now() - window;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !job.status.is_terminal() || job.finished_at.unwrap_or(job.timestamp) >= cutoff
        });
        let pruned = before - jobs.len();
        if pruned > 0 {
            info!(pruned, "expired print jobs dropped");
        }
    }
}

impl JobStore for MemoryJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    fn create(&self, job: PrintJob) -> Result<()> {
        let mut jobs = self.lock();
        if jobs.contains_key(&job.id) {
            return Err(PrintdropError::DuplicateKey(job.id));
        }
        self.prune_expired(&mut jobs);
        jobs.insert(job.id.clone(), job);
        debug!("job created");
        Ok(())
    }

    #[instrument(skip(self, mutation), fields(job_id = %id))]
    fn update(
        &self,
        id: &JobId,
        mutation: &mut dyn FnMut(&mut PrintJob) -> Result<()>,
    ) -> Result<PrintJob> {
        let mut jobs = self.lock();
        let current = jobs
            .get(id)
            .ok_or_else(|| PrintdropError::NotFound(id.clone()))?;

        let mut updated = current.clone();
        mutation(&mut updated)?;
        jobs.insert(id.clone(), updated.clone());

        debug!(status = %updated.status, "job updated");
        Ok(updated)
    }

    fn get(&self, id: &JobId) -> Option<PrintJob> {
        self.lock().get(id).cloned()
    }

    fn list_all(&self) -> Vec<PrintJob> {
        let mut jobs: Vec<PrintJob> = self.lock().values().cloned().collect();
        jobs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        jobs
    }
}
