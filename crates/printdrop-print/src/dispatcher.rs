// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatch.
//
// Drives one print request through the job state machine:
//
//   pending ──▶ printing ──▶ completed
//      │            │
//      └────────────┴─────▶ failed
//
// The job record is created before any I/O so that even a request that
// fails immediately is visible in the job list.  Once the print command has
// run, the source file is handed to the cleanup worker whatever the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{Instrument, error, info, instrument, warn};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{JobId, JobStatus, PrintJob, PrintOptions, SourceInfo};

use crate::cleanup::CleanupScheduler;
use crate::command::{CommandBuilder, PrintCommand};
use crate::executor::CommandExecutor;
use crate::store::JobStore;

/// Accepts print requests and tracks them as jobs.
///
/// Cheap to clone; clones share the job store, executor and cleanup worker.
#[derive(Clone)]
pub struct PrintDispatcher {
    store: Arc<dyn JobStore>,
    builder: CommandBuilder,
    executor: Arc<dyn CommandExecutor>,
    cleanup: CleanupScheduler,
}

impl PrintDispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        builder: CommandBuilder,
        executor: Arc<dyn CommandExecutor>,
        cleanup: CleanupScheduler,
    ) -> Self {
        Self {
            store,
            builder,
            executor,
            cleanup,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Print `path` and wait for the print command to finish.
    ///
    /// Returns the job id on success.  On failure the job is left `failed`
    /// with the error recorded, and the same error is returned.  Options that
    /// fail validation are rejected before any job is created.
    ///
    /// The job itself runs on its own task: dropping the returned future
    /// stops the wait, not the print, and the job still reaches a terminal
    /// state with its file handed to the cleanup worker.
    #[instrument(
        skip_all,
        fields(
            path = %path.display(),
            printer = printer.unwrap_or("default"),
            source_ip = source.as_ref().map(|s| s.ip_address.as_str()).unwrap_or("-"),
        )
    )]
    pub async fn print_file(
        &self,
        path: &Path,
        printer: Option<&str>,
        options: &PrintOptions,
        source: Option<SourceInfo>,
    ) -> Result<JobId> {
        options.validate()?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let job = PrintJob::new(JobId::generate(), filename, source);
        let job_id = job.id.clone();
        self.store.create(job)?;
        info!(job_id = %job_id, ?options, "print job created");

        let command = self.builder.build(path, printer, options);
        let task = tokio::spawn(
            self.clone()
                .run_job(job_id.clone(), path.to_path_buf(), command)
                .in_current_span(),
        );

        match task.await {
            Ok(outcome) => outcome.map(|()| job_id),
            Err(e) => {
                let err = PrintdropError::PrintExecutionFailed(format!("print task aborted: {e}"));
                error!(job_id = %job_id, error = %err, "print job failed");
                self.store
                    .update(&job_id, &mut |job| job.fail(err.to_string()))?;
                Err(err)
            }
        }
    }

    /// Drive one job from `pending` to a terminal state.
    async fn run_job(self, job_id: JobId, path: PathBuf, command: PrintCommand) -> Result<()> {
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let err = PrintdropError::FileNotFound;
            warn!(job_id = %job_id, "source file missing");
            self.store
                .update(&job_id, &mut |job| job.fail(err.to_string()))?;
            return Err(err);
        }

        self.store
            .update(&job_id, &mut |job| job.advance(JobStatus::Printing))?;

        let outcome = self.execute(&job_id, &command).await;

        // The spooler may still be reading the file; delete it later.
        self.cleanup.schedule(&path);

        match outcome {
            Ok(()) => {
                self.store
                    .update(&job_id, &mut |job| job.advance(JobStatus::Completed))?;
                info!(job_id = %job_id, target = %command.target, "print job completed");
                Ok(())
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "print job failed");
                self.store
                    .update(&job_id, &mut |job| job.fail(err.to_string()))?;
                Err(err)
            }
        }
    }

    /// Run the invocation once per copy, stopping at the first failure.
    async fn execute(&self, job_id: &JobId, command: &PrintCommand) -> Result<()> {
        let spec = &command.invocation;
        for copy in 1..=command.copies {
            info!(job_id = %job_id, copy, total = command.copies, command = %spec, "running print command");
            let output = self
                .executor
                .run(spec)
                .await
                .map_err(|e| {
                    PrintdropError::PrintExecutionFailed(format!("{}: {e}", spec.program))
                })?;
            if !output.success() {
                return Err(PrintdropError::PrintExecutionFailed(output.failure_detail()));
            }
        }
        Ok(())
    }

    pub fn print_job(&self, id: &JobId) -> Option<PrintJob> {
        self.store.get(id)
    }

    /// All jobs, newest first.
    pub fn all_print_jobs(&self) -> Vec<PrintJob> {
        self.store.list_all()
    }
}
