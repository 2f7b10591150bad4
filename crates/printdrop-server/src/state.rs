// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared server state: the services every route handler reaches through
// axum's `State` extractor.

use std::sync::Arc;

use tracing::{info, warn};

use printdrop_core::AppConfig;
use printdrop_core::error::Result;
use printdrop_print::{
    CleanupScheduler, CommandBuilder, CommandExecutor, DryRunExecutor, JobStore, MemoryJobStore,
    PrintDispatcher, PrinterDirectory, SystemExecutor,
};
use printdrop_storage::UploadStore;

/// Services shared by all handlers.  Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: PrintDispatcher,
    pub printers: PrinterDirectory,
    pub uploads: UploadStore,
}

impl AppState {
    /// Build the services described by `config`.
    ///
    /// Must run inside the Tokio runtime: the file cleanup worker is spawned
    /// here.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let executor: Arc<dyn CommandExecutor> = if config.dry_run {
            warn!("dry-run mode: print commands are logged, not executed");
            Arc::new(DryRunExecutor)
        } else {
            Arc::new(SystemExecutor)
        };
        Self::with_executor(config, executor)
    }

    /// Build the services with a caller-supplied command executor.
    pub fn with_executor(config: &AppConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let platform = config.platform();
        let uploads = UploadStore::open(&config.upload_dir, config.max_upload_bytes)?;

        let store: Arc<dyn JobStore> = match config.job_retention() {
            Some(retention) => Arc::new(MemoryJobStore::with_retention(retention)),
            None => Arc::new(MemoryJobStore::new()),
        };
        let dispatcher = PrintDispatcher::new(
            store,
            CommandBuilder::new(platform),
            Arc::clone(&executor),
            CleanupScheduler::spawn(config.cleanup_delay()),
        );
        let printers = PrinterDirectory::new(platform, executor);

        info!(?platform, upload_dir = %config.upload_dir.display(), "services initialised");
        Ok(Self {
            dispatcher,
            printers,
            uploads,
        })
    }
}
