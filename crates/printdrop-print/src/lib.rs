// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdrop Print: OS spooler dispatch, printer queries, and job tracking.
// This crate bridges between the core domain types defined in
// `printdrop-core` and the host's print subsystem (CUPS `lp`/`lpstat`, or
// PowerShell on Windows).

pub mod cleanup;
pub mod command;
pub mod directory;
pub mod dispatcher;
pub mod executor;
pub mod store;

pub use cleanup::{CleanupHandle, CleanupScheduler};
pub use command::{CommandBuilder, CommandSpec, PrintCommand, PrintTarget};
pub use directory::PrinterDirectory;
pub use dispatcher::PrintDispatcher;
pub use executor::{CommandExecutor, CommandOutput, DryRunExecutor, SystemExecutor};
pub use store::{JobStore, MemoryJobStore};
