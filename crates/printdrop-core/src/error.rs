// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for printdrop.

use thiserror::Error;

use crate::types::{JobId, JobStatus};

/// Top-level error type for all printdrop operations.
#[derive(Debug, Error)]
pub enum PrintdropError {
    // -- Print errors --
    /// The source document vanished before it could be dispatched.
    #[error("File not found")]
    FileNotFound,

    /// Enumerating printers or looking up the default printer failed.
    /// Callers of the printer directory never see this; it is logged and
    /// degraded to an empty result.
    #[error("printer query failed: {0}")]
    PrinterQueryFailed(String),

    #[error("print command failed: {0}")]
    PrintExecutionFailed(String),

    #[error("invalid print options: {0}")]
    InvalidOptions(String),

    // -- Job store --
    #[error("print job {0} not found")]
    NotFound(JobId),

    #[error("print job {0} already exists")]
    DuplicateKey(JobId),

    #[error("invalid job transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    // -- Upload storage --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("file exceeds the upload limit of {limit} bytes")]
    FileTooLarge { limit: u64 },

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdropError>;
