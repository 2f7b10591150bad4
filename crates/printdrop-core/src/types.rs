// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the printdrop print server.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PrintdropError, Result};

/// Alphabet for the random part of a job id.
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix of a job id.
const JOB_ID_SUFFIX_LEN: usize = 9;

/// Unique identifier for a print job.
///
/// Rendered as `job_<unix-millis>_<suffix>`: the millisecond prefix keeps ids
/// roughly time-ordered in logs, the base-36 suffix keeps two jobs created in
/// the same millisecond apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..JOB_ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("job_{}_{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle states of a print job.
///
/// Jobs only ever move forward: `Pending -> Printing -> Completed | Failed`.
/// A pending job may also fail directly (source file missing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, no external command has run yet.
    Pending,
    /// The OS print command is running.
    Printing,
    /// The OS print command exited successfully.
    Completed,
    /// Printing failed; see the job's `error` field.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a job in this state may move to `next`.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Printing)
                | (Self::Pending, Self::Failed)
                | (Self::Printing, Self::Completed)
                | (Self::Printing, Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for a print job.  Audit metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl SourceInfo {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            hostname: None,
            user_agent: Some(user_agent.into()),
        }
    }
}

/// One tracked attempt to print a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: JobId,
    /// Base name of the source file.
    pub filename: String,
    pub status: JobStatus,
    /// Creation time; listing sort key.
    pub timestamp: DateTime<Utc>,
    /// When the job reached `completed` or `failed`; retention is counted
    /// from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Present only when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
}

impl PrintJob {
    pub fn new(id: JobId, filename: impl Into<String>, source_info: Option<SourceInfo>) -> Self {
        Self {
            id,
            filename: filename.into(),
            status: JobStatus::Pending,
            timestamp: Utc::now(),
            finished_at: None,
            error: None,
            source_info,
        }
    }

    /// Move the job forward to `next`, rejecting backward or sideways moves.
    pub fn advance(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(PrintdropError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Mark the job failed with a human-readable reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.advance(JobStatus::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }
}

/// A printer known to the OS print subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterInfo {
    pub name: String,
    /// State string as reported by the OS (e.g. "idle", "Normal", "Offline").
    pub status: String,
    pub is_default: bool,
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    #[serde(alias = "a4")]
    A4,
    #[serde(alias = "a3")]
    A3,
    #[serde(alias = "a5")]
    A5,
    #[serde(alias = "letter")]
    Letter,
    #[serde(alias = "legal")]
    Legal,
    #[serde(alias = "tabloid")]
    Tabloid,
}

impl PaperSize {
    /// Size assumed by the print subsystem when none is requested.
    pub const BASELINE: PaperSize = PaperSize::A4;

    /// CUPS `media` option value.
    pub fn cups_media(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A3 => "A3",
            Self::A5 => "A5",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
        }
    }

    /// Name accepted by the Windows `Set-PrintConfiguration -PaperSize` cmdlet.
    pub fn windows_name(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A3 => "A3",
            Self::A5 => "A5",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
        }
    }
}

/// Duplex printing mode.
///
/// On the wire this is `simplex`, `duplex` (flip on the long edge) or
/// `tumble` (flip on the short edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplexMode {
    #[default]
    #[serde(rename = "simplex")]
    Simplex,
    #[serde(rename = "duplex")]
    LongEdge,
    #[serde(rename = "tumble")]
    ShortEdge,
}

impl DuplexMode {
    /// CUPS `sides` option value.
    pub fn cups_sides(&self) -> &'static str {
        match self {
            Self::Simplex => "one-sided",
            Self::LongEdge => "two-sided-long-edge",
            Self::ShortEdge => "two-sided-short-edge",
        }
    }

    /// Windows `DuplexingMode` value.
    pub fn windows_mode(&self) -> &'static str {
        match self {
            Self::Simplex => "OneSided",
            Self::LongEdge => "TwoSidedLongEdge",
            Self::ShortEdge => "TwoSidedShortEdge",
        }
    }
}

/// Upper bound on `copies` accepted from a client.
pub const MAX_COPIES: u32 = 99;

/// Client-supplied print options.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    #[serde(default)]
    pub paper_size: Option<PaperSize>,
    #[serde(default)]
    pub duplex: Option<DuplexMode>,
    #[serde(default)]
    pub copies: Option<u32>,
}

impl PrintOptions {
    /// Paper size to forward explicitly, if it differs from the baseline.
    pub fn explicit_paper_size(&self) -> Option<PaperSize> {
        self.paper_size.filter(|size| *size != PaperSize::BASELINE)
    }

    /// Duplex mode to forward explicitly; simplex is never forwarded.
    pub fn explicit_duplex(&self) -> Option<DuplexMode> {
        self.duplex.filter(|mode| *mode != DuplexMode::Simplex)
    }

    /// Number of print invocations to issue.  Zero counts as one.
    pub fn effective_copies(&self) -> u32 {
        self.copies.unwrap_or(1).max(1)
    }

    /// Reject options no print back-end should be asked to honour.
    pub fn validate(&self) -> Result<()> {
        match self.copies {
            Some(copies) if copies > MAX_COPIES => Err(PrintdropError::InvalidOptions(format!(
                "copies must be at most {MAX_COPIES}, got {copies}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Word,
    WordOpenXml,
    Excel,
    ExcelOpenXml,
    PlainText,
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl DocumentType {
    pub const ALL: [DocumentType; 10] = [
        Self::Pdf,
        Self::Word,
        Self::WordOpenXml,
        Self::Excel,
        Self::ExcelOpenXml,
        Self::PlainText,
        Self::Jpeg,
        Self::Png,
        Self::Gif,
        Self::Bmp,
    ];

    /// MIME type string used for uploads and previews.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Word => "application/msword",
            Self::WordOpenXml => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Excel => "application/vnd.ms-excel",
            Self::ExcelOpenXml => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            Self::PlainText => "text/plain",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Word),
            "docx" => Some(Self::WordOpenXml),
            "xls" => Some(Self::Excel),
            "xlsx" => Some(Self::ExcelOpenXml),
            "txt" => Some(Self::PlainText),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Infer document type from the extension of a path or file name.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.mime_type() == mime)
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "doc",
            Self::WordOpenXml => "docx",
            Self::Excel => "xls",
            Self::ExcelOpenXml => "xlsx",
            Self::PlainText => "txt",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Gif | Self::Bmp)
    }
}

/// MIME type for a stored file name; unknown extensions are opaque bytes.
pub fn mime_type_for(filename: &str) -> &'static str {
    DocumentType::from_path(filename)
        .map(|t| t.mime_type())
        .unwrap_or("application/octet-stream")
}

/// OS print subsystem the server drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows spooler, driven through PowerShell and shell verbs.
    Windows,
    /// CUPS (`lp` / `lpstat`) on Linux and macOS.
    Cups,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Cups }
    }
}
