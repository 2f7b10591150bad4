// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload directory with metadata sidecars.
//
// Layout:
//
//   uploads/
//     file-1736150000000-482913075.pdf
//     .metadata/
//       file-1736150000000-482913075.pdf.json
//
// Stored names are generated, never taken from the client.  Names that come
// back from clients (preview, delete, print-by-name) must be plain base names
// so they cannot reach outside the upload directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::{DocumentType, SourceInfo, mime_type_for};

use crate::integrity::hash_bytes;

/// Name of the sidecar directory inside the upload root.
pub const METADATA_DIR: &str = ".metadata";

/// Prefix of generated file names.
const STORED_PREFIX: &str = "file";

/// Attempts at finding an unused generated name before giving up.
const NAME_ATTEMPTS: usize = 8;

/// Sidecar contents, written once at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub upload_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
    /// Hex SHA-256 of the stored bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A file listed from the upload directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub upload_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
    /// Known only for uploads that have a sidecar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Result of storing an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated name under the upload root.
    pub filename: String,
    pub original_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// The upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: u64,
}

impl UploadStore {
    /// Open (creating if needed) the upload directory at `root`.
    pub fn open(root: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(METADATA_DIR))?;
        info!(root = %root.display(), max_bytes, "upload directory ready");
        Ok(Self { root, max_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Store an upload and record its metadata sidecar.
    ///
    /// A sidecar that cannot be written is logged; the upload itself still
    /// succeeds.
    #[instrument(skip(self, bytes, source), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        original_name: &str,
        mime: &str,
        bytes: &[u8],
        source: Option<SourceInfo>,
    ) -> Result<StoredFile> {
        let stored = self.store(original_name, mime, bytes).await?;

        let metadata = FileMetadata {
            filename: stored.filename.clone(),
            original_name: stored.original_name.clone(),
            mimetype: mime.to_owned(),
            upload_time: Utc::now(),
            source_info: source,
            sha256: Some(stored.sha256.clone()),
        };
        if let Err(e) = self.write_metadata(&metadata).await {
            warn!(filename = %stored.filename, error = %e, "failed to write upload metadata");
        }
        Ok(stored)
    }

    /// Store an upload without a sidecar.
    ///
    /// Used for files that are printed straight away and never listed.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(&self, original_name: &str, mime: &str, bytes: &[u8]) -> Result<StoredFile> {
        let document_type = DocumentType::from_mime_type(mime)
            .ok_or_else(|| PrintdropError::UnsupportedDocument(mime.to_owned()))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(PrintdropError::FileTooLarge {
                limit: self.max_bytes,
            });
        }

        let original_name = client_base_name(original_name);
        let extension = stored_extension(&original_name, document_type);

        for _ in 0..NAME_ATTEMPTS {
            let filename = generate_name(&extension);
            let path = self.root.join(&filename);
            let file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            write_new_file(file, &path, bytes).await?;

            let sha256 = hash_bytes(bytes);
            info!(%filename, original = %original_name, %sha256, "upload stored");
            return Ok(StoredFile {
                filename,
                original_name,
                path,
                size: bytes.len() as u64,
                sha256,
            });
        }
        Err(PrintdropError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not generate an unused upload name",
        )))
    }

    /// Stored files, newest upload first.  Read failures give an empty list.
    pub async fn list(&self) -> Vec<FileInfo> {
        match self.try_list().await {
            Ok(files) => files,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "failed to list uploads");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> Result<Vec<FileInfo>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let stat = match entry.metadata().await {
                Ok(stat) if stat.is_file() => stat,
                Ok(_) => continue,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            let metadata = self.read_metadata(&filename).await;
            let upload_time = metadata
                .as_ref()
                .map(|m| m.upload_time)
                .unwrap_or_else(|| file_time(stat.created().or_else(|_| stat.modified())));
            let original_name = metadata
                .as_ref()
                .map(|m| m.original_name.clone())
                .unwrap_or_else(|| filename.clone());

            let (source_info, sha256) = match metadata {
                Some(m) => (m.source_info, m.sha256),
                None => (None, None),
            };
            files.push(FileInfo {
                mimetype: mime_type_for(&filename).to_owned(),
                original_name,
                size: stat.len(),
                upload_time,
                source_info,
                sha256,
                filename,
            });
        }

        files.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
        Ok(files)
    }

    /// Delete a stored file and its sidecar.  Returns `false` if there was
    /// no such file.
    #[instrument(skip(self))]
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        match tokio::fs::remove_file(self.metadata_path(filename)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(%filename, error = %e, "failed to remove upload metadata"),
        }
        info!("upload deleted");
        Ok(true)
    }

    /// Absolute location of a stored file.  Rejects anything that is not a
    /// plain base name.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.path_for(filename) {
            Ok(path) => tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Content type served for a stored file.
    pub fn content_type(&self, filename: &str) -> &'static str {
        mime_type_for(filename)
    }

    fn metadata_path(&self, filename: &str) -> PathBuf {
        self.root.join(METADATA_DIR).join(format!("{filename}.json"))
    }

    async fn write_metadata(&self, metadata: &FileMetadata) -> Result<()> {
        let json = serde_json::to_string_pretty(metadata)?;
        tokio::fs::write(self.metadata_path(&metadata.filename), json).await?;
        Ok(())
    }

    async fn read_metadata(&self, filename: &str) -> Option<FileMetadata> {
        let data = match tokio::fs::read_to_string(self.metadata_path(filename)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(%filename, error = %e, "failed to read upload metadata");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(%filename, error = %e, "corrupt upload metadata");
                None
            }
        }
    }
}

/// Reject names that are empty, hidden, or could address anything outside
/// the upload root.
/// Write `bytes` into the freshly created file at `path`.  A failed write
/// removes the file so no truncated upload is ever listed.
async fn write_new_file<W>(mut file: W, path: &Path, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    drop(file);

    if let Err(e) = written {
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %remove_err, "failed to remove partial upload");
        }
        return Err(e);
    }
    Ok(())
}

fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0'])
        || filename.contains("..");
    if invalid {
        return Err(PrintdropError::InvalidFilename(filename.to_owned()));
    }
    Ok(())
}

/// Last component of a client-supplied name.  Some clients send full local
/// paths in either separator style.
fn client_base_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original).trim();
    if base.is_empty() {
        "upload".to_owned()
    } else {
        base.to_owned()
    }
}

/// Extension for the stored copy: the client's own, if it is a sane one,
/// otherwise the canonical one for the document type.
fn stored_extension(original_name: &str, document_type: DocumentType) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| document_type.extension().to_owned())
}

/// `file-<unix millis>-<random>.<ext>`
fn generate_name(extension: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "{STORED_PREFIX}-{}-{suffix}.{extension}",
        Utc::now().timestamp_millis()
    )
}

fn file_time(time: std::io::Result<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}
