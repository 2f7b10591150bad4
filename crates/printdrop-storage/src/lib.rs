// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdrop Storage: the upload directory.  Uploaded documents are kept as
// plain files under generated names, with a JSON sidecar per file recording
// where it came from.

pub mod integrity;
pub mod uploads;

pub use integrity::hash_bytes;
pub use uploads::{FileInfo, FileMetadata, StoredFile, UploadStore};
