// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes.
//
// Everything lives under `/api`:
//
//   /api/print/...   printers, printing, job tracking
//   /api/files/...   the upload directory

mod files;
mod print;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::{HeaderName, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use printdrop_core::AppConfig;

use crate::error::ApiResult;
use crate::state::AppState;

/// Room for multipart framing on top of the document size limit.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the application router.
pub fn router(state: AppState, config: &AppConfig) -> Router {
    let body_limit = usize::try_from(config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    let api = Router::new()
        .nest("/print", print::routes())
        .nest("/files", files::routes());

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any-origin CORS with credentials for browser front-ends on the LAN.
///
/// Credentials rule out the `*` wildcards, so origin and headers are
/// mirrored from the request instead.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.cors_allow_any_origin {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::PUT])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([HeaderName::from_static("content-disposition")])
        .allow_credentials(true)
}

/// A file part of a multipart upload.
pub(crate) struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// The fields the upload forms understand.
#[derive(Default)]
pub(crate) struct UploadForm {
    pub file: Option<UploadedFile>,
    pub printer_name: Option<String>,
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    original_name,
                    content_type,
                    bytes,
                });
            }
            Some("printerName") => {
                let printer = field.text().await?;
                let printer = printer.trim();
                if !printer.is_empty() {
                    form.printer_name = Some(printer.to_owned());
                }
            }
            _ => {}
        }
    }
    Ok(form)
}
