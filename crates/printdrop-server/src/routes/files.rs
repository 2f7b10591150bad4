// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The upload directory: listing, upload, inline preview and deletion.

use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use printdrop_storage::FileInfo;

use crate::error::{ApiError, ApiResult};
use crate::routes::read_upload_form;
use crate::source::ClientSource;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files))
        .route("/upload", post(upload_file))
        .route("/preview/{filename}", get(preview_file))
        .route("/{filename}", delete(delete_file))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    filename: String,
    original_name: String,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn list_files(State(state): State<AppState>) -> Json<Vec<FileInfo>> {
    Json(state.uploads.list().await)
}

async fn upload_file(
    State(state): State<AppState>,
    ClientSource(source): ClientSource,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let form = read_upload_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let stored = state
        .uploads
        .save(&file.original_name, &file.content_type, &file.bytes, Some(source))
        .await?;

    Ok(Json(UploadResponse {
        filename: stored.filename,
        original_name: stored.original_name,
        message: "File uploaded successfully",
    }))
}

async fn preview_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path = state
        .uploads
        .path_for(&filename)
        .map_err(|_| ApiError::not_found("File not found"))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("File not found"))?;

    let headers = [
        (CONTENT_TYPE, state.uploads.content_type(&filename).to_owned()),
        (CONTENT_DISPOSITION, format!("inline; filename=\"{filename}\"")),
    ];
    Ok((headers, bytes))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.uploads.delete(&filename).await? {
        return Err(ApiError::not_found("File not found"));
    }
    info!(%filename, "upload deleted on request");
    Ok(Json(MessageResponse {
        message: "File deleted successfully",
    }))
}
