// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer queries, print submission and job tracking.

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use printdrop_core::types::{JobId, PrintJob, PrintOptions, PrinterInfo};

use crate::error::{ApiError, ApiResult};
use crate::routes::read_upload_form;
use crate::source::ClientSource;
use crate::state::AppState;

const SUBMITTED: &str = "Print job submitted successfully";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/printers", get(list_printers))
        .route("/default-printer", get(default_printer))
        .route("/upload-and-print", post(upload_and_print))
        .route("/file", post(print_uploaded_file))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{job_id}", get(get_job))
}

#[derive(Debug, Serialize)]
struct DefaultPrinterResponse {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: JobId,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrintFileRequest {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    printer_name: Option<String>,
    #[serde(default)]
    options: Option<PrintOptions>,
}

async fn list_printers(State(state): State<AppState>) -> Json<Vec<PrinterInfo>> {
    Json(state.printers.list_printers().await)
}

async fn default_printer(State(state): State<AppState>) -> Json<DefaultPrinterResponse> {
    Json(DefaultPrinterResponse {
        name: state.printers.default_printer().await,
    })
}

/// Store a multipart upload and print it straight away with default options.
async fn upload_and_print(
    State(state): State<AppState>,
    ClientSource(source): ClientSource,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let form = read_upload_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let stored = state
        .uploads
        .store(&file.original_name, &file.content_type, &file.bytes)
        .await?;
    info!(
        filename = %stored.filename,
        original = %stored.original_name,
        source_ip = %source.ip_address,
        "upload received for printing"
    );

    let job_id = state
        .dispatcher
        .print_file(
            &stored.path,
            form.printer_name.as_deref(),
            &PrintOptions::default(),
            Some(source),
        )
        .await
        .map_err(|e| ApiError::print_failed(&e))?;

    Ok(Json(SubmitResponse {
        job_id,
        message: SUBMITTED,
    }))
}

/// Print a file already in the upload directory.
async fn print_uploaded_file(
    State(state): State<AppState>,
    ClientSource(source): ClientSource,
    Json(request): Json<PrintFileRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let filename = request.filename.trim();
    if filename.is_empty() {
        return Err(ApiError::bad_request("Filename is required"));
    }

    let path = state
        .uploads
        .path_for(filename)
        .map_err(|e| ApiError::print_failed(&e))?;
    let options = request.options.unwrap_or_default();

    let job_id = state
        .dispatcher
        .print_file(&path, request.printer_name.as_deref(), &options, Some(source))
        .await
        .map_err(|e| ApiError::print_failed(&e))?;

    Ok(Json(SubmitResponse {
        job_id,
        message: SUBMITTED,
    }))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<PrintJob>> {
    Json(state.dispatcher.all_print_jobs())
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<PrintJob>> {
    state
        .dispatcher
        .print_job(&JobId::from(job_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Print job not found"))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{TestApp, json_body, multipart_body, multipart_request};
    use printdrop_core::types::JobStatus;
    use printdrop_print::CommandOutput;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn printers_come_from_lpstat() {
        let app = TestApp::new(CommandOutput::ok(
            "printer Office is idle.  enabled since Mon 06 Jan 2026\nsystem default destination: Office\n",
        ));
        let response = app.send(get("/api/print/printers")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json, json!([{ "name": "Office", "status": "idle", "isDefault": true }]));
    }

    #[tokio::test]
    async fn printer_query_failure_is_an_empty_list() {
        let app = TestApp::new(CommandOutput::failed(1, "lpstat: scheduler not running"));
        let response = app.send(get("/api/print/printers")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));

        let response = app.send(get("/api/print/default-printer")).await;
        assert_eq!(json_body(response).await, json!({ "name": null }));
    }

    #[tokio::test]
    async fn upload_and_print_submits_a_completed_job() {
        let app = TestApp::new(CommandOutput::ok("request id is Office-12 (1 file(s))"));
        let body = multipart_body("memo.pdf", "application/pdf", b"%PDF-1.4", &[("printerName", "Office")]);
        let response = app
            .send(multipart_request("/api/print/upload-and-print", body))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["message"], "Print job submitted successfully");
        let job_id = json["jobId"].as_str().expect("job id").to_owned();
        assert!(job_id.starts_with("job_"));

        let response = app.send(get(&format!("/api/print/jobs/{job_id}"))).await;
        let job = json_body(response).await;
        assert_eq!(job["status"], "completed");
        assert_eq!(job["sourceInfo"]["ipAddress"], "192.168.1.77");
        assert_eq!(job["sourceInfo"]["userAgent"], "printdrop-tests");

        let calls = app.executor.calls();
        let lp = calls.iter().find(|c| c.program == "lp").expect("lp invoked");
        assert!(lp.args.windows(2).any(|w| w == ["-d", "Office"]));
    }

    #[tokio::test]
    async fn upload_and_print_rejects_unsupported_types() {
        let app = TestApp::new(CommandOutput::ok(""));
        let body = multipart_body("setup.exe", "application/x-msdownload", b"MZ", &[]);
        let response = app
            .send(multipart_request("/api/print/upload-and-print", body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.state.dispatcher.all_print_jobs().is_empty());
    }

    #[tokio::test]
    async fn upload_and_print_without_file_is_rejected() {
        let app = TestApp::new(CommandOutput::ok(""));
        let body = Body::from(format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"printerName\"\r\n\r\nOffice\r\n--{b}--\r\n",
            b = crate::routes::test_support::BOUNDARY
        ));
        let response = app
            .send(multipart_request("/api/print/upload-and-print", body))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "No file uploaded");
    }

    #[tokio::test]
    async fn print_failure_is_reported_and_recorded() {
        let app = TestApp::new(CommandOutput::failed(1, "lp: The printer or class does not exist."));
        let stored = app
            .state
            .uploads
            .save("a.pdf", "application/pdf", b"%PDF", None)
            .await
            .unwrap();

        let response = app
            .send(post_json(
                "/api/print/file",
                json!({ "filename": stored.filename, "printerName": "Ghost" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = json_body(response).await["message"].as_str().unwrap().to_owned();
        assert!(message.starts_with("Failed to print file: "), "{message}");
        assert!(message.contains("does not exist"), "{message}");

        let jobs = app.state.dispatcher.all_print_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn print_file_forwards_options() {
        let app = TestApp::new(CommandOutput::ok(""));
        let stored = app
            .state
            .uploads
            .save("a.pdf", "application/pdf", b"%PDF", None)
            .await
            .unwrap();

        let response = app
            .send(post_json(
                "/api/print/file",
                json!({
                    "filename": stored.filename,
                    "options": { "paperSize": "Letter", "duplex": "tumble", "copies": 2 }
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let calls = app.executor.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].args.iter().any(|a| a == "media=Letter"));
        assert!(calls[0].args.iter().any(|a| a == "sides=two-sided-short-edge"));
    }

    #[tokio::test]
    async fn excessive_copies_are_rejected_without_a_job() {
        let app = TestApp::new(CommandOutput::ok(""));
        let stored = app
            .state
            .uploads
            .save("a.pdf", "application/pdf", b"%PDF", None)
            .await
            .unwrap();

        let response = app
            .send(post_json(
                "/api/print/file",
                json!({ "filename": stored.filename, "options": { "copies": 4_000_000_000u32 } }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = json_body(response).await["message"].as_str().unwrap().to_owned();
        assert!(message.contains("copies must be at most"), "{message}");

        assert!(app.state.dispatcher.all_print_jobs().is_empty());
        assert!(app.executor.calls().is_empty());
        assert!(stored.path.exists());
    }

    #[tokio::test]
    async fn print_file_of_missing_upload_fails_job() {
        let app = TestApp::new(CommandOutput::ok(""));
        let response = app
            .send(post_json("/api/print/file", json!({ "filename": "file-1-2.pdf" })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            "Failed to print file: File not found"
        );

        let jobs = app.state.dispatcher.all_print_jobs();
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert_eq!(jobs[0].error.as_deref(), Some("File not found"));
        assert!(app.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn print_file_requires_a_plain_filename() {
        let app = TestApp::new(CommandOutput::ok(""));
        let response = app
            .send(post_json("/api/print/file", json!({ "printerName": "Office" })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Filename is required");

        let response = app
            .send(post_json("/api/print/file", json!({ "filename": "../../etc/passwd" })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.state.dispatcher.all_print_jobs().is_empty());
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let app = TestApp::new(CommandOutput::ok(""));
        let response = app.send(get("/api/print/jobs/job_0_missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["message"], "Print job not found");
    }

    #[tokio::test]
    async fn jobs_are_listed_newest_first() {
        let app = TestApp::new(CommandOutput::ok(""));
        for name in ["file-1-1.pdf", "file-1-2.pdf"] {
            app.send(post_json("/api/print/file", json!({ "filename": name })))
                .await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let jobs = json_body(app.send(get("/api/print/jobs")).await).await;
        let jobs = jobs.as_array().expect("array");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0]["filename"], "file-1-2.pdf");
        assert_eq!(jobs[1]["filename"], "file-1-1.pdf");
    }
}
