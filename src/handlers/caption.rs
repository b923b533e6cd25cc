use axum::extract::{Multipart, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::caption::engine::{CaptionMode, CaptionResponse};
use crate::handlers::upload::read_upload;
use crate::handlers::ApiError;
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

pub const REPORT_FILE_NAME: &str = "caption.txt";

#[derive(Debug, Default, Deserialize)]
pub struct CaptionQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

pub fn parse_format(value: Option<&str>) -> Result<ReportFormat, ApiError> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("json") => Ok(ReportFormat::Json),
        Some("text") | Some("txt") => Ok(ReportFormat::Text),
        Some(other) => Err(ApiError::BadRequest(format!(
            "unknown format '{other}' (expected 'json' or 'text')"
        ))),
    }
}

pub fn parse_mode(value: Option<&str>, default: CaptionMode) -> Result<CaptionMode, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse::<CaptionMode>()
            .map_err(|err| ApiError::BadRequest(err.to_string())),
    }
}

/// Detailed output is on unless the form explicitly turns it off.
pub fn parse_detailed(value: Option<&str>) -> Result<bool, ApiError> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") => Ok(true),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(ApiError::BadRequest(format!(
            "invalid value for 'detailed': {other}"
        ))),
    }
}

pub fn render_text_report(
    response: &CaptionResponse,
    file_name: Option<&str>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "Image Caption Report".to_string(),
        "====================".to_string(),
    ];
    if let Some(name) = file_name {
        lines.push(format!("File: {name}"));
    }
    lines.push(format!("Generated: {}", generated_at.to_rfc3339()));
    lines.push(format!("Mode: {}", response.mode));
    lines.push(format!("Confidence: {:.0}%", response.confidence * 100.0));
    if let Some(error) = &response.error {
        lines.push(format!("Error: {error}"));
    }
    lines.push(String::new());
    lines.push("Caption:".to_string());
    lines.push(response.caption.clone());
    if response.has_detailed {
        lines.push(String::new());
        lines.push("Detailed description:".to_string());
        lines.push(response.detailed_description.clone());
    }
    let mut report = lines.join("\n");
    report.push('\n');
    report
}

/// `POST /api/caption`
pub async fn caption_image(
    State(state): State<AppState>,
    Query(query): Query<CaptionQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let format = parse_format(query.format.as_deref())?;
    let upload = match read_upload(multipart, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(err) => {
            state.stats.lock().record_rejected_upload();
            return Err(err);
        }
    };
    let mode = parse_mode(upload.field("mode"), state.default_mode)?;
    let detailed = parse_detailed(upload.field("detailed"))?;

    let mut timer = start_request_timer("caption", upload.file_name.as_deref(), upload.bytes.len());
    info!(
        "Caption request: file={:?} type={} size={} mode={} detailed={}",
        upload.file_name,
        upload.mime_type,
        upload.bytes.len(),
        mode,
        detailed
    );

    let response = state
        .engine
        .generate_caption(&upload.bytes, mode, detailed)
        .await;
    state.stats.lock().record_caption(&response);
    match &response.error {
        Some(error) => complete_request_timer(&mut timer, "error", Some(error.clone())),
        None => complete_request_timer(&mut timer, "success", None),
    }

    Ok(match format {
        ReportFormat::Json => Json(response).into_response(),
        ReportFormat::Text => {
            let report = render_text_report(&response, upload.file_name.as_deref(), Utc::now());
            (
                [
                    (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
                    ),
                ],
                report,
            )
                .into_response()
        }
    })
}
