use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{info, warn};

use crate::handlers::upload::read_upload;
use crate::handlers::ApiError;
use crate::models::media::prepare_image;
use crate::models::ocr::{summarize_ocr, OcrSummary};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

/// `POST /api/ocr`
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrSummary>, ApiError> {
    let Some(engine) = state.ocr.clone() else {
        return Err(ApiError::Unavailable(
            "text extraction is disabled (set ENABLE_OCR=true)".to_string(),
        ));
    };

    let upload = match read_upload(multipart, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(err) => {
            state.stats.lock().record_rejected_upload();
            return Err(err);
        }
    };
    let mut timer = start_request_timer("ocr", upload.file_name.as_deref(), upload.bytes.len());

    let image = match prepare_image(&upload.bytes) {
        Ok(image) => image,
        Err(err) => {
            state.stats.lock().record_rejected_upload();
            complete_request_timer(&mut timer, "error", Some(err.to_string()));
            return Err(ApiError::BadRequest(err.to_string()));
        }
    };

    match engine.extract(&image).await {
        Ok(lines) => {
            let summary = summarize_ocr(lines, state.ocr_min_confidence);
            info!(
                "OCR via {} kept {} lines (confidence {:.2})",
                engine.name(),
                summary.line_count,
                summary.confidence
            );
            state.stats.lock().record_ocr(true);
            complete_request_timer(&mut timer, "success", None);
            Ok(Json(summary))
        }
        Err(err) => {
            warn!("OCR failed: {err}");
            state.stats.lock().record_ocr(false);
            complete_request_timer(&mut timer, "error", Some(err.to_string()));
            Err(ApiError::Upstream(format!("text extraction failed: {err}")))
        }
    }
}
