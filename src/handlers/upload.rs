use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

use crate::handlers::ApiError;
use crate::models::media::detect_mime_type;

pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub fields: HashMap<String, String>,
}

impl Upload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Checks size and sniffs the MIME type; only images get through.
pub fn validate_image(bytes: &[u8], max_bytes: usize) -> Result<String, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge { limit: max_bytes });
    }
    match detect_mime_type(bytes) {
        Some(mime_type) if mime_type.starts_with("image/") => Ok(mime_type),
        Some(other) => Err(ApiError::BadRequest(format!(
            "unsupported file type: {other}"
        ))),
        None => Err(ApiError::BadRequest(
            "unsupported file type: unknown".to_string(),
        )),
    }
}

/// Reads the `file` part plus any plain text fields from a multipart form.
pub async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, ApiError> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| multipart_error(err, max_bytes))?;
            file = Some((file_name, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| multipart_error(err, max_bytes))?;
            debug!("multipart field {}={}", name, value);
            fields.insert(name, value);
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| {
        ApiError::BadRequest(format!("missing multipart field '{FILE_FIELD}'"))
    })?;
    let mime_type = validate_image(&bytes, max_bytes)?;

    Ok(Upload {
        file_name,
        bytes,
        mime_type,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::sample_png;

    #[test]
    fn accepts_images_within_limit() {
        let png = sample_png(2, 2);
        assert_eq!(validate_image(&png, 1 << 20).unwrap(), "image/png");
    }

    #[test]
    fn rejects_empty_oversized_and_non_images() {
        assert!(matches!(
            validate_image(&[], 100),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            validate_image(&sample_png(2, 2), 8),
            Err(ApiError::PayloadTooLarge { limit: 8 })
        ));
        let pdf = validate_image(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj", 1 << 20).unwrap_err();
        assert_eq!(pdf.to_string(), "unsupported file type: application/pdf");
        assert!(validate_image(b"plain words", 1 << 20).is_err());
    }
}
