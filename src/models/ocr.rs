use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::models::media::PreparedImage;
use crate::utils::http::summarize_error_body;
use crate::utils::timing::log_model_timing;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
struct OcrResponseBody {
    #[serde(alias = "results")]
    lines: Vec<OcrLine>,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, image: &PreparedImage) -> Result<Vec<OcrLine>>;
}

pub struct HttpOcrEngine {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpOcrEngine {
    pub fn new(client: Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn extract(&self, image: &PreparedImage) -> Result<Vec<OcrLine>> {
        let payload = json!({
            "image": image.to_base64(),
            "mime_type": image.mime_type,
        });

        log_model_timing("ocr", &self.endpoint, "extract_text", None, || async {
            let response = self
                .client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await
                .map_err(|err| anyhow!("OCR request failed: {}", err))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let (message, body_summary) = summarize_error_body(&body);
                warn!("OCR engine error: status={}, body={}", status, body_summary);
                return Err(anyhow!(
                    "OCR request failed with status {}: {}",
                    status,
                    message.unwrap_or(body_summary)
                ));
            }

            let body = response.json::<OcrResponseBody>().await?;
            Ok(body.lines)
        })
        .await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrSummary {
    pub text: String,
    pub lines: Vec<OcrLine>,
    pub confidence: f32,
    pub line_count: usize,
}

/// Drops blank and low-confidence lines and averages what is left.
pub fn summarize_ocr(lines: Vec<OcrLine>, min_confidence: f32) -> OcrSummary {
    let lines: Vec<OcrLine> = lines
        .into_iter()
        .filter_map(|line| {
            let text = line.text.trim();
            if text.is_empty() || line.confidence < min_confidence {
                return None;
            }
            Some(OcrLine {
                text: text.to_string(),
                confidence: line.confidence,
            })
        })
        .collect();

    let confidence = if lines.is_empty() {
        0.0
    } else {
        lines.iter().map(|line| line.confidence).sum::<f32>() / lines.len() as f32
    };

    OcrSummary {
        text: lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        line_count: lines.len(),
        confidence,
        lines,
    }
}
