use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::caption::{CaptionModel, GenerationRequest};
use crate::models::lazy::ModelLoader;
use crate::models::media::PreparedImage;
use crate::utils::http::{summarize_error_body, truncate_for_log};
use crate::utils::timing::log_model_timing;

const BACKEND: &str = "huggingface";

/// Accepts both `[{"generated_text": ..}]` and `{"generated_text": ..}`.
fn parse_generated_text(value: &Value) -> Result<String> {
    if let Some(error) = value.get("error").and_then(|v| v.as_str()) {
        return Err(anyhow!("inference API error: {}", error));
    }
    let entry = match value {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| anyhow!("inference API returned an empty list"))?,
        other => other,
    };
    entry
        .get("generated_text")
        .and_then(|v| v.as_str())
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            anyhow!(
                "inference API response had no generated_text: {}",
                truncate_for_log(&value.to_string(), 300)
            )
        })
}

fn build_prompted_payload(image: &PreparedImage, request: &GenerationRequest) -> Value {
    let mut parameters = json!({
        "max_new_tokens": request.params.max_length,
        "num_beams": request.params.num_beams,
        "do_sample": request.params.do_sample,
    });
    if let Some(map) = parameters.as_object_mut() {
        if let Some(prompt) = request.prompt.as_deref() {
            map.insert("prompt".to_string(), json!(prompt));
        }
        if let Some(temperature) = request.params.temperature {
            map.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_k) = request.params.top_k {
            map.insert("top_k".to_string(), json!(top_k));
        }
        if let Some(top_p) = request.params.top_p {
            map.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(penalty) = request.params.repetition_penalty {
            map.insert("repetition_penalty".to_string(), json!(penalty));
        }
    }
    json!({
        "inputs": image.to_base64(),
        "parameters": parameters,
    })
}

/// Hosted inference endpoint for one model id.
pub struct HuggingFaceCaptionModel {
    client: Client,
    url: String,
    model: String,
    token: Option<String>,
    timeout: Duration,
}

impl HuggingFaceCaptionModel {
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn redact(&self, text: &str) -> String {
        match self.token.as_deref() {
            Some(token) => text.replace(token, "[redacted]"),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl CaptionModel for HuggingFaceCaptionModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, image: &PreparedImage, request: &GenerationRequest) -> Result<String> {
        let metadata = json!({
            "prompt": request.prompt.as_deref().map(|prompt| truncate_for_log(prompt, 80)),
            "image_bytes": image.bytes.len(),
        });

        log_model_timing(BACKEND, &self.model, request.operation(), Some(metadata), || async {
            let builder = self.client.post(&self.url).timeout(self.timeout);
            let builder = match request.prompt {
                None => builder
                    .header(CONTENT_TYPE, image.mime_type.as_str())
                    .body(image.bytes.clone()),
                Some(_) => builder.json(&build_prompted_payload(image, request)),
            };

            let response = self.authorize(builder).send().await.map_err(|err| {
                let err_text = self.redact(&err.to_string());
                warn!(
                    "Inference API request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                anyhow!("inference API request failed: {}", err_text)
            })?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                let (message, body_summary) = summarize_error_body(&body);
                warn!("Inference API error: status={}, body={}", status, body_summary);
                return Err(anyhow!(
                    "inference API request failed with status {}: {}",
                    status,
                    message.unwrap_or(body_summary)
                ));
            }

            let value: Value = serde_json::from_str(&body)
                .map_err(|err| anyhow!("inference API returned invalid JSON: {}", err))?;
            let text = parse_generated_text(&value)?;
            debug!(target: "models.huggingface", model = %self.model, output = %truncate_for_log(&text, 200));
            Ok(text)
        })
        .await
    }
}

/// Hosted models need no warm-up; loading only resolves the endpoint.
pub struct HuggingFaceLoader {
    pub client: Client,
    pub base_url: String,
    pub model: String,
    pub token: String,
    pub timeout: Duration,
}

#[async_trait]
impl ModelLoader for HuggingFaceLoader {
    fn label(&self) -> &str {
        &self.model
    }

    async fn load(&self) -> Result<Arc<dyn CaptionModel>> {
        let model = self.model.trim();
        if model.is_empty() {
            return Err(anyhow!("no inference model configured"));
        }
        let token = self.token.trim();
        if token.is_empty() {
            warn!(
                "HF_API_TOKEN is not set; requests to {} will be rate limited",
                model
            );
        }
        Ok(Arc::new(HuggingFaceCaptionModel {
            client: self.client.clone(),
            url: format!("{}/{}", self.base_url, model),
            model: model.to_string(),
            token: (!token.is_empty()).then(|| token.to_string()),
            timeout: self.timeout,
        }))
    }
}
