use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::caption::{CaptionModel, GenerationRequest};
use crate::models::lazy::ModelLoader;
use crate::models::media::PreparedImage;
use crate::utils::http::{summarize_error_body, truncate_for_log};
use crate::utils::timing::log_model_timing;

const BACKEND: &str = "local";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generated_text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    device: Option<String>,
}

fn extract_generated_text(response: GenerateResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(anyhow!("local model error: {}", error));
    }
    response
        .generated_text
        .map(|text| text.trim().to_string())
        .ok_or_else(|| anyhow!("local model response had no generated_text"))
}

fn build_payload(image: &PreparedImage, request: &GenerationRequest) -> Value {
    json!({
        "image": image.to_base64(),
        "mime_type": image.mime_type,
        "prompt": request.prompt,
        "parameters": request.params,
    })
}

/// Client for a self-hosted captioning server exposing `/health` and
/// `/generate`.
pub struct LocalCaptionModel {
    client: Client,
    endpoint: String,
    model_name: String,
    timeout: Duration,
}

#[async_trait]
impl CaptionModel for LocalCaptionModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, image: &PreparedImage, request: &GenerationRequest) -> Result<String> {
        let payload = build_payload(image, request);
        let url = format!("{}/generate", self.endpoint);
        let metadata = json!({
            "prompt": request.prompt.as_deref().map(|prompt| truncate_for_log(prompt, 80)),
            "image_bytes": image.bytes.len(),
        });

        log_model_timing(
            BACKEND,
            &self.model_name,
            request.operation(),
            Some(metadata),
            || async {
                let response = self
                    .client
                    .post(&url)
                    .timeout(self.timeout)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|err| {
                        warn!(
                            "Local model request failed to send: {} (timeout={}, connect={})",
                            err,
                            err.is_timeout(),
                            err.is_connect()
                        );
                        anyhow!("local model request failed: {}", err)
                    })?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let (message, body_summary) = summarize_error_body(&body);
                    warn!("Local model error: status={}, body={}", status, body_summary);
                    return Err(anyhow!(
                        "local model request failed with status {}: {}",
                        status,
                        message.unwrap_or(body_summary)
                    ));
                }

                let body = response.json::<GenerateResponse>().await?;
                let text = extract_generated_text(body)?;
                debug!(target: "models.local", output = %truncate_for_log(&text, 200));
                Ok(text)
            },
        )
        .await
    }
}

/// Probes the inference server once and hands out a [`LocalCaptionModel`].
pub struct LocalModelLoader {
    pub client: Client,
    pub endpoint: String,
    pub model_name: String,
    pub timeout: Duration,
}

#[async_trait]
impl ModelLoader for LocalModelLoader {
    fn label(&self) -> &str {
        &self.model_name
    }

    async fn load(&self) -> Result<Arc<dyn CaptionModel>> {
        let url = format!("{}/health", self.endpoint);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| anyhow!("local model server unreachable at {}: {}", url, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            return Err(anyhow!(
                "local model server not ready (status {}): {}",
                status,
                message.unwrap_or(body_summary)
            ));
        }

        let health = response
            .json::<HealthResponse>()
            .await
            .unwrap_or(HealthResponse {
                model: None,
                device: None,
            });
        if let Some(served) = health.model.as_deref() {
            if served != self.model_name {
                warn!(
                    "Local server reports model '{}' but '{}' is configured",
                    served, self.model_name
                );
            }
        }
        info!(
            "Local captioning server ready at {} (device: {})",
            self.endpoint,
            health.device.as_deref().unwrap_or("unknown")
        );

        Ok(Arc::new(LocalCaptionModel {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model_name: self.model_name.clone(),
            timeout: self.timeout,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::aspect::Aspect;

    fn image() -> PreparedImage {
        PreparedImage {
            bytes: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn payload_carries_prompt_and_parameters() {
        let payload = build_payload(&image(), &GenerationRequest::for_aspect(Aspect::Setting));
        assert_eq!(payload["image"], "AQID");
        assert_eq!(payload["prompt"], Aspect::Setting.prompt());
        assert_eq!(payload["parameters"]["max_length"], 150);
        assert_eq!(payload["parameters"]["top_k"], 50);

        let payload = build_payload(&image(), &GenerationRequest::unconditioned());
        assert!(payload["prompt"].is_null());
    }

    #[test]
    fn generated_text_is_trimmed_and_errors_surface() {
        let ok = extract_generated_text(GenerateResponse {
            generated_text: Some("  a cat on a mat \n".to_string()),
            error: None,
        });
        assert_eq!(ok.unwrap(), "a cat on a mat");

        let err = extract_generated_text(GenerateResponse {
            generated_text: None,
            error: Some("CUDA out of memory".to_string()),
        });
        assert!(err.unwrap_err().to_string().contains("CUDA out of memory"));

        assert!(extract_generated_text(GenerateResponse {
            generated_text: None,
            error: None,
        })
        .is_err());
    }
}
