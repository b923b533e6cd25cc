use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::caption::aspect::Aspect;
use crate::models::media::PreparedImage;

/// Decoding settings forwarded to the captioning backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    pub num_beams: u32,
    pub do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_penalty: Option<f32>,
    pub early_stopping: bool,
}

impl GenerationParams {
    /// Short beam-searched caption.
    pub fn base_caption() -> Self {
        Self {
            max_length: 50,
            min_length: None,
            num_beams: 8,
            do_sample: false,
            temperature: None,
            top_k: None,
            top_p: None,
            repetition_penalty: None,
            length_penalty: Some(1.0),
            early_stopping: true,
        }
    }

    /// Sampled, longer answers for the per-aspect questions.
    pub fn aspect() -> Self {
        Self {
            max_length: 150,
            min_length: Some(10),
            num_beams: 8,
            do_sample: true,
            temperature: Some(0.9),
            top_k: Some(50),
            top_p: Some(0.95),
            repetition_penalty: Some(1.3),
            length_penalty: None,
            early_stopping: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: Option<String>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn unconditioned() -> Self {
        Self {
            prompt: None,
            params: GenerationParams::base_caption(),
        }
    }

    pub fn for_aspect(aspect: Aspect) -> Self {
        Self::prompted(aspect.prompt(), GenerationParams::aspect())
    }

    pub fn prompted(prompt: &str, params: GenerationParams) -> Self {
        Self {
            prompt: Some(prompt.to_string()),
            params,
        }
    }

    pub fn operation(&self) -> &'static str {
        if self.prompt.is_some() {
            "conditioned_caption"
        } else {
            "caption"
        }
    }
}

/// A pretrained image-to-text model. Calls are independent; implementations
/// hold no per-request state.
#[async_trait]
pub trait CaptionModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, image: &PreparedImage, request: &GenerationRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_request_carries_prompt_and_sampling() {
        let request = GenerationRequest::for_aspect(Aspect::Mood);
        assert_eq!(request.prompt.as_deref(), Some(Aspect::Mood.prompt()));
        assert!(request.params.do_sample);
        assert_eq!(request.operation(), "conditioned_caption");
    }

    #[test]
    fn base_params_skip_unset_fields() {
        let value = serde_json::to_value(GenerationParams::base_caption()).unwrap();
        assert_eq!(value["max_length"], 50);
        assert_eq!(value["num_beams"], 8);
        assert!(value.get("temperature").is_none());
        assert_eq!(GenerationRequest::unconditioned().operation(), "caption");
    }
}
