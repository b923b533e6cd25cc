use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::caption::aspect::{Aspect, AspectMap};
use crate::caption::assemble::build_description;
use crate::caption::enhance::enhance_caption;
use crate::caption::normalize::clean_description;
use crate::caption::polish::polish;
use crate::config::Config;
use crate::models::caption::{CaptionModel, GenerationParams, GenerationRequest};
use crate::models::huggingface::HuggingFaceLoader;
use crate::models::lazy::LazyModel;
use crate::models::local::LocalModelLoader;
use crate::models::media::{prepare_image, ImageLoadError, PreparedImage};

pub const LOCAL_CONFIDENCE: f32 = 0.90;
pub const CLOUD_CONFIDENCE: f32 = 0.92;
pub const DETAILED_CLOUD_PROMPT: &str =
    "Describe this image in detail, including people, objects, actions, background, and setting:";

const ERROR_CAPTION: &str = "Error generating caption";
const ERROR_DESCRIPTION: &str = "Error generating description";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    #[default]
    Local,
    Cloud,
}

impl CaptionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptionMode::Local => "local",
            CaptionMode::Cloud => "cloud",
        }
    }
}

impl fmt::Display for CaptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown caption mode '{0}' (expected 'local' or 'cloud')")]
pub struct ParseModeError(pub String);

impl FromStr for CaptionMode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(CaptionMode::Local),
            "cloud" => Ok(CaptionMode::Cloud),
            _ => Err(ParseModeError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionResponse {
    pub caption: String,
    pub detailed_description: String,
    pub confidence: f32,
    pub mode: CaptionMode,
    pub has_detailed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptionResponse {
    pub fn failure(mode: CaptionMode, err: &dyn fmt::Display) -> Self {
        Self {
            caption: ERROR_CAPTION.to_string(),
            detailed_description: ERROR_DESCRIPTION.to_string(),
            confidence: 0.0,
            mode,
            has_detailed: false,
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error(transparent)]
    Image(#[from] ImageLoadError),
    #[error("{model} model failed to load: {source}")]
    ModelLoad {
        model: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("base caption generation failed: {0}")]
    BaseCaption(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelState {
    pub mode: CaptionMode,
    pub role: &'static str,
    pub model: String,
    pub loaded: bool,
}

/// Asks every aspect question in turn. A failed or empty answer just leaves
/// that aspect out.
pub async fn collect_aspects(model: &dyn CaptionModel, image: &PreparedImage) -> AspectMap {
    let mut aspects = AspectMap::new();
    for aspect in Aspect::ALL {
        let prompt = aspect.prompt();
        let raw = match model
            .generate(image, &GenerationRequest::for_aspect(aspect))
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Prompt '{}' failed: {err}", aspect);
                continue;
            }
        };
        let cleaned = clean_description(&raw, prompt);
        if !aspects.insert(aspect, cleaned) {
            debug!("Prompt '{}' produced no usable text", aspect);
        }
    }
    info!(
        "Collected {}/{} aspects from {}: [{}]",
        aspects.len(),
        Aspect::ALL.len(),
        model.name(),
        aspects
            .iter()
            .map(|(aspect, _)| aspect.label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    aspects
}

/// Captioning front door. Owns one lazily loaded model slot per role.
pub struct CaptionEngine {
    local: LazyModel,
    cloud: LazyModel,
    cloud_detailed: LazyModel,
}

impl CaptionEngine {
    pub fn new(local: LazyModel, cloud: LazyModel, cloud_detailed: LazyModel) -> Self {
        Self {
            local,
            cloud,
            cloud_detailed,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        let timeout = Duration::from_secs(config.model_request_timeout_seconds);
        let local = LazyModel::new(LocalModelLoader {
            client: client.clone(),
            endpoint: config.local_model_endpoint.clone(),
            model_name: config.local_model_name.clone(),
            timeout,
        });
        let hub = |model: &str| HuggingFaceLoader {
            client: client.clone(),
            base_url: config.hf_inference_base_url.clone(),
            model: model.to_string(),
            token: config.hf_api_token.clone(),
            timeout,
        };
        Self::new(
            local,
            LazyModel::new(hub(&config.hf_caption_model)),
            LazyModel::new(hub(&config.hf_detailed_model)),
        )
    }

    pub fn model_states(&self) -> Vec<ModelState> {
        [
            (CaptionMode::Local, "caption", &self.local),
            (CaptionMode::Cloud, "caption", &self.cloud),
            (CaptionMode::Cloud, "detailed", &self.cloud_detailed),
        ]
        .into_iter()
        .map(|(mode, role, slot)| ModelState {
            mode,
            role,
            model: slot.label().to_string(),
            loaded: slot.is_loaded(),
        })
        .collect()
    }

    /// Never fails: image or base-caption failures become an error payload.
    pub async fn generate_caption(
        &self,
        image_bytes: &[u8],
        mode: CaptionMode,
        detailed: bool,
    ) -> CaptionResponse {
        match self.try_generate(image_bytes, mode, detailed).await {
            Ok(response) => response,
            Err(err) => {
                error!("Caption error ({mode}): {err}");
                CaptionResponse::failure(mode, &err)
            }
        }
    }

    async fn try_generate(
        &self,
        image_bytes: &[u8],
        mode: CaptionMode,
        detailed: bool,
    ) -> Result<CaptionResponse, CaptionError> {
        let image = prepare_image(image_bytes)?;
        debug!(
            "Prepared {}x{} image ({} bytes as {})",
            image.width,
            image.height,
            image.bytes.len(),
            image.mime_type
        );
        match mode {
            CaptionMode::Local => self.generate_local(&image, detailed).await,
            CaptionMode::Cloud => self.generate_cloud(&image, detailed).await,
        }
    }

    async fn base_caption(
        slot: &LazyModel,
        image: &PreparedImage,
    ) -> Result<(Arc<dyn CaptionModel>, String), CaptionError> {
        let model = slot.get().await.map_err(|source| CaptionError::ModelLoad {
            model: slot.label().to_string(),
            source,
        })?;
        let caption = model
            .generate(image, &GenerationRequest::unconditioned())
            .await
            .map_err(CaptionError::BaseCaption)?;
        Ok((model, caption.trim().to_string()))
    }

    async fn generate_local(
        &self,
        image: &PreparedImage,
        detailed: bool,
    ) -> Result<CaptionResponse, CaptionError> {
        let (model, caption) = Self::base_caption(&self.local, image).await?;

        let detailed_description = if detailed {
            let aspects = collect_aspects(model.as_ref(), image).await;
            build_description(&aspects, &caption)
        } else {
            caption.clone()
        };

        Ok(CaptionResponse {
            caption,
            detailed_description,
            confidence: LOCAL_CONFIDENCE,
            mode: CaptionMode::Local,
            has_detailed: detailed,
            error: None,
        })
    }

    async fn generate_cloud(
        &self,
        image: &PreparedImage,
        detailed: bool,
    ) -> Result<CaptionResponse, CaptionError> {
        let (_, caption) = Self::base_caption(&self.cloud, image).await?;

        let detailed_description = if detailed {
            self.describe_cloud(image, &caption).await
        } else {
            caption.clone()
        };

        Ok(CaptionResponse {
            caption,
            detailed_description,
            confidence: CLOUD_CONFIDENCE,
            mode: CaptionMode::Cloud,
            has_detailed: detailed,
            error: None,
        })
    }

    async fn describe_cloud(&self, image: &PreparedImage, caption: &str) -> String {
        let model = match self.cloud_detailed.get().await {
            Ok(model) => model,
            Err(err) => {
                warn!("Detailed cloud model unavailable: {err}");
                return enhance_caption(caption);
            }
        };

        let request = GenerationRequest::prompted(DETAILED_CLOUD_PROMPT, GenerationParams::aspect());
        match model.generate(image, &request).await {
            Ok(raw) => {
                let description = polish(&clean_description(&raw, DETAILED_CLOUD_PROMPT));
                if description.is_empty() {
                    enhance_caption(caption)
                } else {
                    description
                }
            }
            Err(err) => {
                warn!("Detailed cloud description failed: {err}");
                enhance_caption(caption)
            }
        }
    }
}
