use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

use crate::caption::engine::CaptionMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub logs_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub default_caption_mode: CaptionMode,
    pub local_model_endpoint: String,
    pub local_model_name: String,
    pub hf_api_token: String,
    pub hf_inference_base_url: String,
    pub hf_caption_model: String,
    pub hf_detailed_model: String,
    pub enable_ocr: bool,
    pub ocr_endpoint: String,
    pub ocr_min_confidence: f32,
    pub model_request_timeout_seconds: u64,
    pub max_upload_bytes: usize,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn normalize_caption_mode(value: &str) -> CaptionMode {
    match value.parse::<CaptionMode>() {
        Ok(mode) => mode,
        Err(_) => {
            warn!(
                "Unknown DEFAULT_CAPTION_MODE value '{}'; defaulting to local.",
                value
            );
            CaptionMode::Local
        }
    }
}

fn normalize_endpoint(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let bind_addr_raw = env_string("BIND_ADDR", "0.0.0.0:8000");
        let bind_addr = bind_addr_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr_raw, err))?;

        let local_model_endpoint =
            normalize_endpoint(env_string("LOCAL_MODEL_ENDPOINT", "http://127.0.0.1:5000"));
        if local_model_endpoint.is_empty() {
            return Err(anyhow!("LOCAL_MODEL_ENDPOINT must not be empty"));
        }

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            logs_dir: PathBuf::from(env_string("LOGS_DIR", "logs")),
            bind_addr,
            default_caption_mode: normalize_caption_mode(&env_string(
                "DEFAULT_CAPTION_MODE",
                "local",
            )),
            local_model_endpoint,
            local_model_name: env_string(
                "LOCAL_MODEL_NAME",
                "Salesforce/blip-image-captioning-base",
            ),
            hf_api_token: env_string("HF_API_TOKEN", ""),
            hf_inference_base_url: normalize_endpoint(env_string(
                "HF_INFERENCE_BASE_URL",
                "https://api-inference.huggingface.co/models",
            )),
            hf_caption_model: env_string(
                "HF_CAPTION_MODEL",
                "Salesforce/blip-image-captioning-base",
            ),
            hf_detailed_model: env_string("HF_DETAILED_MODEL", "Salesforce/blip2-opt-2.7b"),
            enable_ocr: env_bool("ENABLE_OCR", true),
            ocr_endpoint: normalize_endpoint(env_string(
                "OCR_ENDPOINT",
                "http://127.0.0.1:5001/ocr",
            )),
            ocr_min_confidence: env_f32("OCR_MIN_CONFIDENCE", 0.0).clamp(0.0, 1.0),
            model_request_timeout_seconds: env_u64("MODEL_REQUEST_TIMEOUT_SECONDS", 120).max(1),
            max_upload_bytes: env_usize("MAX_UPLOAD_BYTES", 10 * 1024 * 1024).max(1024),
        })
    }
}
