use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use dotenvy::dotenv;
use tracing::{info, warn};

mod caption;
mod cli;
mod config;
mod handlers;
mod models;
mod server;
mod state;
mod utils;

use caption::engine::CaptionEngine;
use cli::{parse_caption_args, run_caption_once};
use config::CONFIG;
use models::ocr::{HttpOcrEngine, OcrEngine};
use state::AppState;
use utils::http::get_http_client;
use utils::logging::init_logging;

fn build_ocr_engine() -> Option<Arc<dyn OcrEngine>> {
    if !CONFIG.enable_ocr {
        info!("Text extraction disabled");
        return None;
    }
    if CONFIG.ocr_endpoint.is_empty() {
        warn!("ENABLE_OCR is set but OCR_ENDPOINT is empty; text extraction disabled");
        return None;
    }
    Some(Arc::new(HttpOcrEngine::new(
        get_http_client().clone(),
        CONFIG.ocr_endpoint.clone(),
        Duration::from_secs(CONFIG.model_request_timeout_seconds),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let engine = CaptionEngine::from_config(&CONFIG, get_http_client().clone());

    let args: Vec<String> = std::env::args().collect();
    if let Some(caption_args) = parse_caption_args(&args)? {
        let response =
            run_caption_once(&engine, &caption_args, CONFIG.default_caption_mode).await?;
        if let Some(error) = response.error {
            return Err(anyhow!("Captioning failed: {error}"));
        }
        return Ok(());
    }

    info!(
        "Starting image insight service (default mode: {}, local endpoint: {})",
        CONFIG.default_caption_mode, CONFIG.local_model_endpoint
    );
    let state = AppState::new(
        engine,
        build_ocr_engine(),
        CONFIG.default_caption_mode,
        CONFIG.ocr_min_confidence,
        CONFIG.max_upload_bytes,
    );
    server::serve(CONFIG.bind_addr, state).await
}
