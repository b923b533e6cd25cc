use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::caption::engine::{CaptionEngine, CaptionMode, CaptionResponse};
use crate::models::ocr::OcrEngine;

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub started_at: DateTime<Utc>,
    pub caption_requests: u64,
    pub caption_failures: u64,
    pub local_requests: u64,
    pub cloud_requests: u64,
    pub ocr_requests: u64,
    pub ocr_failures: u64,
    pub rejected_uploads: u64,
}

impl ServiceStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        ServiceStats {
            started_at,
            caption_requests: 0,
            caption_failures: 0,
            local_requests: 0,
            cloud_requests: 0,
            ocr_requests: 0,
            ocr_failures: 0,
            rejected_uploads: 0,
        }
    }

    pub fn record_caption(&mut self, response: &CaptionResponse) {
        self.caption_requests += 1;
        match response.mode {
            CaptionMode::Local => self.local_requests += 1,
            CaptionMode::Cloud => self.cloud_requests += 1,
        }
        if response.is_error() {
            self.caption_failures += 1;
        }
    }

    pub fn record_ocr(&mut self, succeeded: bool) {
        self.ocr_requests += 1;
        if !succeeded {
            self.ocr_failures += 1;
        }
    }

    pub fn record_rejected_upload(&mut self) {
        self.rejected_uploads += 1;
    }

    pub fn uptime_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CaptionEngine>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
    pub stats: Arc<Mutex<ServiceStats>>,
    pub default_mode: CaptionMode,
    pub ocr_min_confidence: f32,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        engine: CaptionEngine,
        ocr: Option<Arc<dyn OcrEngine>>,
        default_mode: CaptionMode,
        ocr_min_confidence: f32,
        max_upload_bytes: usize,
    ) -> Self {
        AppState {
            engine: Arc::new(engine),
            ocr,
            stats: Arc::new(Mutex::new(ServiceStats::new(Utc::now()))),
            default_mode,
            ocr_min_confidence,
            max_upload_bytes,
        }
    }

    pub fn stats_snapshot(&self) -> ServiceStats {
        self.stats.lock().clone()
    }
}
