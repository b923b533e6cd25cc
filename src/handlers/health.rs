use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::caption::engine::{CaptionMode, ModelState};
use crate::state::{AppState, ServiceStats};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub default_mode: CaptionMode,
    pub ocr_enabled: bool,
    pub uptime_seconds: i64,
    pub models: Vec<ModelState>,
    pub stats: ServiceStats,
    pub timestamp: DateTime<Utc>,
}

pub fn build_health_report(state: &AppState, now: DateTime<Utc>) -> HealthReport {
    let stats = state.stats_snapshot();
    HealthReport {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        default_mode: state.default_mode,
        ocr_enabled: state.ocr.is_some(),
        uptime_seconds: stats.uptime_seconds(now),
        models: state.engine.model_states(),
        stats,
        timestamp: now,
    }
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(build_health_report(&state, Utc::now()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::caption::engine::CaptionEngine;
    use crate::models::caption::CaptionModel;
    use crate::models::lazy::{LazyModel, ModelLoader};

    struct OfflineLoader(&'static str);

    #[async_trait]
    impl ModelLoader for OfflineLoader {
        fn label(&self) -> &str {
            self.0
        }

        async fn load(&self) -> Result<Arc<dyn CaptionModel>> {
            Err(anyhow!("offline"))
        }
    }

    #[test]
    fn reports_models_and_counters() {
        let engine = CaptionEngine::new(
            LazyModel::new(OfflineLoader("blip-base")),
            LazyModel::new(OfflineLoader("blip-hub")),
            LazyModel::new(OfflineLoader("blip2")),
        );
        let state = AppState::new(engine, None, CaptionMode::Cloud, 0.5, 1024);
        state.stats.lock().record_rejected_upload();

        let report = build_health_report(&state, Utc::now());
        assert_eq!(report.status, "ok");
        assert!(!report.ocr_enabled);
        assert_eq!(report.default_mode, CaptionMode::Cloud);
        assert_eq!(report.stats.rejected_uploads, 1);
        let labels: Vec<(&str, &str)> = report
            .models
            .iter()
            .map(|model| (model.role, model.model.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("caption", "blip-base"), ("caption", "blip-hub"), ("detailed", "blip2")]
        );
        assert!(report.models.iter().all(|model| !model.loaded));
    }
}
