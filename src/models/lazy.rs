use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::models::caption::CaptionModel;

/// Builds a model handle. Called at most once per successful load.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    fn label(&self) -> &str;

    async fn load(&self) -> Result<Arc<dyn CaptionModel>>;
}

/// Load-on-first-use model slot. Concurrent first callers wait on a single
/// load; a failed load is not cached and is retried by the next caller.
pub struct LazyModel {
    loader: Box<dyn ModelLoader>,
    cell: OnceCell<Arc<dyn CaptionModel>>,
}

impl LazyModel {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    pub fn label(&self) -> &str {
        self.loader.label()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<dyn CaptionModel>> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                info!("Loading {} model...", self.label());
                let started = Instant::now();
                match self.loader.load().await {
                    Ok(model) => {
                        info!(
                            "{} model loaded in {:.2}s",
                            self.label(),
                            started.elapsed().as_secs_f64()
                        );
                        Ok(model)
                    }
                    Err(err) => {
                        warn!("{} model failed to load: {err}", self.label());
                        Err(err)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(model))
    }
}
