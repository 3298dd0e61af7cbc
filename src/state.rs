//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::Result;
use crate::extraction::CodeExtractor;
use crate::images::{ImageRegistry, ImageStore};
use crate::pipeline::{BatchPipeline, RunProgress};
use crate::settings::{SettingsStore, API_KEY_SETTING};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    registry: ImageRegistry,
    pipeline: BatchPipeline,
    progress: RunProgress,
}

impl AppState {
    /// Create a new application state
    ///
    /// The extractor is injected so tests can run the whole surface against
    /// a scripted one.
    pub fn new(config: Config, db: SqlitePool, extractor: Arc<dyn CodeExtractor>) -> Self {
        let registry = ImageRegistry::new();
        let pipeline = BatchPipeline::new(registry.clone(), db.clone(), extractor);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                registry,
                pipeline,
                progress: RunProgress::new(),
            }),
        }
    }

    /// Rebuild the in-memory registry from the durable store
    ///
    /// Returns how many records were restored.
    pub async fn restore(&self) -> Result<usize> {
        let store = ImageStore::new(self.db());
        let records = store.get_all().await?;
        let count = records.len();
        self.inner.registry.replace_all(records).await;
        Ok(count)
    }

    /// Resolve the effective extraction credential
    ///
    /// A key stored through the settings endpoint wins over the environment
    /// fallback; the empty string means "not configured" and makes the
    /// pipeline fail its precondition.
    pub async fn resolve_credential(&self) -> Result<String> {
        let settings = SettingsStore::new(self.db());
        let stored = settings
            .load(API_KEY_SETTING)
            .await?
            .filter(|key| !key.trim().is_empty());

        Ok(stored
            .or_else(|| self.inner.config.extraction.api_key.clone())
            .unwrap_or_default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the image registry
    pub fn registry(&self) -> &ImageRegistry {
        &self.inner.registry
    }

    /// Get the batch pipeline
    pub fn pipeline(&self) -> &BatchPipeline {
        &self.inner.pipeline
    }

    /// Get the shared run progress
    pub fn progress(&self) -> &RunProgress {
        &self.inner.progress
    }
}
