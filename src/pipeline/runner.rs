//! Batch runner
//!
//! One run processes at most [`BATCH_SIZE`] pending records, strictly
//! sequentially and in ingestion order. Item failures are captured into the
//! record itself and never abort the batch; only the missing-credential
//! precondition escapes to the caller.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::extraction::CodeExtractor;
use crate::images::{CodeOutcome, ImageRegistry, ImageStore};

use super::events::{BatchEvent, BatchSummary, ProgressSink};

/// Maximum number of records attempted per run
pub const BATCH_SIZE: usize = 50;

/// Message stored when a failure carries no text of its own
const UNKNOWN_ERROR: &str = "Error desconocido";

/// Pipeline-level failures
///
/// Per-item extraction failures are not here: they are captured into the
/// record's `error` status and never propagate out of a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Falta la clave de API. Por favor, configúrala.")]
    MissingCredential,
}

/// How a run invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A batch was processed to completion.
    Completed(BatchSummary),
    /// Another run was already in flight; nothing was done.
    Busy,
    /// No pending records; nothing was done.
    Empty,
}

/// The batch extraction pipeline
#[derive(Clone)]
pub struct BatchPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    registry: ImageRegistry,
    db: SqlitePool,
    extractor: Arc<dyn CodeExtractor>,
    /// At-most-one-run guard; `try_lock` makes a concurrent invocation a
    /// no-op instead of queueing behind the active run.
    run_lock: tokio::sync::Mutex<()>,
}

impl BatchPipeline {
    pub fn new(registry: ImageRegistry, db: SqlitePool, extractor: Arc<dyn CodeExtractor>) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                registry,
                db,
                extractor,
                run_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Run one batch
    ///
    /// Publishes per-item events through `sink` in batch order. Changed
    /// records are persisted at end-of-batch, before the run reports
    /// completion; a persist failure after the in-memory transition leaves
    /// the store stale until the next successful write (accepted gap).
    pub async fn run(
        &self,
        credential: &str,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome, PipelineError> {
        if credential.trim().is_empty() {
            return Err(PipelineError::MissingCredential);
        }

        let Ok(_guard) = self.inner.run_lock.try_lock() else {
            tracing::debug!("batch run requested while another run is in flight");
            return Ok(RunOutcome::Busy);
        };

        let batch = self.inner.registry.pending_batch(BATCH_SIZE).await;
        if batch.is_empty() {
            return Ok(RunOutcome::Empty);
        }

        let total = batch.len();
        tracing::info!(batch_size = total, "starting batch run");
        sink.on_event(&BatchEvent::Started { total });

        let store = ImageStore::new(&self.inner.db);
        let mut changed = Vec::with_capacity(total);
        let mut succeeded = 0;
        let mut failed = 0;

        for (index, id) in batch.iter().copied().enumerate() {
            // Publish `processing` before the extraction call resolves. The
            // record can only be gone if everything was cleared mid-run.
            let Some(record) = self.inner.registry.mark_processing(id).await else {
                tracing::warn!(image_id = %id, "batch record vanished before processing");
                continue;
            };
            sink.on_event(&BatchEvent::ItemStarted { id, index, total });

            let outcome = match store.get_bytes(id).await {
                Ok(Some(bytes)) => {
                    match self
                        .inner
                        .extractor
                        .extract(&bytes, &record.mime_type, credential)
                        .await
                    {
                        Ok(text) => {
                            let text = text.trim();
                            if text.is_empty() {
                                CodeOutcome::NotFound
                            } else {
                                CodeOutcome::Found(text.to_string())
                            }
                        }
                        Err(e) => {
                            let message = e.to_string();
                            CodeOutcome::Failed(if message.is_empty() {
                                UNKNOWN_ERROR.to_string()
                            } else {
                                message
                            })
                        }
                    }
                }
                Ok(None) => CodeOutcome::Failed(UNKNOWN_ERROR.to_string()),
                Err(e) => CodeOutcome::Failed(e.to_string()),
            };

            match outcome {
                CodeOutcome::Failed(_) => failed += 1,
                _ => succeeded += 1,
            }

            if let Some(updated) = self.inner.registry.apply_outcome(id, &outcome).await {
                changed.push(updated);
            }
            sink.on_event(&BatchEvent::ItemFinished {
                id,
                index,
                total,
                outcome,
            });
        }

        // End-of-batch reconciliation into the durable store.
        for record in &changed {
            if let Err(e) = store.update_result(record).await {
                tracing::warn!(
                    image_id = %record.id,
                    error = %e,
                    "failed to persist extraction result; store is stale until the next successful write"
                );
            }
        }

        let summary = BatchSummary {
            attempted: total,
            succeeded,
            failed,
        };
        sink.on_event(&BatchEvent::Finished { summary });
        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch run complete"
        );

        Ok(RunOutcome::Completed(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use uuid::Uuid;

    use crate::db::initialize_schema;
    use crate::extraction::{ExtractionError, MockExtractor};
    use crate::images::{ImageRecord, ProcessingStatus, NOT_FOUND_CODE};
    use crate::pipeline::NullSink;

    /// Sink that records every event for ordering assertions
    #[derive(Default)]
    struct VecSink(Mutex<Vec<BatchEvent>>);

    impl VecSink {
        fn events(&self) -> Vec<BatchEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ProgressSink for VecSink {
        fn on_event(&self, event: &BatchEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    async fn setup(extractor: Arc<MockExtractor>) -> (BatchPipeline, ImageRegistry, SqlitePool) {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        initialize_schema(&pool).await.unwrap();
        let registry = ImageRegistry::new();
        let pipeline = BatchPipeline::new(registry.clone(), pool.clone(), extractor);
        (pipeline, registry, pool)
    }

    async fn ingest(registry: &ImageRegistry, pool: &SqlitePool, count: usize) -> Vec<Uuid> {
        let store = ImageStore::new(pool);
        let mut ids = Vec::new();
        for i in 0..count {
            let record = ImageRecord::new(format!("poste_{}.jpg", i), "image/jpeg");
            ids.push(record.id);
            store.insert(&record, b"jpeg bytes").await.unwrap();
            registry.insert(record).await;
        }
        ids
    }

    #[tokio::test]
    async fn missing_credential_mutates_nothing() {
        let extractor = Arc::new(MockExtractor::returning("08390"));
        let (pipeline, registry, pool) = setup(extractor.clone()).await;
        ingest(&registry, &pool, 3).await;

        let result = pipeline.run("", &NullSink).await;
        assert!(matches!(result, Err(PipelineError::MissingCredential)));

        let result = pipeline.run("   ", &NullSink).await;
        assert!(matches!(result, Err(PipelineError::MissingCredential)));

        assert_eq!(extractor.calls(), 0);
        let counts = registry.counts().await;
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.processed(), 0);
    }

    #[tokio::test]
    async fn empty_pending_set_is_a_noop() {
        let extractor = Arc::new(MockExtractor::returning("08390"));
        let (pipeline, _registry, _pool) = setup(extractor.clone()).await;

        let outcome = pipeline.run("key", &NullSink).await.unwrap();
        assert_eq!(outcome, RunOutcome::Empty);
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn batch_is_bounded_and_resumable() {
        let extractor = Arc::new(MockExtractor::returning("08390"));
        let (pipeline, registry, pool) = setup(extractor).await;
        ingest(&registry, &pool, 60).await;

        let outcome = pipeline.run("key", &NullSink).await.unwrap();
        let RunOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run, got {:?}", outcome);
        };
        assert_eq!(summary.attempted, 50);
        assert_eq!(summary.succeeded, 50);

        let counts = registry.counts().await;
        assert_eq!(counts.pending, 10);
        assert_eq!(counts.success, 50);

        // The next run drains the remainder.
        let outcome = pipeline.run("key", &NullSink).await.unwrap();
        let RunOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run, got {:?}", outcome);
        };
        assert_eq!(summary.attempted, 10);
        assert_eq!(registry.counts().await.pending, 0);
    }

    #[tokio::test]
    async fn events_follow_ingestion_order() {
        let extractor = Arc::new(MockExtractor::returning("08390"));
        let (pipeline, registry, pool) = setup(extractor).await;
        let ids = ingest(&registry, &pool, 5).await;

        let sink = VecSink::default();
        pipeline.run("key", &sink).await.unwrap();

        let started: Vec<Uuid> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                BatchEvent::ItemStarted { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(started, ids);

        // Each item finishes before the next one starts.
        let mut last_finished = None;
        for event in sink.events() {
            match event {
                BatchEvent::ItemStarted { index, .. } => {
                    assert_eq!(index, last_finished.map_or(0, |i: usize| i + 1));
                }
                BatchEvent::ItemFinished { index, .. } => last_finished = Some(index),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn item_failure_does_not_abort_the_batch() {
        let extractor = Arc::new(MockExtractor::with_script(vec![
            Ok("123".to_string()),
            Err(ExtractionError::Api("se cayó la red".to_string())),
            Ok("456".to_string()),
        ]));
        let (pipeline, registry, pool) = setup(extractor).await;
        let ids = ingest(&registry, &pool, 3).await;

        let outcome = pipeline.run("key", &NullSink).await.unwrap();
        let RunOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run, got {:?}", outcome);
        };
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let failed = registry.get(ids[1]).await.unwrap();
        assert_eq!(failed.status, ProcessingStatus::Error);
        let message = failed.extracted_code.unwrap();
        assert!(message.contains("se cayó la red"), "got: {}", message);

        let last = registry.get(ids[2]).await.unwrap();
        assert_eq!(last.status, ProcessingStatus::Success);
        assert_eq!(last.extracted_code.as_deref(), Some("456"));
    }

    #[tokio::test]
    async fn whitespace_answer_becomes_not_found() {
        let extractor = Arc::new(MockExtractor::with_script(vec![Ok("   ".to_string())]));
        let (pipeline, registry, pool) = setup(extractor).await;
        let ids = ingest(&registry, &pool, 1).await;

        pipeline.run("key", &NullSink).await.unwrap();

        let record = registry.get(ids[0]).await.unwrap();
        assert_eq!(record.status, ProcessingStatus::Success);
        assert_eq!(record.extracted_code.as_deref(), Some(NOT_FOUND_CODE));
        assert!(!record.found);
    }

    #[tokio::test]
    async fn results_are_persisted_at_end_of_batch() {
        let extractor = Arc::new(MockExtractor::with_script(vec![
            Ok("08390".to_string()),
            Err(ExtractionError::InvalidCredential),
        ]));
        let (pipeline, registry, pool) = setup(extractor).await;
        ingest(&registry, &pool, 2).await;

        pipeline.run("key", &NullSink).await.unwrap();

        let store = ImageStore::new(&pool);
        let persisted = store.get_all().await.unwrap();
        assert_eq!(persisted[0].status, ProcessingStatus::Success);
        assert_eq!(persisted[0].extracted_code.as_deref(), Some("08390"));
        assert!(persisted[0].found);
        assert_eq!(persisted[1].status, ProcessingStatus::Error);
        assert_eq!(
            persisted[1].extracted_code.as_deref(),
            Some("La clave de API no es válida. Por favor, revísala.")
        );
    }

    #[tokio::test]
    async fn concurrent_run_is_a_noop() {
        let extractor =
            Arc::new(MockExtractor::returning("08390").with_delay(Duration::from_millis(200)));
        let (pipeline, registry, pool) = setup(extractor).await;
        ingest(&registry, &pool, 1).await;

        let background = pipeline.clone();
        let handle = tokio::spawn(async move { background.run("key", &NullSink).await });

        // Give the first run time to take the guard.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = pipeline.run("key", &NullSink).await.unwrap();
        assert_eq!(second, RunOutcome::Busy);

        let first = handle.await.unwrap().unwrap();
        assert!(matches!(first, RunOutcome::Completed(_)));
    }
}
