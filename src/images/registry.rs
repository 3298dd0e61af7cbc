//! In-memory image registry
//!
//! Ordered list of image records, shared between the API surface and the
//! batch pipeline. Ingestion order is preserved; the pipeline selects its
//! batches from it and publishes status transitions through it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{CodeOutcome, ImageRecord, ProcessingStatus};

/// Aggregate status counts for the record list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub error: usize,
}

impl StatusCounts {
    /// Records that have been attempted (success or error).
    pub fn processed(&self) -> usize {
        self.success + self.error
    }
}

/// Shared, ordered in-memory record list
#[derive(Clone)]
pub struct ImageRegistry {
    inner: Arc<RwLock<Vec<ImageRecord>>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replace the whole list, e.g. when reloading from the store at startup
    pub async fn replace_all(&self, records: Vec<ImageRecord>) {
        let mut list = self.inner.write().await;
        *list = records;
    }

    /// Append a freshly ingested record
    pub async fn insert(&self, record: ImageRecord) {
        let mut list = self.inner.write().await;
        list.push(record);
    }

    /// Snapshot of every record in ingestion order
    pub async fn all(&self) -> Vec<ImageRecord> {
        let list = self.inner.read().await;
        list.clone()
    }

    /// Look up a single record
    pub async fn get(&self, id: Uuid) -> Option<ImageRecord> {
        let list = self.inner.read().await;
        list.iter().find(|r| r.id == id).cloned()
    }

    /// Ids of the first `limit` pending records, in ingestion order
    ///
    /// This is the batch selector: the result is fixed for the duration of
    /// one pipeline run.
    pub async fn pending_batch(&self, limit: usize) -> Vec<Uuid> {
        let list = self.inner.read().await;
        list.iter()
            .filter(|r| r.status == ProcessingStatus::Pending)
            .take(limit)
            .map(|r| r.id)
            .collect()
    }

    /// Transition a pending record to `processing`
    ///
    /// Returns the updated record, or `None` when the record is gone or no
    /// longer pending (it was cleared between batch selection and this call).
    pub async fn mark_processing(&self, id: Uuid) -> Option<ImageRecord> {
        let mut list = self.inner.write().await;
        let record = list
            .iter_mut()
            .find(|r| r.id == id && r.status == ProcessingStatus::Pending)?;
        record.status = ProcessingStatus::Processing;
        Some(record.clone())
    }

    /// Apply an extraction outcome to a record
    pub async fn apply_outcome(&self, id: Uuid, outcome: &CodeOutcome) -> Option<ImageRecord> {
        let mut list = self.inner.write().await;
        let record = list.iter_mut().find(|r| r.id == id)?;
        record.apply(outcome);
        Some(record.clone())
    }

    /// Destroy every record
    pub async fn clear(&self) {
        let mut list = self.inner.write().await;
        list.clear();
    }

    pub async fn counts(&self) -> StatusCounts {
        let list = self.inner.read().await;
        let mut counts = StatusCounts::default();
        for record in list.iter() {
            match record.status {
                ProcessingStatus::Pending => counts.pending += 1,
                ProcessingStatus::Processing => counts.processing += 1,
                ProcessingStatus::Success => counts.success += 1,
                ProcessingStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub async fn is_empty(&self) -> bool {
        let list = self.inner.read().await;
        list.is_empty()
    }
}

impl Default for ImageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
