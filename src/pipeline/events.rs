//! Pipeline progress events
//!
//! The runner publishes one event per state change; sinks decide what to do
//! with them. The HTTP layer mirrors events into a shared snapshot that the
//! status endpoint serves; tests collect them to assert ordering.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use uuid::Uuid;

use crate::images::CodeOutcome;

/// Events emitted during a batch run
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A run started with a fixed batch size.
    Started { total: usize },
    /// A record transitioned to `processing`; published before the
    /// extraction call resolves.
    ItemStarted {
        id: Uuid,
        /// Position in the batch (0-based).
        index: usize,
        total: usize,
    },
    /// A record reached `success` or `error`.
    ItemFinished {
        id: Uuid,
        index: usize,
        total: usize,
        outcome: CodeOutcome,
    },
    /// Every item in the batch has been attempted and persisted.
    Finished { summary: BatchSummary },
}

/// Aggregate result of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Sink for progress events
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}

/// Sink that discards every event
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&self, _event: &BatchEvent) {}
}

/// Coarse run state for the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// Snapshot of the current (or last) run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub state: RunState,
    /// Items attempted so far in the current batch.
    pub current: usize,
    pub total: usize,
    /// Operator-facing progress message.
    pub message: String,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            current: 0,
            total: 0,
            message: String::new(),
        }
    }
}

/// Shared run progress, updated by the pipeline through the sink trait
#[derive(Clone, Default)]
pub struct RunProgress {
    inner: Arc<RwLock<RunSnapshot>>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.inner.read().expect("progress lock poisoned").clone()
    }

    /// Back to `idle`, e.g. after clearing all records
    pub fn reset(&self) {
        let mut snapshot = self.inner.write().expect("progress lock poisoned");
        *snapshot = RunSnapshot::default();
    }
}

impl ProgressSink for RunProgress {
    fn on_event(&self, event: &BatchEvent) {
        let mut snapshot = self.inner.write().expect("progress lock poisoned");
        match event {
            BatchEvent::Started { total } => {
                snapshot.state = RunState::Running;
                snapshot.current = 0;
                snapshot.total = *total;
                snapshot.message = format!("Iniciando lote de {} imágenes...", total);
            }
            BatchEvent::ItemStarted { index, total, .. } => {
                snapshot.message = format!("Procesando {} de {}...", index + 1, total);
            }
            BatchEvent::ItemFinished { index, .. } => {
                snapshot.current = index + 1;
            }
            BatchEvent::Finished { summary } => {
                snapshot.state = RunState::Completed;
                snapshot.current = summary.attempted;
                snapshot.message = format!("Lote de {} imágenes completado.", summary.attempted);
            }
        }
    }
}
