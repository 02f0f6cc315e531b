//! Stage-transition reporting.
//!
//! The pipeline never logs directly; it reports every stage start, success
//! and failure to an injected [`StageObserver`]. Production runs use
//! [`TracingObserver`]; tests use [`RecordingObserver`] to inspect the exact
//! sequence of transitions without installing a global subscriber.

use std::sync::{Arc, Mutex};

use monitor_core::error::{MonitorError, Stage};

/// Receives stage transitions from the pipeline.
pub trait StageObserver {
    fn on_start(&self, stage: Stage);
    fn on_success(&self, stage: Stage, summary: &str);
    fn on_failure(&self, stage: Stage, error: &MonitorError);
}

// ── TracingObserver ───────────────────────────────────────────────────────────

/// Emits one `tracing` event per transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_start(&self, stage: Stage) {
        tracing::info!(stage = %stage, "stage started");
    }

    fn on_success(&self, stage: Stage, summary: &str) {
        tracing::info!(stage = %stage, "stage succeeded: {}", summary);
    }

    fn on_failure(&self, stage: Stage, error: &MonitorError) {
        tracing::error!(stage = %stage, error = %error, "stage failed");
    }
}

// ── RecordingObserver ─────────────────────────────────────────────────────────

/// A recorded stage transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Started(Stage),
    Succeeded(Stage, String),
    Failed(Stage, String),
}

impl StageEvent {
    pub fn stage(&self) -> Stage {
        match self {
            StageEvent::Started(s) | StageEvent::Succeeded(s, _) | StageEvent::Failed(s, _) => *s,
        }
    }
}

/// Collects transitions in memory. Clones share the same event log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<StageEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<StageEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn push(&self, event: StageEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl StageObserver for RecordingObserver {
    fn on_start(&self, stage: Stage) {
        self.push(StageEvent::Started(stage));
    }

    fn on_success(&self, stage: Stage, summary: &str) {
        self.push(StageEvent::Succeeded(stage, summary.to_string()));
    }

    fn on_failure(&self, stage: Stage, error: &MonitorError) {
        self.push(StageEvent::Failed(stage, error.to_string()));
    }
}
