//! Audit sink for per-cycle stage records.
//!
//! Parallel test executions send entries through an unbounded channel rather
//! than appending to a shared log, so no lock is held around the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub const STAGE_CROSS_EXAMINATION: &str = "cross_examination";
pub const STAGE_RECOMMENDATION: &str = "recommendation_generation";

/// One timestamped stage record. Append-only per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub duration_ms: u64,
    pub data: serde_json::Value,
}

impl AuditEntry {
    pub fn new(stage: &str, success: bool, duration_ms: u64, data: serde_json::Value) -> Self {
        Self {
            stage: stage.to_string(),
            timestamp: Utc::now(),
            success,
            // Duration is reported strictly positive once execution began.
            duration_ms: duration_ms.max(1),
            data,
        }
    }
}

/// Cloneable fire-and-forget handle. The receiving end is drained by the
/// journal writer task; a dropped receiver discards entries silently.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn record(&self, entry: AuditEntry) {
        if self.tx.send(entry).is_err() {
            tracing::debug!("audit receiver dropped; entry discarded");
        }
    }
}
