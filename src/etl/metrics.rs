use std::time::Duration;

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Enrich,
    Load,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StepTiming {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

impl StepTiming {
    pub fn record(&mut self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(ms);
        self.max_ms = self.max_ms.max(ms);
    }
}

/// Counters and per-stage timings for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SyncMetrics {
    pub pages: u64,
    pub extracted: u64,
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    /// Records deferred on first sight because their parent was not stored yet.
    pub deferred: u64,
    /// Deferred-record retry attempts.
    pub retried: u64,
    pub abandoned: u64,
    pub transform_errors: u64,
    pub enrich_errors: u64,
    pub load_errors: u64,
    pub extract: StepTiming,
    pub transform: StepTiming,
    pub enrich: StepTiming,
    pub load: StepTiming,
}

impl SyncMetrics {
    pub fn observe(&mut self, stage: Stage, elapsed: Duration) {
        let timing = match stage {
            Stage::Extract => &mut self.extract,
            Stage::Transform => &mut self.transform,
            Stage::Enrich => &mut self.enrich,
            Stage::Load => &mut self.load,
        };
        timing.record(elapsed);
    }

    pub fn log_summary(&self) {
        info!(
            pages = self.pages,
            extracted = self.extracted,
            processed = self.processed,
            created = self.created,
            updated = self.updated,
            deferred = self.deferred,
            retried = self.retried,
            abandoned = self.abandoned,
            transform_errors = self.transform_errors,
            enrich_errors = self.enrich_errors,
            load_errors = self.load_errors,
            "sync run finished"
        );
    }
}
