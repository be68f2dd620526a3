use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// Row counts before and after one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageMetric {
    pub stage: String,
    pub before: usize,
    pub after: usize,
}

impl StageMetric {
    pub fn dropped(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

pub struct StageTracker {
    run_id: String,
    metrics: Vec<StageMetric>,
}

impl StageTracker {
    pub fn new(run_id: String) -> Self {
        StageTracker {
            run_id,
            metrics: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: &str, before: usize, after: usize) {
        let metric = StageMetric {
            stage: stage.to_string(),
            before,
            after,
        };
        info!(run_id = %self.run_id, stage, rows = after, dropped = metric.dropped(), "stage complete");
        self.metrics.push(metric);
    }

    pub fn stages(&self) -> &[StageMetric] {
        &self.metrics
    }

    pub fn get(&self, stage: &str) -> Option<&StageMetric> {
        self.metrics.iter().find(|m| m.stage == stage)
    }

    pub fn lines(&self) -> Vec<String> {
        self.metrics
            .iter()
            .map(|m| format!("  rows after {}: {} (dropped {})", m.stage, m.after, m.dropped()))
            .collect()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl std::fmt::Debug for StageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTracker")
            .field("run_id", &self.run_id)
            .field("stages", &self.metrics.len())
            .finish()
    }
}

pub fn new_run_id() -> String {
    format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S"))
}
