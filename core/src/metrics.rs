//! Per-stage and per-job execution metrics.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Counters recorded for one stage (or one merge pass).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageMetrics {
    pub name: String,
    pub tasks: usize,
    /// Lines read by the shard stage, pairs consumed by later stages
    pub input_records: u64,
    /// Pairs produced, or records emitted by the final stage
    pub output_records: u64,
    pub elapsed: Duration,
}

impl StageMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for StageMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} task(s), {} in, {} out, {:?}",
            self.name, self.tasks, self.input_records, self.output_records, self.elapsed
        )
    }
}

/// Metrics for a complete job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobMetrics {
    pub shard: StageMetrics,
    /// One entry per merge pass that ran
    pub merge: Vec<StageMetrics>,
    pub final_stage: StageMetrics,
    /// Total tokenizer emissions across all shards
    pub emissions: u64,
    /// Encoded size of every block written to the shuffle store
    pub shuffle_bytes: u64,
    pub output_records: u64,
}

impl JobMetrics {
    pub fn stages(&self) -> impl Iterator<Item = &StageMetrics> {
        std::iter::once(&self.shard)
            .chain(self.merge.iter())
            .chain(std::iter::once(&self.final_stage))
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stages().map(|stage| stage.elapsed).sum()
    }
}
