//! JobContext - entry point for running aggregation jobs locally

use super::config::JobConfig;
use crate::job::JobKind;
use crate::metrics::JobMetrics;
use crate::pipeline::{PipelineOutput, PipelineRunner, ShardInput};
use crate::record::Record;
use crate::scheduler::LocalScheduler;
use crate::shuffle::{BoundedTopKAggregator, MemoryShuffleStore, PresenceAggregator, SumAggregator};
use crate::tokenizer::{NumberTokenizer, WholeLineTokenizer, WordTokenizer};
use mapfold_common::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;
use uuid::Uuid;

/// Output of a finished job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub job_id: String,
    pub kind: JobKind,
    /// Records of each final partition, in partition order
    pub partitions: Vec<Vec<Record>>,
    pub metrics: JobMetrics,
}

impl JobOutput {
    /// All records, partition by partition.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.partitions.iter().flatten()
    }

    pub fn num_records(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }
}

/// JobContext owns the validated configuration, the worker pool and the
/// shuffle store shared by every job it runs.
#[derive(Debug)]
pub struct JobContext {
    app_name: String,
    config: JobConfig,
    scheduler: LocalScheduler,
    store: MemoryShuffleStore,
    next_shuffle_id: AtomicU32,
}

impl JobContext {
    /// Create a new context. Fails if the configuration is invalid.
    pub fn new(app_name: impl Into<String>, config: JobConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = LocalScheduler::new(config.num_threads, config.task_max_retries)?;
        Ok(Self {
            app_name: app_name.into(),
            config,
            scheduler,
            store: MemoryShuffleStore::new(),
            next_shuffle_id: AtomicU32::new(0),
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &LocalScheduler {
        &self.scheduler
    }

    fn new_shuffle_id(&self) -> u32 {
        self.next_shuffle_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Run `kind` over `shards` and return the records of every final
    /// partition.
    ///
    /// The top-K capacity is resolved before any shard is read, so a
    /// non-positive `top_k` fails the job without doing any work.
    pub fn run(&self, kind: JobKind, shards: &[Arc<dyn ShardInput>]) -> Result<JobOutput> {
        let job_id = format!("{}-{}-{}", self.app_name, kind, Uuid::new_v4());
        let runner = PipelineRunner::new(
            &self.scheduler,
            &self.store,
            self.config.pipeline_options()?,
        );
        let shuffle_id = self.new_shuffle_id();
        info!(
            "Starting job {} with {} shard(s) on {} thread(s)",
            job_id,
            shards.len(),
            self.scheduler.num_threads()
        );

        let PipelineOutput {
            partitions,
            metrics,
        } = match kind {
            JobKind::WordCount => {
                runner.run(shuffle_id, &WordTokenizer, &SumAggregator::new(), shards)?
            }
            JobKind::Dedup => runner.run(
                shuffle_id,
                &WholeLineTokenizer,
                &PresenceAggregator::new(),
                shards,
            )?,
            JobKind::TopK => {
                let aggregator = BoundedTopKAggregator::new(self.config.top_k_capacity()?);
                runner.run(shuffle_id, &NumberTokenizer, &aggregator, shards)?
            }
        };

        info!(
            "Job {} completed: {} record(s) in {:?}",
            job_id,
            metrics.output_records,
            metrics.total_elapsed()
        );
        Ok(JobOutput {
            job_id,
            kind,
            partitions,
            metrics,
        })
    }
}
