//! Mapfold Core - key-grouped partial aggregation
//!
//! This is the core module of the mapfold project. It provides the aggregator
//! contract, the word count, dedup and top-K aggregators, and a local runtime
//! that runs them as shard, merge and final stages.

pub mod context;
pub mod job;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod scheduler;
pub mod shuffle;
pub mod tokenizer;
pub mod traits;

pub use context::{JobConfig, JobContext, JobOutput};
pub use job::JobKind;
pub use metrics::{JobMetrics, StageMetrics};
pub use pipeline::{MemoryShard, ShardInput};
pub use record::{Group, Record};
pub use shuffle::{Aggregator, BoundedTopKAggregator, PresenceAggregator, SumAggregator, TopKSet};
