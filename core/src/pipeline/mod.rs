//! Pipeline stages
//!
//! A job runs as shard stage -> zero or more merge passes -> final stage. The
//! shard stage pre-aggregates each input shard into one partial state per
//! group, merge passes combine partial states of the same group partition, and
//! the final stage folds everything a partition received and emits records.

pub mod final_stage;
pub mod merge;
pub mod runner;
pub mod shard;

pub use final_stage::FinalStage;
pub use merge::MergeStage;
pub use runner::{PipelineOptions, PipelineOutput, PipelineRunner};
pub use shard::{MemoryShard, ShardInput, ShardOutput, ShardProcessor, process_shard};
