//! Job configuration

use crate::pipeline::PipelineOptions;
use mapfold_common::error::{CommonError, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_PATH: &str = "/mr_input";
pub const DEFAULT_OUTPUT_PATH: &str = "/mr_output_01";
pub const DEFAULT_TOP_K: i64 = 10;

/// Configuration for a single job run.
///
/// Every field has a default, so a JSON file only needs the options it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct JobConfig {
    /// File or directory holding the input shards
    pub input_path: PathBuf,
    /// Output directory; must not exist yet
    pub output_path: PathBuf,
    /// Number of values kept by the top-K job. Only read by that job.
    pub top_k: i64,
    /// Number of final partitions (reducers)
    pub final_stage_parallelism: usize,
    /// Upper bound on merge passes between the shard and final stages
    pub merge_passes: usize,
    /// Runs combined by one merge task
    pub merge_fan_in: usize,
    /// Maximum number of times a failed task will be retried
    pub task_max_retries: u32,
    /// Worker threads
    pub num_threads: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            top_k: DEFAULT_TOP_K,
            final_stage_parallelism: 4,
            merge_passes: 1,
            merge_fan_in: 2,
            task_max_retries: 3,
            num_threads: num_cpus::get(),
        }
    }
}

impl JobConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            CommonError::configuration_error_with_source("Failed to parse job configuration", e)
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_config_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Check the options every job uses. `top_k` is checked separately by
    /// [`JobConfig::top_k_capacity`].
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(CommonError::configuration_error("numThreads must be at least 1"));
        }
        self.pipeline_options().map(|_| ())
    }

    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        PipelineOptions::new(
            self.final_stage_parallelism,
            self.merge_passes,
            self.merge_fan_in,
        )
    }

    /// The bounded set capacity for the top-K job.
    pub fn top_k_capacity(&self) -> Result<NonZeroUsize> {
        usize::try_from(self.top_k)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                CommonError::configuration_error(format!(
                    "topK must be a positive integer, got {}",
                    self.top_k
                ))
            })
    }
}
