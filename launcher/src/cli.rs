//! Command line arguments

use clap::Parser;
use mapfold_common::error::Result;
use mapfold_core::{JobConfig, JobKind};
use std::path::PathBuf;
use tracing::warn;

/// Run a word count, dedup or top-K job over text files
#[derive(Parser, Debug, Clone)]
#[command(name = "mapfold")]
#[command(about = "mapfold - key-grouped partial aggregation over text files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Job to run: wordcount, dedup or topk
    pub job: JobKind,

    /// Input file or directory
    pub input: Option<PathBuf>,

    /// Output directory (must not exist)
    pub output: Option<PathBuf>,

    /// Number of values kept by the topk job
    #[arg(allow_negative_numbers = true)]
    pub top_k: Option<i64>,

    /// JSON job configuration; command line options take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of final partitions (part files)
    #[arg(short, long)]
    pub reducers: Option<usize>,

    /// Maximum number of merge passes
    #[arg(long)]
    pub merge_passes: Option<usize>,

    /// Runs combined by one merge task
    #[arg(long)]
    pub merge_fan_in: Option<usize>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Maximum number of times a failed task is retried
    #[arg(long)]
    pub retries: Option<u32>,
}

impl Cli {
    /// Build the job configuration: command line > config file > defaults.
    pub fn resolve(&self) -> Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::from_json_file(path)?,
            None => JobConfig::default(),
        };

        match &self.input {
            Some(input) => config.input_path = input.clone(),
            None => warn!("No input path given, using {}", config.input_path.display()),
        }
        match &self.output {
            Some(output) => config.output_path = output.clone(),
            None => warn!("No output path given, using {}", config.output_path.display()),
        }
        match self.top_k {
            Some(top_k) => config.top_k = top_k,
            None if self.job == JobKind::TopK => {
                warn!("No topK given, using {}", config.top_k)
            }
            None => {}
        }

        if let Some(reducers) = self.reducers {
            config.final_stage_parallelism = reducers;
        }
        if let Some(passes) = self.merge_passes {
            config.merge_passes = passes;
        }
        if let Some(fan_in) = self.merge_fan_in {
            config.merge_fan_in = fan_in;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        if let Some(retries) = self.retries {
            config.task_max_retries = retries;
        }
        Ok(config)
    }
}
