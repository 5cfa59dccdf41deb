//! Mapfold Launcher
//!
//! Command line front end: resolves the job configuration, turns the input
//! path into file shards, runs the job and writes Hadoop-style part files.

pub mod cli;
pub mod input;
pub mod output;

pub use cli::Cli;

use anyhow::Context;
use mapfold_core::{JobContext, JobOutput, ShardInput};
use std::sync::Arc;
use tracing::info;

/// Run the job described by `cli` and write its output.
pub fn run(cli: &Cli) -> anyhow::Result<JobOutput> {
    let config = cli.resolve().context("Failed to resolve job configuration")?;
    output::check_output_dir(&config.output_path)?;

    let shards: Vec<Arc<dyn ShardInput>> = input::discover_shards(&config.input_path)?
        .into_iter()
        .map(|shard| Arc::new(shard) as Arc<dyn ShardInput>)
        .collect();
    info!(
        "Running {} over {} shard(s) from {}",
        cli.job,
        shards.len(),
        config.input_path.display()
    );

    let ctx = JobContext::new("mapfold", config)?;
    let output = ctx
        .run(cli.job, &shards)
        .with_context(|| format!("Job {} failed", cli.job))?;
    output::write_output(&ctx.config().output_path, &output)?;
    Ok(output)
}
