use clap::Parser;
use mapfold_launcher::{Cli, run};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let output = run(&cli)?;
    info!(
        "Job {} finished: {} record(s), {} shuffle bytes",
        output.job_id,
        output.num_records(),
        output.metrics.shuffle_bytes
    );
    Ok(())
}
