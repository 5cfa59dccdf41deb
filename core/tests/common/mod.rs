//! Common test utilities and helpers for integration tests

use mapfold_core::{JobConfig, JobContext, JobOutput, MemoryShard, ShardInput};
use std::sync::Arc;

/// Create a test context with the given stage shape
#[allow(dead_code)]
pub fn create_test_context(partitions: usize, merge_passes: usize, fan_in: usize) -> JobContext {
    let config = JobConfig {
        final_stage_parallelism: partitions,
        merge_passes,
        merge_fan_in: fan_in,
        num_threads: 4,
        ..Default::default()
    };
    JobContext::new("integration-test", config).unwrap()
}

/// Create a test context with a custom top K
#[allow(dead_code)] // Not every test binary runs the top-K job
pub fn create_top_k_context(top_k: i64, partitions: usize) -> JobContext {
    let config = JobConfig {
        top_k,
        final_stage_parallelism: partitions,
        num_threads: 2,
        ..Default::default()
    };
    JobContext::new("integration-test", config).unwrap()
}

/// One in-memory shard per text
#[allow(dead_code)]
pub fn shards_from(texts: &[&str]) -> Vec<Arc<dyn ShardInput>> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Arc::new(MemoryShard::from_text(format!("shard-{i}"), text)) as Arc<dyn ShardInput>
        })
        .collect()
}

/// Split `lines` into shards at the given cut points
#[allow(dead_code)]
pub fn split_lines(lines: &[String], cuts: &[usize]) -> Vec<Arc<dyn ShardInput>> {
    let mut bounds: Vec<usize> = cuts.iter().map(|c| c % (lines.len() + 1)).collect();
    bounds.push(0);
    bounds.push(lines.len());
    bounds.sort_unstable();
    bounds.dedup();
    bounds
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            Arc::new(MemoryShard::new(format!("split-{i}"), lines[w[0]..w[1]].to_vec()))
                as Arc<dyn ShardInput>
        })
        .collect()
}

/// Every output record as text, sorted
#[allow(dead_code)]
pub fn sorted_lines(output: &JobOutput) -> Vec<String> {
    let mut lines: Vec<String> = output.records().map(|r| r.to_string()).collect();
    lines.sort();
    lines
}
