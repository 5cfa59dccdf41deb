//! Local Task Scheduler
//!
//! This module provides a local task scheduler that uses a dedicated Rayon
//! thread pool to execute the tasks of a stage in parallel on a single machine.
//! A stage returns only after every one of its tasks has finished, which is the
//! barrier the final stage relies on.

use crate::traits::{BasicPartition, Partition};
use mapfold_common::error::{CommonError, Diagnose, Result};
use rayon::prelude::*;
use std::fmt::Debug;
use std::time::Instant;
use tracing::{debug, warn};

/// LocalScheduler manages parallel execution of stage tasks using Rayon
pub struct LocalScheduler {
    pool: rayon::ThreadPool,
    /// Number of threads in the thread pool
    num_threads: usize,
    /// Maximum number of times a failed task is re-executed
    max_retries: u32,
}

impl Debug for LocalScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalScheduler")
            .field("num_threads", &self.num_threads)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl LocalScheduler {
    /// Create a new LocalScheduler with the specified number of threads
    pub fn new(num_threads: usize, max_retries: u32) -> Result<Self> {
        if num_threads == 0 {
            return Err(CommonError::configuration_error(
                "Scheduler needs at least one thread",
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("mapfold-worker-{i}"))
            .build()
            .map_err(|e| {
                CommonError::internal_error_with_source("Failed to build worker thread pool", e)
            })?;
        Ok(Self {
            pool,
            num_threads,
            max_retries,
        })
    }

    /// Create a new LocalScheduler with one thread per CPU core
    pub fn with_default_threads(max_retries: u32) -> Result<Self> {
        Self::new(num_cpus::get(), max_retries)
    }

    /// Get the number of threads
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run one task per input in parallel and collect the results in input order.
    ///
    /// A task receives its partition and a shared reference to its input, so a
    /// failed attempt can be replayed from the same input. Retryable failures
    /// are re-executed up to `max_retries` times; the first error that is not
    /// retried fails the whole stage.
    pub fn run_stage<I, T, F>(&self, stage: &str, inputs: &[I], task_fn: F) -> Result<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&dyn Partition, &I) -> Result<T> + Send + Sync,
    {
        let start = Instant::now();
        let results: Result<Vec<T>> = self.pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(index, input)| {
                    let partition = BasicPartition::new(index);
                    self.run_with_retries(stage, &partition, || task_fn(&partition, input))
                })
                .collect()
        });
        debug!(
            "Stage '{}' ran {} task(s) in {:?}",
            stage,
            inputs.len(),
            start.elapsed()
        );
        results
    }

    fn run_with_retries<T>(
        &self,
        stage: &str,
        partition: &dyn Partition,
        mut attempt_fn: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            match attempt_fn() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Stage '{}' task {} failed (attempt {}/{}): {}. Retrying.",
                        stage,
                        partition.id(),
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                }
                Err(e) => {
                    warn!(
                        "Stage '{}' task {} failed after {} attempt(s) ({:?} error): {}",
                        stage,
                        partition.id(),
                        attempt + 1,
                        e.category(),
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tracing_test::traced_test;

    #[test]
    fn test_local_scheduler_new() {
        let scheduler = LocalScheduler::new(4, 2).unwrap();
        assert_eq!(scheduler.num_threads(), 4);
        assert_eq!(scheduler.max_retries(), 2);
    }

    #[test]
    fn test_local_scheduler_rejects_zero_threads() {
        let result = LocalScheduler::new(0, 0);
        assert!(matches!(
            result,
            Err(CommonError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_local_scheduler_with_default_threads() {
        let scheduler = LocalScheduler::with_default_threads(0).unwrap();
        assert!(scheduler.num_threads() > 0);
    }

    #[test]
    fn test_run_stage_preserves_input_order() {
        let scheduler = LocalScheduler::new(3, 0).unwrap();
        let inputs: Vec<i32> = (0..10).collect();
        let results = scheduler
            .run_stage("double", &inputs, |_, x| Ok(x * 2))
            .unwrap();
        assert_eq!(results, (0..10).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_stage_passes_partition_index() {
        let scheduler = LocalScheduler::new(2, 0).unwrap();
        let inputs = vec!["a", "b", "c"];
        let results = scheduler
            .run_stage("index", &inputs, |p, s| Ok(format!("{}{}", s, p.index())))
            .unwrap();
        assert_eq!(results, vec!["a0", "b1", "c2"]);
    }

    #[test]
    fn test_run_stage_empty() {
        let scheduler = LocalScheduler::new(2, 0).unwrap();
        let inputs: Vec<u8> = Vec::new();
        let results: Vec<u8> = scheduler.run_stage("empty", &inputs, |_, x| Ok(*x)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_retryable_failure_is_retried() {
        let scheduler = LocalScheduler::new(1, 3).unwrap();
        let attempts = AtomicU32::new(0);
        let results = scheduler
            .run_stage("flaky", &[7], |_, x| {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CommonError::io_error("transient read failure"))
                } else {
                    Ok(*x)
                }
            })
            .unwrap();
        assert_eq!(results, vec![7]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retries_are_bounded() {
        let scheduler = LocalScheduler::new(1, 2).unwrap();
        let attempts = AtomicU32::new(0);
        let result = scheduler.run_stage("broken", &[1], |_, _: &i32| -> Result<i32> {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(CommonError::io_error("disk unplugged"))
        });
        assert!(matches!(result, Err(CommonError::IoError { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    #[traced_test]
    fn test_non_retryable_failure_fails_immediately() {
        let scheduler = LocalScheduler::new(1, 5).unwrap();
        let attempts = AtomicU32::new(0);
        let result = scheduler.run_stage("corrupt", &[1], |_, _: &i32| -> Result<i32> {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(CommonError::deserialization_error("bad block"))
        });
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(logs_contain("failed after 1 attempt(s) (DataProcessing error)"));
    }
}
