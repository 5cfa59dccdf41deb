//! Runs a job through shard, merge and final stages on the local scheduler.

use super::final_stage::FinalStage;
use super::merge::MergeStage;
use super::shard::{ShardInput, process_shard};
use crate::metrics::{JobMetrics, StageMetrics};
use crate::record::{Group, Record};
use crate::scheduler::LocalScheduler;
use crate::shuffle::{
    Aggregator, HashPartitioner, MemoryShuffleStore, Partitioner, ShuffleBlockId, decode_block,
    encode_block,
};
use crate::tokenizer::{Grouping, Tokenizer};
use crate::traits::StateData;
use mapfold_common::error::{CommonError, Result};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A run of partial states, at most one per group.
type Run<S> = Vec<(Group, S)>;

/// Shape of the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    final_partitions: NonZeroUsize,
    merge_passes: usize,
    merge_fan_in: usize,
}

impl PipelineOptions {
    pub fn new(final_partitions: usize, merge_passes: usize, merge_fan_in: usize) -> Result<Self> {
        let final_partitions = NonZeroUsize::new(final_partitions).ok_or_else(|| {
            CommonError::configuration_error("Final stage parallelism must be at least 1")
        })?;
        if merge_fan_in < 2 {
            return Err(CommonError::configuration_error(format!(
                "Merge fan-in must be at least 2, got {merge_fan_in}"
            )));
        }
        Ok(Self {
            final_partitions,
            merge_passes,
            merge_fan_in,
        })
    }

    pub fn final_partitions(&self) -> NonZeroUsize {
        self.final_partitions
    }

    pub fn merge_passes(&self) -> usize {
        self.merge_passes
    }

    pub fn merge_fan_in(&self) -> usize {
        self.merge_fan_in
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            final_partitions: NonZeroUsize::MIN,
            merge_passes: 1,
            merge_fan_in: 2,
        }
    }
}

/// Records of every final partition, in partition order.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub partitions: Vec<Vec<Record>>,
    pub metrics: JobMetrics,
}

/// Drives shards through the stage graph:
///
/// shard stage -> partition by group -> merge passes -> shuffle blocks ->
/// barrier -> final stage (one task per partition).
#[derive(Debug)]
pub struct PipelineRunner<'a> {
    scheduler: &'a LocalScheduler,
    store: &'a MemoryShuffleStore,
    options: PipelineOptions,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        scheduler: &'a LocalScheduler,
        store: &'a MemoryShuffleStore,
        options: PipelineOptions,
    ) -> Self {
        Self {
            scheduler,
            store,
            options,
        }
    }

    /// Number of final partitions for a tokenizer's grouping.
    pub fn effective_partitions(&self, grouping: Grouping) -> NonZeroUsize {
        match grouping {
            Grouping::PerKey => self.options.final_partitions,
            Grouping::Global => {
                if self.options.final_partitions.get() > 1 {
                    info!(
                        "Global grouping runs a single final partition (configured {})",
                        self.options.final_partitions
                    );
                }
                NonZeroUsize::MIN
            }
        }
    }

    pub fn run<T, A>(
        &self,
        shuffle_id: u32,
        tokenizer: &T,
        aggregator: &A,
        shards: &[Arc<dyn ShardInput>],
    ) -> Result<PipelineOutput>
    where
        T: Tokenizer,
        A: Aggregator<Value = T::Value>,
    {
        let num_partitions = self.effective_partitions(tokenizer.grouping());
        let partitioner = HashPartitioner::new(num_partitions);
        let mut metrics = JobMetrics::default();

        let runs = self.run_shard_stage(tokenizer, aggregator, &partitioner, shards, &mut metrics)?;
        let runs = self.run_merge_passes(aggregator, runs, &mut metrics)?;

        let result = self
            .write_blocks(shuffle_id, &runs, &mut metrics)
            .and_then(|()| {
                self.run_final_stage(shuffle_id, aggregator, num_partitions, &mut metrics)
            });
        self.store.remove_shuffle(shuffle_id)?;
        let partitions = result?;

        metrics.output_records = partitions.iter().map(|p| p.len() as u64).sum();
        info!(
            "Shuffle {} finished: {} record(s) in {} partition(s), {} shuffle bytes",
            shuffle_id,
            metrics.output_records,
            partitions.len(),
            metrics.shuffle_bytes
        );
        Ok(PipelineOutput {
            partitions,
            metrics,
        })
    }

    fn run_shard_stage<T, A>(
        &self,
        tokenizer: &T,
        aggregator: &A,
        partitioner: &HashPartitioner,
        shards: &[Arc<dyn ShardInput>],
        metrics: &mut JobMetrics,
    ) -> Result<Vec<Vec<Run<A::State>>>>
    where
        T: Tokenizer,
        A: Aggregator<Value = T::Value>,
    {
        info!("Starting shard stage with {} shard(s)", shards.len());
        let start = Instant::now();
        let outputs = self.scheduler.run_stage("shard", shards, |_, shard| {
            let output = process_shard(tokenizer, aggregator, &**shard)?;
            debug!(
                "Shard '{}': {} line(s), {} group(s)",
                shard.name(),
                output.lines,
                output.pairs.len()
            );
            let pairs = output.pairs.len() as u64;
            let buckets = split_by_partition(partitioner, output.pairs);
            Ok((buckets, output.lines, output.emissions, pairs))
        })?;

        let mut stage = StageMetrics::new("shard");
        stage.tasks = shards.len();
        let mut runs: Vec<Vec<Run<A::State>>> =
            (0..partitioner.num_partitions()).map(|_| Vec::new()).collect();
        for (buckets, lines, emissions, pairs) in outputs {
            stage.input_records += lines;
            stage.output_records += pairs;
            metrics.emissions += emissions;
            for (partition, bucket) in buckets.into_iter().enumerate() {
                if !bucket.is_empty() {
                    runs[partition].push(bucket);
                }
            }
        }
        stage.elapsed = start.elapsed();
        info!("Finished {}", stage);
        metrics.shard = stage;
        Ok(runs)
    }

    fn run_merge_passes<A: Aggregator>(
        &self,
        aggregator: &A,
        mut runs: Vec<Vec<Run<A::State>>>,
        metrics: &mut JobMetrics,
    ) -> Result<Vec<Vec<Run<A::State>>>> {
        let fan_in = self.options.merge_fan_in;
        let merge_stage = MergeStage::new(aggregator);

        for pass in 1..=self.options.merge_passes {
            if runs.iter().all(|partition| partition.len() <= 1) {
                debug!("Skipping merge pass {}: every partition holds at most one run", pass);
                break;
            }
            let name = format!("merge-{pass}");
            let start = Instant::now();
            let tasks: Vec<(usize, &[Run<A::State>])> = runs
                .iter()
                .enumerate()
                .flat_map(|(partition, partition_runs)| {
                    partition_runs.chunks(fan_in).map(move |chunk| (partition, chunk))
                })
                .collect();
            let input_records: u64 = runs.iter().flatten().map(|run| run.len() as u64).sum();

            let merged = self.scheduler.run_stage(&name, &tasks, |_, (partition, chunk)| {
                Ok((*partition, merge_stage.merge(chunk)))
            })?;

            let mut stage = StageMetrics::new(name);
            stage.tasks = tasks.len();
            stage.input_records = input_records;
            let mut next: Vec<Vec<Run<A::State>>> = (0..runs.len()).map(|_| Vec::new()).collect();
            for (partition, run) in merged {
                stage.output_records += run.len() as u64;
                if !run.is_empty() {
                    next[partition].push(run);
                }
            }
            stage.elapsed = start.elapsed();
            info!("Finished {}", stage);
            metrics.merge.push(stage);
            runs = next;
        }
        Ok(runs)
    }

    fn write_blocks<S: StateData>(
        &self,
        shuffle_id: u32,
        runs: &[Vec<Run<S>>],
        metrics: &mut JobMetrics,
    ) -> Result<()> {
        let mut blocks: Vec<(ShuffleBlockId, &Run<S>)> = Vec::new();
        for (partition, partition_runs) in runs.iter().enumerate() {
            for (map_id, run) in partition_runs.iter().enumerate() {
                let block_id =
                    ShuffleBlockId::new(shuffle_id, block_index(map_id)?, block_index(partition)?);
                blocks.push((block_id, run));
            }
        }

        let store = self.store;
        let sizes = self.scheduler.run_stage("transfer", &blocks, |_, (block_id, run)| {
            let bytes = encode_block(run)?;
            let size = bytes.len() as u64;
            store.put_block(*block_id, bytes)?;
            Ok(size)
        })?;
        metrics.shuffle_bytes = sizes.iter().sum();
        info!(
            "Shuffle {} barrier reached: {} block(s), {} bytes",
            shuffle_id,
            blocks.len(),
            metrics.shuffle_bytes
        );
        Ok(())
    }

    fn run_final_stage<A: Aggregator>(
        &self,
        shuffle_id: u32,
        aggregator: &A,
        num_partitions: NonZeroUsize,
        metrics: &mut JobMetrics,
    ) -> Result<Vec<Vec<Record>>> {
        let start = Instant::now();
        let reduce_ids = (0..num_partitions.get())
            .map(block_index)
            .collect::<Result<Vec<u32>>>()?;
        let store = self.store;
        let final_stage = FinalStage::new(aggregator);

        let outputs = self.scheduler.run_stage("final", &reduce_ids, |_, reduce_id| {
            let mut pairs: Vec<(Group, A::State)> = Vec::new();
            for block_id in store.blocks_for_reduce(shuffle_id, *reduce_id)? {
                let bytes = store.get_block(&block_id)?;
                pairs.extend(decode_block::<A::State>(&bytes)?);
            }
            let input_records = pairs.len() as u64;
            let records = final_stage.run(pairs);
            debug!(
                "Final partition {}: {} state(s) in, {} record(s) out",
                reduce_id,
                input_records,
                records.len()
            );
            Ok((input_records, records))
        })?;

        let mut stage = StageMetrics::new("final");
        stage.tasks = reduce_ids.len();
        let mut partitions = Vec::with_capacity(outputs.len());
        for (input_records, records) in outputs {
            stage.input_records += input_records;
            stage.output_records += records.len() as u64;
            partitions.push(records);
        }
        stage.elapsed = start.elapsed();
        info!("Finished {}", stage);
        metrics.final_stage = stage;
        Ok(partitions)
    }
}

/// Route every pair of a shard to its final partition.
fn split_by_partition<S>(partitioner: &HashPartitioner, pairs: Run<S>) -> Vec<Run<S>> {
    let mut buckets: Vec<Run<S>> = (0..partitioner.num_partitions())
        .map(|_| Vec::new())
        .collect();
    for (group, state) in pairs {
        let partition = partitioner.get_partition(&group);
        buckets[partition].push((group, state));
    }
    buckets
}

fn block_index(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|e| {
        CommonError::shuffle_error_with_source(format!("Block index {index} out of range"), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MemoryShard;
    use crate::shuffle::{BoundedTopKAggregator, PresenceAggregator, SumAggregator};
    use crate::tokenizer::{NumberTokenizer, WholeLineTokenizer, WordTokenizer};

    fn shards(texts: &[&str]) -> Vec<Arc<dyn ShardInput>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Arc::new(MemoryShard::from_text(format!("s{i}"), text)) as Arc<dyn ShardInput>
            })
            .collect()
    }

    fn options(final_partitions: usize, merge_passes: usize, fan_in: usize) -> PipelineOptions {
        PipelineOptions::new(final_partitions, merge_passes, fan_in).unwrap()
    }

    fn flatten(output: PipelineOutput) -> Vec<Record> {
        output.partitions.into_iter().flatten().collect()
    }

    #[test]
    fn test_pipeline_options_validation() {
        assert!(PipelineOptions::new(0, 1, 2).is_err());
        assert!(PipelineOptions::new(1, 1, 1).is_err());
        let options = PipelineOptions::new(3, 0, 4).unwrap();
        assert_eq!(options.final_partitions().get(), 3);
        assert_eq!(options.merge_passes(), 0);
        assert_eq!(options.merge_fan_in(), 4);
    }

    #[test]
    fn test_word_count_across_partitions() {
        let scheduler = LocalScheduler::new(2, 0).unwrap();
        let store = MemoryShuffleStore::new();
        let runner = PipelineRunner::new(&scheduler, &store, options(3, 2, 2));
        let output = runner
            .run(0, &WordTokenizer, &SumAggregator, &shards(&["a b a", "a", "c b"]))
            .unwrap();

        assert_eq!(output.partitions.len(), 3);
        assert_eq!(output.metrics.shard.tasks, 3);
        assert_eq!(output.metrics.emissions, 6);
        let mut records = flatten(output);
        records.sort_by_key(|r| r.to_string());
        let lines: Vec<String> = records.iter().map(|r| r.to_string()).collect();
        assert_eq!(lines, vec!["a\t3", "b\t2", "c\t1"]);
        assert_eq!(store.num_blocks().unwrap(), 0);
    }

    #[test]
    fn test_top_k_forces_single_partition() {
        let scheduler = LocalScheduler::new(2, 0).unwrap();
        let store = MemoryShuffleStore::new();
        let runner = PipelineRunner::new(&scheduler, &store, options(4, 1, 2));
        let aggregator = BoundedTopKAggregator::new(NonZeroUsize::new(3).unwrap());
        let output = runner
            .run(7, &NumberTokenizer, &aggregator, &shards(&["5 1 9", "9 2"]))
            .unwrap();
        assert_eq!(output.partitions.len(), 1);
        assert_eq!(
            output.partitions[0],
            vec![Record::Number(9), Record::Number(9), Record::Number(5)]
        );
    }

    #[test]
    fn test_dedup_without_merge_passes() {
        let scheduler = LocalScheduler::new(1, 0).unwrap();
        let store = MemoryShuffleStore::new();
        let runner = PipelineRunner::new(&scheduler, &store, options(2, 0, 2));
        let output = runner
            .run(
                1,
                &WholeLineTokenizer,
                &PresenceAggregator,
                &shards(&["x\ny\nx", "y\nz"]),
            )
            .unwrap();
        assert!(output.metrics.merge.is_empty());
        let mut records: Vec<String> = flatten(output).iter().map(|r| r.to_string()).collect();
        records.sort();
        assert_eq!(records, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_merge_passes_stop_once_runs_are_merged() {
        let scheduler = LocalScheduler::new(2, 0).unwrap();
        let store = MemoryShuffleStore::new();
        let runner = PipelineRunner::new(&scheduler, &store, options(1, 10, 2));
        let output = runner
            .run(2, &WordTokenizer, &SumAggregator, &shards(&["a", "a", "a", "a"]))
            .unwrap();
        // 4 runs -> 2 -> 1
        assert_eq!(output.metrics.merge.len(), 2);
        assert_eq!(
            flatten(output),
            vec![Record::Count {
                key: "a".into(),
                count: 4
            }]
        );
    }

    #[test]
    fn test_no_shards() {
        let scheduler = LocalScheduler::new(1, 0).unwrap();
        let store = MemoryShuffleStore::new();
        let runner = PipelineRunner::new(&scheduler, &store, options(2, 1, 2));
        let output = runner.run(3, &WordTokenizer, &SumAggregator, &[]).unwrap();
        assert_eq!(output.partitions, vec![Vec::new(), Vec::new()]);
        assert_eq!(output.metrics.shuffle_bytes, 0);
    }
}
