//! In-memory shuffle block store
//!
//! Partial states leave their producing task as encoded blocks and are decoded
//! by the consuming task, so no state is ever shared between two stage
//! instances. Writing a block id again replaces the previous block, which keeps
//! re-executed tasks from delivering their output twice.

use crate::record::Group;
use crate::traits::StateData;
use mapfold_common::error::{CommonError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shuffle block identifier
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ShuffleBlockId {
    pub shuffle_id: u32,
    pub map_id: u32,
    pub reduce_id: u32,
}

impl ShuffleBlockId {
    pub fn new(shuffle_id: u32, map_id: u32, reduce_id: u32) -> Self {
        Self {
            shuffle_id,
            map_id,
            reduce_id,
        }
    }
}

/// Encode a run of `(group, state)` pairs into a shuffle block.
pub fn encode_block<S: StateData>(pairs: &[(Group, S)]) -> Result<Vec<u8>> {
    bincode::encode_to_vec(pairs, bincode::config::standard()).map_err(|e| {
        CommonError::serialization_error_with_source("Failed to encode shuffle block", e)
    })
}

/// Decode a shuffle block written by [`encode_block`].
pub fn decode_block<S: StateData>(bytes: &[u8]) -> Result<Vec<(Group, S)>> {
    bincode::decode_from_slice(bytes, bincode::config::standard())
        .map(|(pairs, _)| pairs)
        .map_err(|e| {
            CommonError::deserialization_error_with_source("Failed to decode shuffle block", e)
        })
}

/// In-memory shuffle block store
#[derive(Debug, Default, Clone)]
pub struct MemoryShuffleStore {
    blocks: Arc<RwLock<HashMap<ShuffleBlockId, Vec<u8>>>>,
}

impl MemoryShuffleStore {
    pub fn new() -> Self {
        Self {
            blocks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn put_block(&self, block_id: ShuffleBlockId, data: Vec<u8>) -> Result<()> {
        let mut blocks = self
            .blocks
            .write()
            .map_err(|_| CommonError::shuffle_error("Shuffle store lock poisoned"))?;
        blocks.insert(block_id, data);
        Ok(())
    }

    pub fn get_block(&self, block_id: &ShuffleBlockId) -> Result<Vec<u8>> {
        let blocks = self
            .blocks
            .read()
            .map_err(|_| CommonError::shuffle_error("Shuffle store lock poisoned"))?;
        blocks
            .get(block_id)
            .cloned()
            .ok_or_else(|| CommonError::shuffle_error(format!("Block not found: {:?}", block_id)))
    }

    /// Ids of every block destined for `reduce_id`, ordered by map id.
    pub fn blocks_for_reduce(
        &self,
        shuffle_id: u32,
        reduce_id: u32,
    ) -> Result<Vec<ShuffleBlockId>> {
        let blocks = self
            .blocks
            .read()
            .map_err(|_| CommonError::shuffle_error("Shuffle store lock poisoned"))?;
        let mut ids: Vec<ShuffleBlockId> = blocks
            .keys()
            .filter(|id| id.shuffle_id == shuffle_id && id.reduce_id == reduce_id)
            .copied()
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Drop every block of a finished shuffle.
    pub fn remove_shuffle(&self, shuffle_id: u32) -> Result<()> {
        let mut blocks = self
            .blocks
            .write()
            .map_err(|_| CommonError::shuffle_error("Shuffle store lock poisoned"))?;
        blocks.retain(|id, _| id.shuffle_id != shuffle_id);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn num_blocks(&self) -> Result<usize> {
        let blocks = self
            .blocks
            .read()
            .map_err(|_| CommonError::shuffle_error("Shuffle store lock poisoned"))?;
        Ok(blocks.len())
    }
}
