//! Core components for shuffle operations.

pub mod aggregator;
pub mod partitioner;
pub mod store;
pub mod topk;

pub use aggregator::*;
pub use partitioner::*;
pub use store::*;
pub use topk::*;
