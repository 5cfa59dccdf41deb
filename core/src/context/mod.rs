//! Context module for mapfold
//!
//! This module provides job configuration and the execution context that runs
//! jobs on the local scheduler.

pub mod config;
pub mod job_context;

pub use config::*;
pub use job_context::*;
