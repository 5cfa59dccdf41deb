//! Common utilities and abstractions for the mapfold project.
//!
//! This crate provides the error type shared by the core engine and the launcher.

pub mod error;

pub use error::{CommonError, Diagnose, ErrorCategory, ErrorContext, Result};
