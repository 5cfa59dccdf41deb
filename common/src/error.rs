//! Error handling for the mapfold-common crate.

use thiserror::Error;

/// Common error type shared by every mapfold crate.
///
/// Each variant carries a human readable message and an optional source error
/// so that failures raised deep inside a task keep their cause when they reach
/// the launcher.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Serialization failed: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Deserialization failed: {message}")]
    DeserializationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Shuffle operation failed: {message}")]
    ShuffleError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error category for grouping related error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Job setup errors, raised before any task runs
    Configuration,
    /// Input and output errors (files, shuffle blocks)
    Infrastructure,
    /// Encoding or decoding of partial states
    DataProcessing,
    /// Internal logic errors
    Internal,
}

/// Diagnostics used by the scheduler to decide how to react to a failure.
pub trait Diagnose {
    /// Get the error category.
    fn category(&self) -> ErrorCategory;

    /// Check if re-running the failed task from its original input may succeed.
    fn is_retryable(&self) -> bool;
}

macro_rules! constructors {
    ($($variant:ident => $plain:ident, $with_source:ident;)*) => {
        impl CommonError {
            $(
                #[doc = concat!("Create a `", stringify!($variant), "` with a custom message.")]
                pub fn $plain<S: Into<String>>(message: S) -> Self {
                    Self::$variant {
                        message: message.into(),
                        source: None,
                    }
                }

                #[doc = concat!(
                    "Create a `", stringify!($variant), "` with a custom message and source error."
                )]
                pub fn $with_source<S: Into<String>, E: Into<anyhow::Error>>(
                    message: S,
                    source: E,
                ) -> Self {
                    Self::$variant {
                        message: message.into(),
                        source: Some(source.into()),
                    }
                }
            )*
        }
    };
}

constructors! {
    ConfigurationError => configuration_error, configuration_error_with_source;
    IoError => io_error, io_error_with_source;
    SerializationError => serialization_error, serialization_error_with_source;
    DeserializationError => deserialization_error, deserialization_error_with_source;
    ShuffleError => shuffle_error, shuffle_error_with_source;
    InternalError => internal_error, internal_error_with_source;
}

impl CommonError {
    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            CommonError::ConfigurationError { message, .. }
            | CommonError::IoError { message, .. }
            | CommonError::SerializationError { message, .. }
            | CommonError::DeserializationError { message, .. }
            | CommonError::ShuffleError { message, .. }
            | CommonError::InternalError { message, .. } => message,
        }
    }
}

impl Diagnose for CommonError {
    fn category(&self) -> ErrorCategory {
        match self {
            CommonError::ConfigurationError { .. } => ErrorCategory::Configuration,
            CommonError::IoError { .. } | CommonError::ShuffleError { .. } => {
                ErrorCategory::Infrastructure
            }
            CommonError::SerializationError { .. } | CommonError::DeserializationError { .. } => {
                ErrorCategory::DataProcessing
            }
            CommonError::InternalError { .. } => ErrorCategory::Internal,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            CommonError::ConfigurationError { .. } => false,
            CommonError::IoError { .. } => true,
            CommonError::SerializationError { .. } => false,
            CommonError::DeserializationError { .. } => false,
            CommonError::ShuffleError { .. } => false,
            CommonError::InternalError { .. } => false,
        }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(error: std::io::Error) -> Self {
        CommonError::io_error_with_source("I/O error", error)
    }
}

/// Context helpers for adding rich context to errors.
pub mod context {
    use super::*;

    /// Extension trait for attaching a message and a variant to foreign errors.
    pub trait ErrorContext<T> {
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        fn with_config_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;
    }

    impl<T, E> ErrorContext<T> for std::result::Result<T, E>
    where
        E: Into<anyhow::Error>,
    {
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::io_error_with_source(f(), e.into()))
        }

        fn with_config_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::configuration_error_with_source(f(), e.into()))
        }
    }
}

pub use context::ErrorContext;
