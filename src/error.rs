//! Unified error handling for proctree
//!
//! Every component returns an explicit outcome. The variants here cover the
//! cases that abort an invocation: bad input, a scan that could not start,
//! allocation failure, and configuration problems. Per-process misses and
//! safety refusals are not errors and never reach this type.

use std::io;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum ProcTreeError {
    #[error("Invalid number of arguments")]
    InvalidArguments { given: usize },

    #[error("Invalid command: {flag}")]
    UnknownOperation { flag: String },

    #[error("Invalid PID: {root} or {target}")]
    InvalidPid { root: String, target: String },

    #[error("Process {target} does not belong to the process subtree rooted at {root}")]
    NotInSubtree { target: u32, root: u32 },

    #[error("Failed to enumerate processes: {message}")]
    Enumeration {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Memory allocation failed for {what}")]
    Allocation {
        what: &'static str,
        #[source]
        source: std::collections::TryReserveError,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported platform")]
    UnsupportedPlatform,
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Lookup,
    Resource,
    Config,
}

impl ErrorCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorCategory::Input => "Input",
            ErrorCategory::Lookup => "Lookup",
            ErrorCategory::Resource => "Resource",
            ErrorCategory::Config => "Configuration",
        }
    }
}

impl ProcTreeError {
    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcTreeError::InvalidArguments { .. }
            | ProcTreeError::UnknownOperation { .. }
            | ProcTreeError::InvalidPid { .. }
            | ProcTreeError::NotInSubtree { .. } => ErrorCategory::Input,
            ProcTreeError::Enumeration { .. } | ProcTreeError::UnsupportedPlatform => {
                ErrorCategory::Lookup
            }
            ProcTreeError::Allocation { .. } | ProcTreeError::Io(_) => ErrorCategory::Resource,
            ProcTreeError::Config { .. } => ErrorCategory::Config,
        }
    }

    /// Fatal errors leave nothing safe to continue with for this invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProcTreeError::Allocation { .. }
                | ProcTreeError::Enumeration { .. }
                | ProcTreeError::UnsupportedPlatform
        )
    }

    /// Get user-friendly message
    ///
    /// Input errors print exactly their display text so scripts can match on
    /// it; everything else is prefixed with its category.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => self.to_string(),
            category => format!("{} problem: {}", category.display_name(), self),
        }
    }
}

/// Result type alias for convenience
pub type ProcTreeResult<T> = Result<T, ProcTreeError>;

/// Convenience functions for creating common errors
pub mod errors {
    use super::*;

    pub fn enumeration_error(message: impl Into<String>) -> ProcTreeError {
        ProcTreeError::Enumeration {
            message: message.into(),
            source: None,
        }
    }

    pub fn enumeration_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> ProcTreeError {
        ProcTreeError::Enumeration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_error(message: impl Into<String>) -> ProcTreeError {
        ProcTreeError::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> ProcTreeError {
        ProcTreeError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
