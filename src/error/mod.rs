//! Error handling for the matching engine.
//!
//! Every condition listed here aborts the whole run; there is no partial
//! result mode. A subject that simply fails to find a partner inside the
//! caliper is not an error and never surfaces here.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for matching runs
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The same patient id appeared twice in the input
    #[error("Duplicate patient id in input: {0}")]
    DuplicateId(String),

    /// A record whose group indicator or scores could not be parsed
    #[error("Unparseable record {record}: {message}")]
    Parse {
        /// Patient id, or the row position when the id itself is missing
        record: String,
        /// What was wrong with it
        message: String,
    },

    /// A configured match group has no members
    #[error("Match group '{0}' has no members")]
    EmptyGroup(String),

    /// Caliper must be strictly positive and finite
    #[error("Caliper must be positive, got {0}")]
    InvalidCaliper(f64),

    /// Digit range for digit-greedy matching is unusable
    #[error("Invalid digit range: start {start}, end {end} (both must be positive and start >= end)")]
    InvalidDigits {
        /// Configured start digit
        start: i32,
        /// Configured end digit
        end: i32,
    },

    /// The algorithm needs a different number of groups
    #[error("{algorithm} matching requires {required} groups, but {found} were configured")]
    GroupCount {
        /// Algorithm name
        algorithm: &'static str,
        /// Human readable requirement, e.g. "exactly 2" or "at least 3"
        required: &'static str,
        /// Number of configured groups
        found: usize,
    },

    /// Any other configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// An index query broke one of its structural guarantees
    #[error("Spatial index invariant violated: {0}")]
    IndexInvariant(String),

    /// File system failure with the path that caused it
    #[error("IO error on {}: {context}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// What the caller was trying to do
        context: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Configuration file could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker pool could not be started
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl MatchError {
    /// Shorthand for a parse failure on a given record
    pub fn parse(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an IO failure with path context
    pub fn io(path: impl Into<PathBuf>, context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            context: context.into(),
            source,
        }
    }
}

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchError>;
