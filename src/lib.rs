//! A Rust library for building propensity-score matched cohorts across two
//! or more exposure groups, with Parquet and delimited-text input/output.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{Algorithm, MatchingConfig, MatchingConfigBuilder};
pub use error::{MatchError, Result};

// Matching
pub use algorithm::matching::{
    BalanceReport, ColumnSpec, MatchRecord, MatchSet, Matcher, MatchingResult, SubjectRecord,
};

// File IO
pub use utils::io::{RecordFormat, read_records, write_records};
