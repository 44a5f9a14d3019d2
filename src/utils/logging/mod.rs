//! Logging utilities for output and progress tracking
//!
//! This module provides utilities for logging, console output, and progress tracking.

pub mod console;
pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use console::{print_balance, print_match_summary};
pub use log::{FileOp, log_file_done, log_file_start};
pub use progress::{create_run_progress_bar, finish_progress_bar};
