//! Progress reporting utilities for long-running operations
//!
//! This module provides standardized progress reporting for matching runs,
//! using the indicatif crate. Bars are hidden unless progress display is
//! switched on, so callers can update them unconditionally.

use indicatif::{ProgressBar, ProgressStyle};

/// Default style for a run progress bar
pub const DEFAULT_MAIN_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}) {msg}";

/// Create a progress bar for one phase of a run
///
/// # Arguments
/// * `show` - Draw the bar; otherwise a hidden bar is returned
/// * `length` - Total length for the progress bar
/// * `description` - Message displayed next to the bar
///
/// # Returns
/// A configured `ProgressBar`
#[must_use]
pub fn create_run_progress_bar(show: bool, length: u64, description: &str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(DEFAULT_MAIN_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(description.to_string());
    pb
}

/// Finish a progress bar with a completion message
///
/// # Arguments
/// * `pb` - The `ProgressBar` to finish
/// * `message` - Optional completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}
