//! Utility modules for file IO, logging and progress reporting

pub mod io;
pub mod logging;

pub use io::{RecordFormat, read_records, write_records};
