//! Log lines for record file reads and writes

use std::path::Path;
use std::time::Duration;

/// Direction of a record file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    /// Subjects loaded from an input file
    Read,
    /// Match rows stored to an output file
    Write,
}

impl FileOp {
    const fn verb(self) -> &'static str {
        match self {
            Self::Read => "Reading",
            Self::Write => "Writing",
        }
    }

    const fn done(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Write => "Wrote",
        }
    }

    const fn preposition(self) -> &'static str {
        match self {
            Self::Read => "from",
            Self::Write => "to",
        }
    }
}

/// Log the start of a read or write, naming the file format
pub fn log_file_start(op: FileOp, format: &str, path: &Path) {
    log::info!(
        "{} {format} records {} {}",
        op.verb(),
        op.preposition(),
        path.display()
    );
}

/// Log a finished read or write with its row count
pub fn log_file_done(op: FileOp, path: &Path, rows: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!(
            "{} {rows} row(s) {} {} in {duration:?}",
            op.done(),
            op.preposition(),
            path.display()
        ),
        None => log::info!(
            "{} {rows} row(s) {} {}",
            op.done(),
            op.preposition(),
            path.display()
        ),
    }
}
