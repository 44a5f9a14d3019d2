//! Delimited text files through `arrow::csv`
//!
//! Every input column is read as text; typing happens during record
//! extraction, so ids such as `007` survive unchanged.

use std::io::{Seek, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{MatchError, Result};
use crate::utils::io::parquet::{DEFAULT_BATCH_SIZE, get_batch_size};
use crate::utils::logging::{FileOp, log_file_done, log_file_start};

/// Comma for `.csv` files, tab for anything else
#[must_use]
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

/// Read a delimited file with a header row
pub fn read_delimited(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_file_start(FileOp::Read, "delimited", path);

    let mut file = safe_open_file(path, "delimited input")?;
    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter_for(path));
    let (inferred, _) = format.infer_schema(&mut file, Some(1))?;
    file.rewind()
        .map_err(|e| MatchError::io(path, "Failed to rewind delimited input", e))?;

    let schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE))
        .build(file)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_file_done(FileOp::Read, path, rows, Some(start.elapsed()));
    Ok(batches)
}

/// Write a record batch as delimited text with a header row
pub fn write_delimited(path: &Path, batch: &RecordBatch) -> Result<()> {
    log_file_start(FileOp::Write, "delimited", path);
    let file = safe_create_file(path, "delimited output")?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter_for(path))
        .build(file);
    writer.write(batch)?;

    let mut file = writer.into_inner();
    file.flush()
        .map_err(|e| MatchError::io(path, "Failed to flush delimited output", e))?;

    log_file_done(FileOp::Write, path, batch.num_rows(), None);
    Ok(())
}
