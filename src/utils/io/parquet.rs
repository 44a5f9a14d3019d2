//! Parquet file operations
//!
//! Reading projects the file onto the columns a run needs; writing stores
//! one record batch with Snappy compression.

use std::path::Path;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::warn;
use parquet::arrow::ArrowWriter;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::utils::logging::{FileOp, log_file_done, log_file_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size override from the environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PSMATCH_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

/// Projection mask for the named columns
///
/// Returns `None` when any column is missing, so the whole file is read and
/// the missing column is reported by the record extraction.
#[must_use]
pub fn create_projection(
    columns: &[&str],
    file_schema: &Schema,
    parquet_schema: &parquet::schema::types::SchemaDescriptor,
) -> Option<ProjectionMask> {
    let projection: Vec<usize> = columns
        .iter()
        .filter_map(|name| file_schema.index_of(name).ok())
        .sorted_unstable()
        .collect_vec();

    if projection.len() == columns.len() {
        Some(ProjectionMask::leaves(parquet_schema, projection))
    } else {
        warn!("Not every input column was found in the parquet file, reading all columns");
        None
    }
}

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `columns` - Columns to project
pub fn read_parquet(path: &Path, columns: &[&str]) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_file_start(FileOp::Read, "parquet", path);

    let file = safe_open_file(path, "parquet input")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE));

    let projection = create_projection(columns, builder.schema(), builder.parquet_schema());
    let reader = match projection {
        Some(mask) => builder.with_projection(mask).build()?,
        None => builder.build()?,
    };

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_file_done(FileOp::Read, path, rows, Some(start.elapsed()));
    Ok(batches)
}

/// Write a record batch to a parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    log_file_start(FileOp::Write, "parquet", path);
    let file = safe_create_file(path, "parquet output")?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    log_file_done(FileOp::Write, path, batch.num_rows(), None);
    Ok(())
}
