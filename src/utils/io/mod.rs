//! IO utilities for subject input and match output
//!
//! Files ending in `.parquet` go through the Parquet reader and writer;
//! everything else is delimited text (comma for `.csv`, tab otherwise).

pub mod delimited;
pub mod parquet;

use std::path::Path;

use rayon::prelude::*;

use crate::algorithm::matching::candidate::SubjectRecord;
use crate::algorithm::matching::extraction::{ColumnSpec, records_from_batch, records_to_batch};
use crate::algorithm::matching::match_set::MatchRecord;
use crate::error::Result;

/// On-disk layout of a record file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Apache Parquet
    Parquet,
    /// Delimited text with a header row
    Delimited,
}

impl RecordFormat {
    /// Pick the format from the file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::Delimited,
        }
    }
}

/// Read every subject record from a file
pub fn read_records(path: &Path, columns: &ColumnSpec) -> Result<Vec<SubjectRecord>> {
    let batches = match RecordFormat::from_path(path) {
        RecordFormat::Parquet => {
            let mut names = vec![columns.id.as_str(), columns.group.as_str()];
            names.extend(columns.scores.iter().map(String::as_str));
            parquet::read_parquet(path, &names)?
        }
        RecordFormat::Delimited => delimited::read_delimited(path)?,
    };

    let offsets: Vec<usize> = batches
        .iter()
        .scan(0, |seen, batch| {
            let offset = *seen;
            *seen += batch.num_rows();
            Some(offset)
        })
        .collect();

    let chunks = batches
        .par_iter()
        .zip(offsets)
        .map(|(batch, offset)| records_from_batch(batch, columns, offset))
        .collect::<Result<Vec<_>>>()?;
    Ok(chunks.into_iter().flatten().collect())
}

/// Write match output rows to a file
pub fn write_records(
    path: &Path,
    records: &[MatchRecord],
    dimensions: usize,
    with_info: bool,
) -> Result<()> {
    let batch = records_to_batch(records, dimensions, with_info)?;
    match RecordFormat::from_path(path) {
        RecordFormat::Parquet => parquet::write_parquet(path, &batch),
        RecordFormat::Delimited => delimited::write_delimited(path, &batch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RecordFormat::from_path(Path::new("a.parquet")), RecordFormat::Parquet);
        assert_eq!(RecordFormat::from_path(Path::new("a.PARQUET")), RecordFormat::Parquet);
        assert_eq!(RecordFormat::from_path(Path::new("a.tsv")), RecordFormat::Delimited);
        assert_eq!(delimited::delimiter_for(Path::new("a.csv")), b',');
        assert_eq!(delimited::delimiter_for(Path::new("a.txt")), b'\t');
    }
}
