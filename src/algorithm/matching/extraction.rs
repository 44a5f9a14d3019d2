//! Conversion between Arrow record batches and matching records
//!
//! Input batches carry a patient id, a group indicator and one score column
//! per dimension. Id and group columns of any castable type are read as
//! strings; score columns are cast to `Float64`, so numeric text is accepted.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::algorithm::matching::candidate::SubjectRecord;
use crate::algorithm::matching::match_set::MatchRecord;
use crate::error::{MatchError, Result};

/// Default patient id column
pub const ID_COLUMN: &str = "patient_id";

/// Default group indicator column
pub const GROUP_COLUMN: &str = "group_indicator";

/// Score column names for the given number of dimensions
///
/// A single score is called `ps`; several are `ps_1`, `ps_2`, ...
#[must_use]
pub fn score_columns(dimensions: usize) -> Vec<String> {
    if dimensions == 1 {
        vec!["ps".to_string()]
    } else {
        (1..=dimensions).map(|n| format!("ps_{n}")).collect()
    }
}

/// Names of the input columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Patient id column
    pub id: String,
    /// Group indicator column
    pub group: String,
    /// Score columns in dimension order
    pub scores: Vec<String>,
}

impl ColumnSpec {
    /// Default column names for a run with `dimensions` scores
    #[must_use]
    pub fn for_dimensions(dimensions: usize) -> Self {
        Self {
            id: ID_COLUMN.to_string(),
            group: GROUP_COLUMN.to_string(),
            scores: score_columns(dimensions),
        }
    }

    /// Number of score dimensions
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.scores.len()
    }
}

fn column_as(batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| MatchError::parse("<header>", format!("column '{name}' not found")))?;
    Ok(cast(batch.column(idx), to)?)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| MatchError::parse("<header>", format!("column '{name}' has an unexpected type")))
}

/// Extract subject records from a record batch
///
/// Nulls and non-numeric scores are parse errors naming the offending
/// record. `row_offset` numbers rows across several batches in messages.
pub fn records_from_batch(
    batch: &RecordBatch,
    columns: &ColumnSpec,
    row_offset: usize,
) -> Result<Vec<SubjectRecord>> {
    let ids = column_as(batch, &columns.id, &DataType::Utf8)?;
    let ids = downcast::<StringArray>(&ids, &columns.id)?;
    let groups = column_as(batch, &columns.group, &DataType::Utf8)?;
    let groups = downcast::<StringArray>(&groups, &columns.group)?;

    let score_arrays = columns
        .scores
        .iter()
        .map(|name| column_as(batch, name, &DataType::Float64))
        .collect::<Result<Vec<_>>>()?;
    let scores = score_arrays
        .iter()
        .zip(&columns.scores)
        .map(|(array, name)| downcast::<Float64Array>(array, name))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if ids.is_null(row) || ids.value(row).trim().is_empty() {
            return Err(MatchError::parse(
                format!("<row {}>", row_offset + row + 1),
                "record has no patient id",
            ));
        }
        let id = ids.value(row).trim();
        if groups.is_null(row) {
            return Err(MatchError::parse(id, "missing group indicator"));
        }

        let values = scores
            .iter()
            .zip(&columns.scores)
            .map(|(array, name)| {
                if array.is_null(row) {
                    Err(MatchError::parse(id, format!("missing or non-numeric value in '{name}'")))
                } else {
                    Ok(array.value(row))
                }
            })
            .collect::<Result<Vec<f64>>>()?;

        records.push(SubjectRecord::new(id, groups.value(row).trim(), values));
    }
    Ok(records)
}

/// Arrow schema of the output rows
#[must_use]
pub fn output_schema(dimensions: usize, with_info: bool) -> Schema {
    let mut fields = vec![
        Field::new("set_number", DataType::UInt64, false),
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(GROUP_COLUMN, DataType::Utf8, false),
    ];
    fields.extend(
        score_columns(dimensions)
            .into_iter()
            .map(|name| Field::new(name, DataType::Float64, false)),
    );
    fields.push(Field::new("match_distance", DataType::Float64, false));
    if with_info {
        fields.push(Field::new("match_info", DataType::Utf8, true));
    }
    Schema::new(fields)
}

/// Build one record batch from output rows
pub fn records_to_batch(records: &[MatchRecord], dimensions: usize, with_info: bool) -> Result<RecordBatch> {
    let schema = Arc::new(output_schema(dimensions, with_info));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.set_number as u64),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.patient_id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.group.as_str()),
        )),
    ];
    for axis in 0..dimensions {
        columns.push(Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.scores.get(axis).copied().unwrap_or(f64::NAN)),
        )));
    }
    columns.push(Arc::new(Float64Array::from_iter_values(
        records.iter().map(|r| r.distance),
    )));
    if with_info {
        columns.push(Arc::new(
            records.iter().map(|r| r.info.as_deref()).collect::<StringArray>(),
        ));
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;

    fn input_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("patient_id", DataType::Utf8, true),
            Field::new("group_indicator", DataType::Int64, true),
            Field::new("ps", DataType::Utf8, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["p1", "p2"])),
                Arc::new(Int64Array::from(vec![1, 0])),
                Arc::new(StringArray::from(vec!["0.25", "0.5"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_score_column_names() {
        assert_eq!(score_columns(1), vec!["ps"]);
        assert_eq!(score_columns(2), vec!["ps_1", "ps_2"]);
    }

    #[test]
    fn test_records_from_batch_casts_columns() {
        let records = records_from_batch(&input_batch(), &ColumnSpec::for_dimensions(1), 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], SubjectRecord::new("p1", "1", vec![0.25]));
        assert_eq!(records[1].group, "0");
    }

    #[test]
    fn test_bad_score_names_the_record() {
        let schema = Schema::new(vec![
            Field::new("patient_id", DataType::Utf8, true),
            Field::new("group_indicator", DataType::Utf8, true),
            Field::new("ps", DataType::Utf8, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["p1", "p2"])),
                Arc::new(StringArray::from(vec!["1", "0"])),
                Arc::new(StringArray::from(vec!["0.25", "abc"])),
            ],
        )
        .unwrap();

        let err = records_from_batch(&batch, &ColumnSpec::for_dimensions(1), 0).unwrap_err();
        assert!(matches!(err, MatchError::Parse { ref record, .. } if record == "p2"));
    }

    #[test]
    fn test_missing_column() {
        let err = records_from_batch(&input_batch(), &ColumnSpec::for_dimensions(2), 0).unwrap_err();
        assert!(err.to_string().contains("ps_1"));
    }

    #[test]
    fn test_records_to_batch_layout() {
        let records = vec![
            MatchRecord {
                set_number: 1,
                patient_id: "t".to_string(),
                group: "1".to_string(),
                scores: vec![0.3, 0.4],
                distance: 0.01,
                info: Some("nearest-neighbor".to_string()),
            },
            MatchRecord {
                set_number: 1,
                patient_id: "r".to_string(),
                group: "0".to_string(),
                scores: vec![0.31, 0.4],
                distance: 0.01,
                info: None,
            },
        ];
        let batch = records_to_batch(&records, 2, true).unwrap();
        let names: Vec<String> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(
            names,
            vec!["set_number", "patient_id", "group_indicator", "ps_1", "ps_2", "match_distance", "match_info"]
        );
        assert_eq!(batch.num_rows(), 2);
        assert!(batch.column(6).is_null(1));

        let without = records_to_batch(&records, 2, false).unwrap();
        assert_eq!(without.num_columns(), 6);
    }
}
