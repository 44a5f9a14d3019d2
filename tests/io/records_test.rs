//! Reading subjects and writing matches through files

use std::fs;

use arrow::array::{Array, StringArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use psmatch::{Algorithm, ColumnSpec, MatchError, Matcher, MatchingConfig, read_records, write_records};

use crate::utils::temp_path;

const SUBJECTS: &str = "patient_id\tgroup_indicator\tps
007\t1\t0.10
008\t1\t0.50
101\t0\t0.11
102\t0\t0.49
103\t0\t0.93
";

#[test]
fn test_delimited_input_keeps_text_ids() {
    let input = temp_path("subjects.tsv");
    fs::write(&input, SUBJECTS).unwrap();
    let records = read_records(&input, &ColumnSpec::for_dimensions(1)).unwrap();
    fs::remove_file(&input).ok();

    assert_eq!(records.len(), 5);
    assert_eq!(records[0].id, "007");
    assert_eq!(records[0].group, "1");
    assert_eq!(records[4].scores, vec![0.93]);
}

#[test]
fn test_bad_score_in_file_names_the_record() {
    let input = temp_path("bad.csv");
    fs::write(&input, "patient_id,group_indicator,ps\na,1,0.2\nb,0,high\n").unwrap();
    let err = read_records(&input, &ColumnSpec::for_dimensions(1)).unwrap_err();
    fs::remove_file(&input).ok();

    assert!(matches!(err, MatchError::Parse { ref record, .. } if record == "b"));
}

#[test]
fn test_missing_input_file() {
    let err = read_records(&temp_path("absent.tsv"), &ColumnSpec::for_dimensions(1)).unwrap_err();
    assert!(matches!(err, MatchError::Io { .. }));
}

#[test]
fn test_match_output_round_trip() {
    let input = temp_path("round_trip.tsv");
    fs::write(&input, SUBJECTS).unwrap();
    let records = read_records(&input, &ColumnSpec::for_dimensions(1)).unwrap();
    fs::remove_file(&input).ok();

    let result = Matcher::new(
        MatchingConfig::builder()
            .algorithm(Algorithm::NearestNeighbor)
            .build(),
    )
    .perform_matching(records)
    .unwrap();
    assert_eq!(result.set_count(), 2);

    // parquet output carries every column and row
    let parquet_out = temp_path("matches.parquet");
    write_records(&parquet_out, &result.records, 1, true).unwrap();
    let file = fs::File::open(&parquet_out).unwrap();
    let batches: Vec<_> = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    fs::remove_file(&parquet_out).ok();

    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 4);
    assert_eq!(batch.num_columns(), 6);
    let ids = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(ids.value(0), "007");
    assert_eq!(ids.value(1), "101");

    // delimited output has a header and one line per row
    let csv_out = temp_path("matches.csv");
    write_records(&csv_out, &result.records, 1, true).unwrap();
    let text = fs::read_to_string(&csv_out).unwrap();
    fs::remove_file(&csv_out).ok();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "set_number,patient_id,group_indicator,ps,match_distance,match_info"
    );
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("1,007,1,0.1,"));
}
