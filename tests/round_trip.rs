use std::path::Path;

use chrono::NaiveDate;
use tempfile::tempdir;

use transformer_dashboard::config::Thresholds;
use transformer_dashboard::data::filter::{self, FilterSpec, FilterUniverse};
use transformer_dashboard::data::model::{RecordTable, TestRecord, TransformerModel};
use transformer_dashboard::data::{export, generator, loader};

fn sample(n: usize) -> RecordTable {
    let anchor = NaiveDate::from_ymd_opt(2025, 6, 29).unwrap();
    generator::generate(n, 42, anchor, Thresholds::default()).unwrap()
}

fn write(dir: &Path, name: &str, bytes: Vec<u8>) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn csv_export_reloads_to_the_same_records() {
    let table = sample(200);
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "tests.csv", export::to_csv_bytes(&table).unwrap());

    let loaded = loader::load_file(&path, &Thresholds::default()).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.table, table);
}

#[test]
fn filtered_subset_round_trips_through_csv() {
    let table = sample(300);
    let universe = FilterUniverse::from_table(&table).unwrap();
    let mut spec = FilterSpec::full(&universe);
    spec.models.remove(&TransformerModel::Tsea1000);
    let subset = filter::apply(&table, &spec);
    assert!(!subset.is_empty() && subset.len() < table.len());

    let dir = tempdir().unwrap();
    let path = write(dir.path(), "subset.csv", export::to_csv_bytes(&subset).unwrap());
    let loaded = loader::load_file(&path, &Thresholds::default()).unwrap();
    assert_eq!(loaded.table, subset);
}

#[test]
fn xlsx_export_reloads_to_the_same_records() {
    let table = sample(50);
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "tests.xlsx",
        export::to_xlsx_bytes(&table, "Test_Data").unwrap(),
    );

    let loaded = loader::load_file(&path, &Thresholds::default()).unwrap();
    assert_eq!(loaded.table, table);
}

#[test]
fn parquet_export_reloads_to_the_same_records() {
    let table = sample(50);
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "tests.parquet", export::to_parquet_bytes(&table).unwrap());

    let loaded = loader::load_file(&path, &Thresholds::default()).unwrap();
    assert_eq!(loaded.table, table);
}

#[test]
fn loading_rederives_status_with_the_given_thresholds() {
    let table = sample(100);
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "tests.csv", export::to_csv_bytes(&table).unwrap());

    let strict = Thresholds {
        efficiency_min: 99.5,
        ..Thresholds::default()
    };
    let loaded = loader::load_file(&path, &strict).unwrap();
    for r in loaded.table.records() {
        if r.efficiency_pct < 99.5 {
            assert_eq!(r.status.to_string(), "Rejected", "{}", r.id);
        }
    }
}

/// Ids that read like numbers must come back exactly as written.
fn numeric_looking_ids() -> RecordTable {
    let ids = ["007", "1.50", "1", "1.0", "1e3"];
    let records = sample(ids.len())
        .records()
        .iter()
        .zip(ids)
        .map(|(r, id)| TestRecord {
            id: id.to_string(),
            ..r.clone()
        })
        .collect();
    RecordTable::from_records(records).unwrap()
}

#[test]
fn numeric_looking_ids_survive_every_format() {
    let table = numeric_looking_ids();
    let dir = tempdir().unwrap();
    let files = [
        write(dir.path(), "ids.csv", export::to_csv_bytes(&table).unwrap()),
        write(dir.path(), "ids.xlsx", export::to_xlsx_bytes(&table, "Test_Data").unwrap()),
        write(dir.path(), "ids.parquet", export::to_parquet_bytes(&table).unwrap()),
    ];
    for path in files {
        let loaded = loader::load_file(&path, &Thresholds::default()).unwrap();
        let ids: Vec<&str> = loaded.table.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["007", "1.50", "1", "1.0", "1e3"], "{}", path.display());
        assert_eq!(loaded.table, table);
    }
}

#[test]
fn unknown_extension_is_refused() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "tests.bin", vec![0, 1, 2]);
    let err = loader::load_file(&path, &Thresholds::default()).unwrap_err();
    assert!(err.to_string().contains("Unsupported file extension"));
}
