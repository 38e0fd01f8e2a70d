use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::cell::CellValue;
use super::model::{
    derive_status, ApprovalStatus, Category, Column, RecordTable, TableSchema, TestRecord, TestType,
    TransformerModel,
};
use crate::config::Thresholds;
use crate::error::{ColumnIssue, DashboardError};

/// Share of nulls above which a column draws a warning.
const NULL_WARNING_RATIO: f64 = 0.10;

// ---------------------------------------------------------------------------
// Loaded output
// ---------------------------------------------------------------------------

/// Header row plus typed cells, before schema checks.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// A parsed table together with the non-fatal findings of its validation.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RecordTable,
    pub warnings: Vec<ColumnIssue>,
    /// Number of columns in the source file.
    pub source_columns: usize,
}

impl LoadedTable {
    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.table.date_span()
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a test table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`                 – header row, one record per line
/// * `.xlsx` / `.xls` / `.ods` – first worksheet, header row first
/// * `.json`                – `[{ "transformer_id": ..., ... }, ...]`
/// * `.parquet`             – one scalar column per field
///
/// Statuses are re-derived against `thresholds` after parsing.
pub fn load_file(path: &Path, thresholds: &Thresholds) -> Result<LoadedTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" | "txt" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            read_csv(file)?
        }
        "xlsx" | "xlsm" | "xls" | "ods" => read_spreadsheet(path)?,
        "json" => read_json(&std::fs::read_to_string(path).context("reading JSON file")?)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    let loaded = records_from_raw(raw, thresholds)?;
    log::info!(
        "Loaded {} records from {} ({} warning(s))",
        loaded.table.len(),
        path.display(),
        loaded.warnings.len()
    );
    for w in &loaded.warnings {
        log::warn!("{w}");
    }
    Ok(loaded)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Read delimited text with a header row.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(CellValue::text).collect());
    }
    Ok(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`[{column: value, ...}, ...]`).
pub fn read_json(text: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();
    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

/// First worksheet of an xlsx/xls/ods workbook; the first row is the header.
pub fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening spreadsheet")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("spreadsheet has no worksheets")?
        .context("reading first worksheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string()).collect(),
        None => return Ok(RawTable::default()),
    };
    let rows = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();
    Ok(RawTable { headers, rows })
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::text(s),
        Data::Float(f) => CellValue::Float(*f),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| CellValue::Date(d.date()))
            .unwrap_or(CellValue::Null),
        Data::DateTimeIso(s) => CellValue::String(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), as well as by the exporter.
pub fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = (0..batch.num_columns())
                .map(|col| extract_cell(batch.column(col), row))
                .collect::<Result<Vec<_>>>()?;
            rows.push(cells);
        }
    }
    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let any = col.as_any();
    let cell = match col.data_type() {
        DataType::Utf8 => {
            let arr = any.downcast_ref::<StringArray>().context("expected StringArray")?;
            CellValue::text(arr.value(row))
        }
        DataType::LargeUtf8 => CellValue::text(col.as_string::<i64>().value(row)),
        DataType::Int32 => {
            let arr = any.downcast_ref::<Int32Array>().context("expected Int32Array")?;
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = any.downcast_ref::<Int64Array>().context("expected Int64Array")?;
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = any.downcast_ref::<Float32Array>().context("expected Float32Array")?;
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = any.downcast_ref::<Float64Array>().context("expected Float64Array")?;
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = any.downcast_ref::<BooleanArray>().context("expected BooleanArray")?;
            CellValue::Bool(arr.value(row))
        }
        DataType::Date32 => {
            let arr = any.downcast_ref::<Date32Array>().context("expected Date32Array")?;
            arr.value_as_date(row).map(CellValue::Date).unwrap_or(CellValue::Null)
        }
        other => bail!("Unsupported parquet column type {other:?}"),
    };
    Ok(cell)
}

// ---------------------------------------------------------------------------
// Schema checks
// ---------------------------------------------------------------------------

/// Turn raw cells into records.
///
/// * Missing required columns are all reported together and are fatal.
/// * A required cell that does not parse is fatal for its column.
/// * An optional column with missing or unparsable cells is dropped with a
///   warning.
/// * Columns with more than 10% nulls draw a warning.
pub fn records_from_raw(raw: RawTable, thresholds: &Thresholds) -> Result<LoadedTable> {
    if raw.rows.is_empty() {
        return Err(DashboardError::EmptyTable.into());
    }

    let position = |column: Column| raw.headers.iter().position(|h| column.matches_header(h));

    let missing: Vec<ColumnIssue> = Column::ALL
        .iter()
        .filter(|c| c.is_required() && position(**c).is_none())
        .map(|c| ColumnIssue::new(c.name(), "missing required column"))
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::SchemaViolation(missing).into());
    }

    let mut warnings = null_warnings(&raw);
    let mut errors = Vec::new();

    let cell = |row: &[CellValue], column: Column| -> CellValue {
        position(column)
            .and_then(|i| row.get(i).cloned())
            .unwrap_or(CellValue::Null)
    };

    // Required columns: collect the first bad row of every column.
    let mut parsed = Vec::with_capacity(raw.rows.len());
    for (row_no, row) in raw.rows.iter().enumerate() {
        let id = cell(row, Column::Id).as_text();
        let model = cell(row, Column::Model).as_text().and_then(|s| TransformerModel::from_label(&s));
        let test_date = cell(row, Column::TestDate).as_date();
        let test_type = cell(row, Column::TestType).as_text().and_then(|s| TestType::from_label(&s));
        let efficiency = cell(row, Column::Efficiency).as_f64();
        let temperature = cell(row, Column::TemperatureRise).as_f64();
        let losses = cell(row, Column::TotalLosses).as_f64();
        let status = cell(row, Column::Status).as_text().and_then(|s| ApprovalStatus::from_label(&s));

        let checks: [(Column, bool, &str); 8] = [
            (Column::Id, id.is_some(), "empty identifier"),
            (Column::Model, model.is_some(), "unknown transformer model"),
            (Column::TestDate, test_date.is_some(), "not a valid date"),
            (Column::TestType, test_type.is_some(), "unknown test type"),
            (Column::Efficiency, efficiency.is_some(), "not a number"),
            (Column::TemperatureRise, temperature.is_some(), "not a number"),
            (Column::TotalLosses, losses.is_some(), "not a number"),
            (Column::Status, status.is_some(), "unknown approval status"),
        ];
        for (column, ok, problem) in checks {
            if !ok && !errors.iter().any(|e: &ColumnIssue| e.column == column.name()) {
                errors.push(ColumnIssue::new(
                    column.name(),
                    format!("{problem} in row {}: '{}'", row_no + 1, cell(row, column)),
                ));
            }
        }

        if let (Some(id), Some(model), Some(test_date), Some(test_type), Some(e), Some(t), Some(l), Some(s)) =
            (id, model, test_date, test_type, efficiency, temperature, losses, status)
        {
            parsed.push(TestRecord {
                id,
                model,
                test_date,
                test_type,
                efficiency_pct: e,
                temperature_rise_c: t,
                total_losses_kw: l,
                status: s,
                primary_voltage_kv: cell(row, Column::PrimaryVoltage).as_f64(),
                secondary_voltage_kv: cell(row, Column::SecondaryVoltage).as_f64(),
                rated_power_mva: cell(row, Column::RatedPower).as_f64(),
                excitation_current_a: cell(row, Column::ExcitationCurrent).as_f64(),
            });
        }
    }
    if !errors.is_empty() {
        return Err(DashboardError::SchemaViolation(errors).into());
    }

    // Optional columns: present only when every row parsed.
    let schema = TableSchema::infer(&parsed);
    for column in Column::ALL.iter().filter(|c| !c.is_required()) {
        if position(*column).is_some() && !schema.has(*column) {
            warnings.push(ColumnIssue::new(
                column.name(),
                "optional column has missing or non-numeric values and was ignored",
            ));
        }
    }
    for record in &mut parsed {
        if !schema.has(Column::PrimaryVoltage) {
            record.primary_voltage_kv = None;
        }
        if !schema.has(Column::SecondaryVoltage) {
            record.secondary_voltage_kv = None;
        }
        if !schema.has(Column::RatedPower) {
            record.rated_power_mva = None;
        }
        if !schema.has(Column::ExcitationCurrent) {
            record.excitation_current_a = None;
        }
        record.status = derive_status(record, thresholds);
    }

    let table = RecordTable::with_schema(parsed, schema)?;
    Ok(LoadedTable {
        table,
        warnings,
        source_columns: raw.headers.len(),
    })
}

fn null_warnings(raw: &RawTable) -> Vec<ColumnIssue> {
    let total = raw.rows.len() as f64;
    raw.headers
        .iter()
        .enumerate()
        .filter_map(|(i, header)| {
            let nulls = raw
                .rows
                .iter()
                .filter(|row| row.get(i).map_or(true, CellValue::is_null))
                .count();
            let ratio = nulls as f64 / total;
            (ratio > NULL_WARNING_RATIO).then(|| {
                ColumnIssue::new(header.clone(), format!("{:.1}% null values", ratio * 100.0))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "transformer_id,model,test_date,test_type,efficiency_pct,temperature_rise_c,total_losses_kw,approval_status";

    fn load(csv_text: &str) -> Result<LoadedTable> {
        records_from_raw(read_csv(csv_text.as_bytes())?, &Thresholds::default())
    }

    fn schema_issues(err: anyhow::Error) -> Vec<ColumnIssue> {
        match err.downcast::<DashboardError>() {
            Ok(DashboardError::SchemaViolation(issues)) => issues,
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn loads_required_columns_and_derives_status() {
        let text = format!(
            "{HEADER}\nTR-1,TSEA-1000,2025-01-02,Routine Test,99.5,50.0,10.0,Approved\n\
             TR-2,TSEA-2500,2025-01-03,Type Test,97.0,50.0,10.0,Approved\n"
        );
        let loaded = load(&text).unwrap();
        let records = loaded.table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, ApprovalStatus::Approved);
        assert_eq!(records[1].status, ApprovalStatus::Rejected);
        assert_eq!(loaded.table.schema(), TableSchema::default());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn reports_every_missing_required_column() {
        let issues = schema_issues(load("transformer_id,model\nTR-1,TSEA-1000\n").unwrap_err());
        let columns: Vec<&str> = issues.iter().map(|i| i.column.as_str()).collect();
        assert_eq!(
            columns,
            vec![
                "test_date",
                "test_type",
                "efficiency_pct",
                "temperature_rise_c",
                "total_losses_kw",
                "approval_status"
            ]
        );
    }

    #[test]
    fn bad_date_is_a_validation_error() {
        let text = format!("{HEADER}\nTR-1,TSEA-1000,yesterday,Routine Test,99.5,50.0,10.0,Approved\n");
        let issues = schema_issues(load(&text).unwrap_err());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, "test_date");
        assert!(issues[0].problem.contains("yesterday"));
    }

    #[test]
    fn empty_file_is_an_empty_table() {
        let err = load(&format!("{HEADER}\n")).unwrap_err();
        assert!(matches!(err.downcast_ref::<DashboardError>(), Some(DashboardError::EmptyTable)));
    }

    #[test]
    fn legacy_headers_and_labels_are_accepted() {
        let text = "ID_Transformador,Modelo,Data_Teste,Tipo_Ensaio,Eficiencia_Percentual,Elevacao_Temperatura_C,Perdas_Totais_kW,Status_Aprovacao,Potencia_Nominal_MVA\n\
                    TR-1000,TSEA-5000,2024-07-01 10:30:00,Ensaio de Rotina,99.1,52.3,12.5,Aprovado,15.0\n";
        let loaded = load(text).unwrap();
        let r = &loaded.table.records()[0];
        assert_eq!(r.test_type, TestType::Routine);
        assert_eq!(r.status, ApprovalStatus::Approved);
        assert_eq!(r.rated_power_mva, Some(15.0));
        assert!(loaded.table.schema().rated_power);
    }

    #[test]
    fn partial_optional_column_is_dropped_with_warning() {
        let text = format!(
            "{HEADER},rated_power_mva\n\
             TR-1,TSEA-1000,2025-01-02,Routine Test,99.5,50.0,10.0,Approved,5.0\n\
             TR-2,TSEA-1000,2025-01-03,Routine Test,99.4,51.0,11.0,Approved,\n"
        );
        let loaded = load(&text).unwrap();
        assert!(!loaded.table.schema().rated_power);
        assert!(loaded.table.records().iter().all(|r| r.rated_power_mva.is_none()));
        assert!(loaded.warnings.iter().any(|w| w.column == "rated_power_mva"));
    }

    #[test]
    fn json_records_load() {
        let text = r#"[
            {"transformer_id": "TR-9", "model": "TSEA-7500", "test_date": "2025-02-01",
             "test_type": "Acceptance Test", "efficiency_pct": 99.3, "temperature_rise_c": 48,
             "total_losses_kw": 9.5, "approval_status": "Approved", "excitation_current_a": 1.1}
        ]"#;
        let loaded = records_from_raw(read_json(text).unwrap(), &Thresholds::default()).unwrap();
        let r = &loaded.table.records()[0];
        assert_eq!(r.model, TransformerModel::Tsea7500);
        assert_eq!(r.temperature_rise_c, 48.0);
        assert_eq!(r.excitation_current_a, Some(1.1));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = format!(
            "{HEADER}\nTR-1,TSEA-1000,2025-01-02,Routine Test,99.5,50.0,10.0,Approved\n\
             TR-1,TSEA-1000,2025-01-03,Routine Test,99.5,50.0,10.0,Approved\n"
        );
        let err = load(&text).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashboardError>(),
            Some(DashboardError::DuplicateId(_))
        ));
    }
}
