use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use super::model::{Category, Column, RecordTable, TestRecord};

/// Widest auto-sized spreadsheet column, in characters.
const MAX_COLUMN_WIDTH: usize = 50;

// ---------------------------------------------------------------------------
// Cell rendering shared by every format
// ---------------------------------------------------------------------------

/// Either text or a number, as a column value of one record.
enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(v) => v.to_string(),
        }
    }
}

fn field(record: &TestRecord, column: Column) -> Value {
    match column {
        Column::Id => Value::Text(record.id.clone()),
        Column::Model => Value::Text(record.model.label().to_string()),
        Column::TestDate => Value::Text(record.test_date.format("%Y-%m-%d").to_string()),
        Column::TestType => Value::Text(record.test_type.label().to_string()),
        Column::Efficiency => Value::Number(record.efficiency_pct),
        Column::TemperatureRise => Value::Number(record.temperature_rise_c),
        Column::TotalLosses => Value::Number(record.total_losses_kw),
        Column::Status => Value::Text(record.status.label().to_string()),
        optional => Value::Number(record.optional_value(optional).unwrap_or(f64::NAN)),
    }
}

/// Text form of one cell, as shown in tables and written to CSV.
pub fn cell_text(record: &TestRecord, column: Column) -> String {
    field(record, column).render()
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

/// Serialize the table as UTF-8 CSV with a header row.
pub fn to_csv_bytes(table: &RecordTable) -> Result<Vec<u8>> {
    let columns = table.schema().columns();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns.iter().map(|c| c.name()))
        .context("writing CSV header")?;
    for record in table.records() {
        writer
            .write_record(columns.iter().map(|c| cell_text(record, *c)))
            .with_context(|| format!("writing CSV row {}", record.id))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV: {e}"))
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

/// Serialize the table as an xlsx workbook with a formatted header row and
/// auto-sized columns.
pub fn to_xlsx_bytes(table: &RecordTable, sheet_name: &str) -> Result<Vec<u8>> {
    let columns = table.schema().columns();
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Top)
        .set_background_color(Color::RGB(0xD7E4BC))
        .set_border(FormatBorder::Thin);

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name).context("naming worksheet")?;

        for (col, column) in columns.iter().enumerate() {
            let col = col as u16;
            worksheet
                .write_string_with_format(0, col, column.name(), &header_format)
                .context("writing header")?;

            let mut widest = column.name().len();
            for (row, record) in table.records().iter().enumerate() {
                let row = row as u32 + 1;
                let value = field(record, *column);
                widest = widest.max(value.render().chars().count());
                let written = match value {
                    Value::Text(s) => worksheet.write_string(row, col, s),
                    Value::Number(v) => worksheet.write_number(row, col, v),
                };
                written.with_context(|| format!("writing cell ({row}, {col})"))?;
            }
            worksheet
                .set_column_width(col, (widest + 2).min(MAX_COLUMN_WIDTH) as f64)
                .context("sizing column")?;
        }
    }

    workbook.save_to_buffer().context("serializing workbook")
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Serialize the table as Parquet. Dates are stored as `YYYY-MM-DD` text.
pub fn to_parquet_bytes(table: &RecordTable) -> Result<Vec<u8>> {
    let columns = table.schema().columns();
    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());

    for column in &columns {
        let values: Vec<Value> = table.records().iter().map(|r| field(r, *column)).collect();
        if !column.is_numeric() {
            fields.push(Field::new(column.name(), DataType::Utf8, false));
            let texts: Vec<String> = values.iter().map(Value::render).collect();
            arrays.push(Arc::new(StringArray::from(texts)));
        } else {
            fields.push(Field::new(column.name(), DataType::Float64, false));
            let numbers: Vec<f64> = values
                .iter()
                .map(|v| match v {
                    Value::Number(n) => *n,
                    Value::Text(_) => f64::NAN,
                })
                .collect();
            arrays.push(Arc::new(Float64Array::from(numbers)));
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(buffer)
}
