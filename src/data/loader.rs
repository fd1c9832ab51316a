use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value as JsonValue};

use super::model::PointRecord;
use crate::error::InputError;

/// Positional column names, in file order.
const COLUMNS: [&str; 5] = ["objectID", "streamID", "longitude", "latitude", "elevation"];

/// Accepted JSON keys per column, output spelling first.
const JSON_KEYS: [[&str; 2]; 5] = [
    ["ObjectID", "objectID"],
    ["StreamID", "streamID"],
    ["Long", "longitude"],
    ["Lat", "latitude"],
    ["Elevation", "elevation"],
];

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_FLOAT_ID: f64 = 9_007_199_254_740_992.0;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the point table of one (site, category) pair.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, then `objectID, streamID, longitude, latitude, elevation`
/// * `.json`    – `[{ "ObjectID": 1, "StreamID": 4, "Long": .., "Lat": .., "Elevation": .. }, ...]`
/// * `.parquet` – first five columns in the CSV order, integer or float typed
///
/// Every malformed cell is rejected with the file, data row and column.
pub fn load_table(path: &Path) -> Result<Vec<PointRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => return Err(InputError::UnsupportedExtension(other.to_string()).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!("Loaded {} points from {}", records.len(), path.display());
    Ok(records)
}

// ---------------------------------------------------------------------------
// Cell validation shared by every format
// ---------------------------------------------------------------------------

/// A numeric cell as written in the source, before column typing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Int(i64),
    Float(f64),
}

/// Builds [`PointRecord`]s from raw cells, tagging failures with their origin.
struct RowParser {
    file: PathBuf,
}

impl RowParser {
    fn new(path: &Path) -> Self {
        Self {
            file: path.to_path_buf(),
        }
    }

    fn invalid(&self, row: usize, col: usize, reason: impl Into<String>) -> InputError {
        InputError::InvalidValue {
            file: self.file.clone(),
            row,
            column: COLUMNS[col],
            reason: reason.into(),
        }
    }

    /// Identifiers may arrive as integral floats (`12.0`) from spreadsheet exports;
    /// those are accepted only while the float still holds the integer exactly.
    fn id(&self, cell: Cell, row: usize, col: usize) -> Result<i64, InputError> {
        match cell {
            Cell::Int(value) => Ok(value),
            Cell::Float(value) if !value.is_finite() || value.fract() != 0.0 => {
                Err(self.invalid(row, col, format!("{value} is not an integer identifier")))
            }
            Cell::Float(value) if value.abs() > MAX_EXACT_FLOAT_ID => Err(self.invalid(
                row,
                col,
                format!("{value} is too large to be an exact integer identifier"),
            )),
            Cell::Float(value) => Ok(value as i64),
        }
    }

    fn number(&self, cell: Cell, row: usize, col: usize) -> Result<f64, InputError> {
        let value = match cell {
            Cell::Int(value) => value as f64,
            Cell::Float(value) => value,
        };
        if !value.is_finite() {
            return Err(self.invalid(row, col, format!("{value} is not a finite number")));
        }
        Ok(value)
    }

    /// Integers are kept exact; anything else must parse as a float.
    fn parse_cell(&self, cell: &str, row: usize, col: usize) -> Result<Cell, InputError> {
        if cell.is_empty() {
            return Err(self.invalid(row, col, "empty cell"));
        }
        if let Ok(value) = cell.parse::<i64>() {
            return Ok(Cell::Int(value));
        }
        cell.parse::<f64>()
            .map(Cell::Float)
            .map_err(|_| self.invalid(row, col, format!("'{cell}' is not a number")))
    }

    /// Assemble a record from five numeric cells in column order.
    fn record(&self, cells: [Cell; 5], row: usize) -> Result<PointRecord, InputError> {
        let object_id = self.id(cells[0], row, 0)?;
        if object_id < 1 {
            return Err(self.invalid(row, 0, format!("object ID {object_id} must be positive")));
        }
        Ok(PointRecord {
            object_id,
            stream_id: self.id(cells[1], row, 1)?,
            longitude: self.number(cells[2], row, 2)?,
            latitude: self.number(cells[3], row, 3)?,
            elevation: self.number(cells[4], row, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: a header row (names are not checked), then the five
/// positional columns. Extra trailing columns are ignored.
fn load_csv(path: &Path) -> Result<Vec<PointRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    let parser = RowParser::new(path);

    let headers = reader.headers().context("reading CSV headers")?;
    debug!("{}: header {:?}", path.display(), headers);

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = result.with_context(|| format!("CSV row {row}"))?;
        if record.len() < COLUMNS.len() {
            return Err(parser
                .invalid(row, record.len(), format!("row has only {} columns", record.len()))
                .into());
        }

        let mut cells = [Cell::Int(0); 5];
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = parser.parse_cell(&record[col], row, col)?;
        }
        records.push(parser.record(cells, row)?);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, as `df.to_json(orient='records')` writes):
///
/// ```json
/// [
///   { "ObjectID": 1, "StreamID": 7, "Long": -105.2, "Lat": 39.9, "Elevation": 1712.0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<PointRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let parser = RowParser::new(path);

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, value) in rows.iter().enumerate() {
        let row = i + 1;
        let Some(obj) = value.as_object() else {
            bail!("Row {row} is not a JSON object");
        };

        let mut cells = [Cell::Int(0); 5];
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = json_cell(obj, &parser, row, col)?;
        }
        records.push(parser.record(cells, row)?);
    }

    Ok(records)
}

fn json_cell(
    obj: &Map<String, JsonValue>,
    parser: &RowParser,
    row: usize,
    col: usize,
) -> Result<Cell, InputError> {
    let value = JSON_KEYS[col]
        .iter()
        .find_map(|key| obj.get(*key))
        .ok_or_else(|| parser.invalid(row, col, "missing field"))?;

    match value {
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Cell::Int(i)),
            (None, Some(f)) => Ok(Cell::Float(f)),
            (None, None) => Err(parser.invalid(row, col, format!("{n} is out of range"))),
        },
        JsonValue::String(s) => parser.parse_cell(s.trim(), row, col),
        JsonValue::Null => Err(parser.invalid(row, col, "null value")),
        other => Err(parser.invalid(row, col, format!("{other} is not a number"))),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet point table.
///
/// The first five columns are read positionally; each may be Int32, Int64,
/// Float32 or Float64. Nulls are rejected like empty CSV cells.
fn load_parquet(path: &Path) -> Result<Vec<PointRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;
    let parser = RowParser::new(path);

    let mut records = Vec::new();
    let mut row = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        if batch.num_columns() < COLUMNS.len() {
            bail!(
                "Parquet file has {} columns, expected at least {}",
                batch.num_columns(),
                COLUMNS.len()
            );
        }

        for batch_row in 0..batch.num_rows() {
            row += 1;
            let mut cells = [Cell::Int(0); 5];
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = numeric_value(batch.column(col), batch_row)
                    .map_err(|reason| parser.invalid(row, col, reason))?;
            }
            records.push(parser.record(cells, row)?);
        }
    }

    Ok(records)
}

/// Read one numeric cell of an Arrow column. Integer columns stay exact.
fn numeric_value(col: &Arc<dyn Array>, row: usize) -> Result<Cell, String> {
    if col.is_null(row) {
        return Err("null value".to_string());
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Cell::Int(i64::from(a.value(row)))),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| Cell::Int(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Cell::Float(f64::from(a.value(row)))),
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| Cell::Float(a.value(row))),
        other => return Err(format!("unsupported column type {other:?}")),
    };
    value.ok_or_else(|| format!("column does not match its declared type {:?}", col.data_type()))
}
