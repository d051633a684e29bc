use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{CurveKind, DataTable};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a sweep table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – `# Key: Value` attribute block, header row, numeric rows
/// * `.parquet`      – numeric columns, attributes in the key/value metadata
pub fn load_file(path: &Path) -> Result<DataTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// A table together with the measurement family it belongs to.
#[derive(Debug, Clone)]
pub struct Curve {
    pub kind: CurveKind,
    pub table: DataTable,
}

/// Load a table and classify it by its `Type` attribute.
pub fn load_curve(path: &Path) -> Result<Curve> {
    let table = load_file(path)?;
    let kind = match table.curve_kind() {
        Some(kind) => kind.with_context(|| format!("{}: bad Type attribute", path.display()))?,
        None => bail!("{}: missing 'Type' attribute", path.display()),
    };
    Ok(Curve { kind, table })
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Layout:
///
/// ```text
/// # Type: transfer
/// # Length: 2e-05
/// Set-SD-voltage,Set-SG-voltage,SD current
/// -60,0,-1.2e-09
/// ...
/// ```
///
/// Blank lines inside the attribute block are ignored; the first line that
/// is neither blank nor a `#` line is the column header.
pub fn load_csv(path: &Path) -> Result<DataTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_csv(&text).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn parse_csv(text: &str) -> Result<DataTable> {
    let mut attributes = BTreeMap::new();
    let mut body_start = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(attr) = trimmed.strip_prefix('#') {
            match attr.split_once(':') {
                Some((key, value)) => {
                    attributes.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => debug!("ignoring attribute line without ':': {trimmed}"),
            }
        } else if !trimmed.is_empty() {
            break;
        }
        body_start += line.len();
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text[body_start..].as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        bail!("CSV has no column header");
    }

    let mut table = DataTable::new(headers.clone());
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, tok)| {
                tok.parse::<f64>().with_context(|| {
                    format!("Row {row_no}, {}: '{tok}' is not a number", headers[col])
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        table
            .push_row(row)
            .with_context(|| format!("CSV row {row_no}"))?;
    }

    for (key, value) in attributes {
        table.set_attribute(key, value);
    }
    Ok(table)
}

/// Write a table in the layout [`load_csv`] reads.
pub fn save_csv(table: &DataTable, path: &Path) -> Result<()> {
    let mut out = String::new();
    for (key, value) in table.attributes() {
        out.push_str(&format!("# {key}: {value}\n"));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.column_names())
        .context("writing CSV header")?;
    for row in table.rows() {
        writer
            .write_record(row.values().iter().map(|v| v.to_string()))
            .context("writing CSV row")?;
    }
    let body = writer.into_inner().context("flushing CSV")?;
    out.push_str(std::str::from_utf8(&body).context("CSV output is not UTF-8")?);

    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Arrow keeps its own serialized schema under this metadata key.
const ARROW_SCHEMA_KEY: &str = "ARROW:schema";

/// Load a Parquet file holding one sweep.
///
/// Expected schema:
/// - numeric columns (Float64, Float32, Int32, Int64), one per quantity
/// - non-numeric columns are skipped
/// - table attributes live in the schema's key/value metadata
pub fn load_parquet(path: &Path) -> Result<DataTable> {
    let file = File::open(path)
        .with_context(|| format!("opening parquet file {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let numeric: Vec<(usize, String)> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| is_numeric(f.data_type()))
        .map(|(i, f)| (i, f.name().clone()))
        .collect();
    for field in schema.fields().iter().filter(|f| !is_numeric(f.data_type())) {
        debug!("skipping non-numeric parquet column '{}'", field.name());
    }
    if numeric.is_empty() {
        bail!("Parquet file has no numeric columns");
    }

    let mut table = DataTable::new(numeric.iter().map(|(_, name)| name.clone()));
    for (key, value) in schema.metadata() {
        if key != ARROW_SCHEMA_KEY {
            table.set_attribute(key.clone(), value.clone());
        }
    }

    let reader = builder.build().context("building parquet reader")?;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = numeric
            .iter()
            .map(|(idx, name)| {
                extract_f64_column(batch.column(*idx))
                    .with_context(|| format!("failed to read column '{name}'"))
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        for row in 0..batch.num_rows() {
            table.push_row(columns.iter().map(|c| c[row]).collect())?;
        }
    }

    Ok(table)
}

fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Float64 | DataType::Float32 | DataType::Int32 | DataType::Int64
    )
}

/// Extract a numeric column as `f64`; nulls become NaN.
fn extract_f64_column(col: &ArrayRef) -> Result<Vec<f64>> {
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        Ok(arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        Ok(arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)).collect())
    } else {
        bail!("unsupported column type {:?}", col.data_type())
    }
}

/// Write a table as a single-batch Parquet file; attributes go into the
/// schema metadata.
pub fn save_parquet(table: &DataTable, path: &Path) -> Result<()> {
    let fields: Vec<Field> = table
        .column_names()
        .iter()
        .map(|name| Field::new(name, DataType::Float64, false))
        .collect();
    let metadata: HashMap<String, String> = table
        .attributes()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let schema = Arc::new(Schema::new(fields).with_metadata(metadata));

    let arrays: Vec<ArrayRef> = (0..table.column_names().len())
        .map(|i| -> Result<ArrayRef> {
            let column = table.column_at(i)?;
            Ok(Arc::new(Float64Array::from(table.column_values(column))))
        })
        .collect::<Result<_>>()?;

    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attribute_block_and_rows() {
        let text = "# Type: transfer\n# Length : 2e-05\n\n# Note: a: b\n\
                    Set-SD-voltage, Set-SG-voltage, SD current\n\
                    -60, 0, -1e-9\n-60, -10, -2e-9\n";
        let table = parse_csv(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column_names(),
            &["Set-SD-voltage", "Set-SG-voltage", "SD current"]
        );
        assert_eq!(table.attribute("Type"), Some("transfer"));
        assert_eq!(table.attribute_f64("Length"), Some(2e-5));
        assert_eq!(table.attribute("Note"), Some("a: b"));
        let i = table.column("SD current").unwrap();
        assert_eq!(table.column_values(i), vec![-1e-9, -2e-9]);
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let text = "a,b\n1,x\n";
        let err = parse_csv(text).unwrap_err();
        assert!(format!("{err:#}").contains("'x' is not a number"));
    }

    #[test]
    fn rejects_ragged_rows() {
        let text = "a,b\n1,2\n3\n";
        assert!(parse_csv(text).is_err());
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = load_file(Path::new("sweep.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }
}
