use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a variety table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – semicolon-separated, ISO-8859-1 encoded (the export format of the source study)
/// * `.parquet`      – flat table of string / integer / float columns
/// * `.json`         – `[{ "Prime name": "...", "Kmeans cluster": 1, ... }, ...]`
///
/// A table missing a required column fails with a [`SchemaError`](super::model::SchemaError)
/// that can be recovered with `downcast_ref`.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" | "txt" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    log::info!(
        "Loaded {} varieties with {} columns from {}",
        dataset.len(),
        dataset.schema.len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Dataset cache
// ---------------------------------------------------------------------------

/// Loaded datasets keyed by canonical source path, so each file is parsed once.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn load(&mut self, path: &Path) -> Result<Arc<Dataset>> {
        let key = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        if let Some(hit) = self.entries.get(&key) {
            log::debug!("dataset cache hit for {}", key.display());
            return Ok(Arc::clone(hit));
        }
        let dataset = Arc::new(load_file(&key)?);
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// ISO-8859-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn load_csv(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path).context("reading CSV file")?;
    parse_csv(&bytes)
}

/// CSV layout: header row, `;` between fields, Latin-1 text.
/// Every cell is typed with [`Value::parse`].
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset> {
    let text = decode_latin1(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(Value::parse).collect());
    }

    Ok(Dataset::from_rows(headers, rows)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Prime name": "Chardonnay", "End of maturation": 0.42, "Kmeans cluster": 1, ... },
///   ...
/// ]
/// ```
///
/// Column order follows the keys of the first record.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let headers: Vec<String> = match records.first() {
        Some(first) => first
            .as_object()
            .context("Row 0 is not a JSON object")?
            .keys()
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        if let Some(extra) = obj.keys().find(|k| !headers.contains(k)) {
            bail!("Row {i}: unexpected key '{extra}'");
        }
        rows.push(
            headers
                .iter()
                .map(|h| obj.get(h).map_or(Value::Null, json_to_value))
                .collect(),
        );
    }

    Ok(Dataset::from_rows(headers, rows)?)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::parse(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Text(b.to_string()),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding a flat variety table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), as well as `generate_sample`.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
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
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_value(col, row))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("Row {row}"))?,
            );
        }
    }

    Ok(Dataset::from_rows(headers, rows)?)
}

// -- Parquet / Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => {
            let s = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Value::parse(s.value(row))
        }
        DataType::LargeUtf8 => Value::parse(col.as_string::<i64>().value(row)),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Value::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Value::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            float_value(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            float_value(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Value::Text(arr.value(row).to_string())
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

/// Pandas writes missing floats as NaN rather than null.
fn float_value(v: f64) -> Value {
    if v.is_nan() {
        Value::Null
    } else {
        Value::Float(v)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::model::{
        ClusterScheme, ColumnType, SchemaError, END_OF_MATURATION, KMEANS_CLUSTER, PRIME_NAME,
    };

    const HEADER: &str =
        "Prime name;Species;Parent 1;Parent 2;End of maturation;Berry weight;Kmeans cluster;Ward cluster\n";

    fn latin1(text: &str) -> Vec<u8> {
        text.chars().map(|c| c as u32 as u8).collect()
    }

    fn sample_csv() -> String {
        format!(
            "{HEADER}\
             Müller-Thurgau;V. vinifera;Riesling;Madeleine Royale;0,31;0.52;1;2\n\
             Chasselas;V. vinifera;;;0.12;;2;2\n\
             Pinot noir;V. vinifera;;;0.45;0.80;1;1\n"
        )
    }

    #[test]
    fn decodes_latin1_bytes() {
        assert_eq!(decode_latin1(&[0x4d, 0xfc, 0x6c]), "Mül");
    }

    #[test]
    fn parses_latin1_semicolon_csv() {
        let ds = parse_csv(&latin1(&sample_csv())).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.prime_name(0), "Müller-Thurgau");
        assert_eq!(ds.numeric(0, END_OF_MATURATION), Some(0.31));
        assert_eq!(ds.numeric(1, "Berry weight"), None);
        assert_eq!(ds.schema.column("Berry weight").unwrap().dtype, ColumnType::Numeric);
        assert_eq!(ds.schema.column("Parent 1").unwrap().dtype, ColumnType::Categorical);
        assert_eq!(ds.labels(ClusterScheme::KMeans), ["1", "2"]);
    }

    #[test]
    fn missing_columns_surface_as_schema_error() {
        let csv = "Prime name;Species\nChasselas;V. vinifera\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        match err.downcast_ref::<SchemaError>() {
            Some(SchemaError::MissingColumns(cols)) => {
                assert!(cols.contains(&KMEANS_CLUSTER.to_string()));
                assert!(!cols.contains(&PRIME_NAME.to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ragged_rows_fail() {
        let csv = format!("{HEADER}Chasselas;V. vinifera\n");
        assert!(parse_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn parses_records_json() {
        let json = r#"[
            {"Prime name": "Chasselas", "Species": "V. vinifera", "Parent 1": null,
             "Parent 2": null, "End of maturation": 0.12, "Kmeans cluster": 2, "Ward cluster": 1},
            {"Prime name": "Gamay", "Species": "V. vinifera", "Parent 1": "Pinot",
             "Parent 2": "Gouais blanc", "End of maturation": 0.3, "Kmeans cluster": 1, "Ward cluster": 1}
        ]"#;
        let ds = parse_json(json).unwrap();
        assert_eq!(ds.schema.names().next(), Some(PRIME_NAME));
        assert_eq!(ds.prime_names, ["Chasselas", "Gamay"]);
        assert_eq!(ds.cluster_label(1, ClusterScheme::KMeans), "1");
    }

    #[test]
    fn json_rows_must_share_keys() {
        let json = r#"[{"Prime name": "a"}, {"Prime name": "b", "Extra": 1}]"#;
        let err = parse_json(json).unwrap_err();
        assert!(err.to_string().contains("Extra"));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(load_file(Path::new("varieties.xlsx")).is_err());
    }

    #[test]
    fn cache_loads_each_path_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scion.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&latin1(&sample_csv())).unwrap();
        drop(file);

        let mut cache = DatasetCache::default();
        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
