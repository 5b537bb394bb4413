use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Well-known columns
// ---------------------------------------------------------------------------

pub const PRIME_NAME: &str = "Prime name";
pub const KMEANS_CLUSTER: &str = "Kmeans cluster";
pub const WARD_CLUSTER: &str = "Ward cluster";
pub const END_OF_MATURATION: &str = "End of maturation";
pub const SPECIES: &str = "Species";
pub const PARENT_1: &str = "Parent 1";
pub const PARENT_2: &str = "Parent 2";

/// Columns every variety table must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    PRIME_NAME,
    KMEANS_CLUSTER,
    WARD_CLUSTER,
    END_OF_MATURATION,
    SPECIES,
    PARENT_1,
    PARENT_2,
];

/// Identity and lineage columns; always categorical, whatever their cells hold.
pub const TEXT_COLUMNS: [&str; 4] = [PRIME_NAME, SPECIES, PARENT_1, PARENT_2];

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

/// The loaded table cannot be used as a variety dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("the table has a header but no data rows")]
    NoRecords,
}

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes found in the source tables.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Null first, then numbers (integers and floats compared by magnitude), then text.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        use Value::*;
        fn rank(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) | Float(_) => 1,
                Text(_) => 2,
            }
        }
        let (ra, rb) = (rank(self), rank(other));
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (a, b) => {
                // Both numeric; tie-break on variant so Eq stays consistent with Ord.
                let fa = a.as_f64().unwrap_or_default();
                let fb = b.as_f64().unwrap_or_default();
                fa.total_cmp(&fb)
                    .then_with(|| matches!(a, Float(_)).cmp(&matches!(b, Float(_))))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Null => write!(f, ""),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64` for statistics and plotting.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if !v.is_nan() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical text form used for names and cluster labels.
    ///
    /// Integral floats drop their fraction so `1`, `1.0` and `"1"` share a label.
    pub fn label(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
            Value::Float(v) => v.to_string(),
            Value::Null => String::new(),
        }
    }

    /// Raw text form for export, without the display rounding.
    pub fn export_text(&self) -> String {
        match self {
            Value::Float(v) => v.to_string(),
            other => other.label(),
        }
    }

    /// Type a raw text cell.
    ///
    /// Empty strings and `NaN` become [`Value::Null`]; a decimal comma is
    /// accepted when the cell has no dot.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        if s.contains(',') && !s.contains('.') {
            if let Ok(f) = s.replacen(',', ".", 1).parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }
        Value::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

/// Ordered column declarations, in header order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cluster schemes
// ---------------------------------------------------------------------------

/// The two upstream clusterings shipped with the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterScheme {
    #[default]
    KMeans,
    Ward,
}

impl ClusterScheme {
    pub const ALL: [ClusterScheme; 2] = [ClusterScheme::KMeans, ClusterScheme::Ward];

    pub fn column(self) -> &'static str {
        match self {
            ClusterScheme::KMeans => KMEANS_CLUSTER,
            ClusterScheme::Ward => WARD_CLUSTER,
        }
    }

    pub fn is_label_column(name: &str) -> bool {
        name == KMEANS_CLUSTER || name == WARD_CLUSTER
    }
}

impl fmt::Display for ClusterScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterScheme::KMeans => write!(f, "K-means"),
            ClusterScheme::Ward => write!(f, "Ward"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// A single cultivar; `values` is aligned with the dataset schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

static NULL: Value = Value::Null;

impl Record {
    pub fn get(&self, idx: usize) -> &Value {
        self.values.get(idx).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed lookups for the filter widgets.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<Record>,
    /// Cultivar names in order of first appearance.
    pub prime_names: Vec<String>,
    /// Sorted unique labels per cluster scheme.
    pub cluster_labels: BTreeMap<ClusterScheme, Vec<String>>,
    name_idx: usize,
    kmeans_idx: usize,
    ward_idx: usize,
}

impl Dataset {
    /// Build a dataset from a header row and raw rows.
    ///
    /// Column types are inferred: a column is numeric when every non-null
    /// cell is a number. Identity and lineage columns are always categorical.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for h in &headers {
            if !seen.insert(h.as_str()) {
                return Err(SchemaError::DuplicateColumn(h.clone()));
            }
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|req| !seen.contains(**req))
            .map(|req| req.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        if rows.is_empty() {
            return Err(SchemaError::NoRecords);
        }

        for (row, values) in rows.iter().enumerate() {
            if values.len() != headers.len() {
                return Err(SchemaError::RaggedRow {
                    row,
                    found: values.len(),
                    expected: headers.len(),
                });
            }
        }

        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let numeric = !TEXT_COLUMNS.contains(&name.as_str())
                    && rows
                        .iter()
                        .map(|r| &r[i])
                        .all(|v| v.is_null() || v.is_numeric());
                let dtype = if numeric {
                    ColumnType::Numeric
                } else {
                    ColumnType::Categorical
                };
                Column { name, dtype }
            })
            .collect();
        let schema = Schema { columns };

        // Required columns were checked above.
        let idx = |name: &str| schema.index_of(name).ok_or_else(|| {
            SchemaError::MissingColumns(vec![name.to_string()])
        });
        let name_idx = idx(PRIME_NAME)?;
        let kmeans_idx = idx(KMEANS_CLUSTER)?;
        let ward_idx = idx(WARD_CLUSTER)?;

        let records: Vec<Record> = rows.into_iter().map(|values| Record { values }).collect();

        let mut prime_names = Vec::new();
        let mut seen_names = HashSet::new();
        for rec in &records {
            let name = rec.get(name_idx).label();
            if seen_names.insert(name.clone()) {
                prime_names.push(name);
            }
        }

        let mut cluster_labels = BTreeMap::new();
        for (scheme, col) in [(ClusterScheme::KMeans, kmeans_idx), (ClusterScheme::Ward, ward_idx)] {
            let unique: BTreeSet<&Value> = records
                .iter()
                .map(|r| r.get(col))
                .filter(|v| !v.is_null())
                .collect();
            let mut labels: Vec<String> = Vec::with_capacity(unique.len());
            for v in unique {
                let label = v.label();
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            cluster_labels.insert(scheme, labels);
        }

        Ok(Dataset {
            schema,
            records,
            prime_names,
            cluster_labels,
            name_idx,
            kmeans_idx,
            ward_idx,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn prime_name(&self, row: usize) -> String {
        self.records[row].get(self.name_idx).label()
    }

    pub fn cluster_label(&self, row: usize, scheme: ClusterScheme) -> String {
        let idx = match scheme {
            ClusterScheme::KMeans => self.kmeans_idx,
            ClusterScheme::Ward => self.ward_idx,
        };
        self.records[row].get(idx).label()
    }

    pub fn labels(&self, scheme: ClusterScheme) -> &[String] {
        self.cluster_labels
            .get(&scheme)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Numeric value of `column` at `row`, or `None` for nulls and unknown columns.
    pub fn numeric(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.schema.index_of(column)?;
        self.records.get(row)?.get(idx).as_f64()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn headers() -> Vec<String> {
        [
            PRIME_NAME,
            SPECIES,
            PARENT_1,
            PARENT_2,
            END_OF_MATURATION,
            "Berry weight",
            KMEANS_CLUSTER,
            WARD_CLUSTER,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub(crate) fn row(name: &str, maturation: f64, berry: f64, kmeans: i64, ward: i64) -> Vec<Value> {
        vec![
            Value::Text(name.to_string()),
            Value::Text("Vitis vinifera".to_string()),
            Value::Text("Pinot".to_string()),
            Value::Null,
            Value::Float(maturation),
            Value::Float(berry),
            Value::Integer(kmeans),
            Value::Integer(ward),
        ]
    }

    /// Four cultivars, K-means labels {1, 1, 2, 2}, Ward labels {3, 1, 1, 3}.
    pub(crate) fn sample_dataset() -> Dataset {
        Dataset::from_rows(
            headers(),
            vec![
                row("Chardonnay", 0.2, 1.0, 1, 3),
                row("Merlot", 0.4, 2.0, 1, 1),
                row("Riesling", 0.6, 3.0, 2, 1),
                row("Syrah", 0.8, 5.0, 2, 3),
            ],
        )
        .unwrap()
    }

    #[test]
    fn infers_column_types() {
        let ds = sample_dataset();
        let dtype = |n: &str| ds.schema.column(n).unwrap().dtype;
        assert_eq!(dtype(PRIME_NAME), ColumnType::Categorical);
        assert_eq!(dtype(PARENT_2), ColumnType::Categorical);
        assert_eq!(dtype(END_OF_MATURATION), ColumnType::Numeric);
        assert_eq!(dtype(KMEANS_CLUSTER), ColumnType::Numeric);
    }

    #[test]
    fn lineage_columns_stay_categorical() {
        let mut numbered = row("Gamay", 0.3, 1.0, 1, 1);
        numbered[2] = Value::Integer(7);
        let mut blank = row("Aligoté", 0.5, 2.0, 2, 2);
        blank[2] = Value::Null;
        let ds = Dataset::from_rows(headers(), vec![numbered, blank]).unwrap();
        for name in TEXT_COLUMNS {
            assert_eq!(ds.schema.column(name).unwrap().dtype, ColumnType::Categorical, "{name}");
        }

        let mut h = headers();
        h.push("Total acidity".to_string());
        let rows = (0..2)
            .map(|i| {
                let mut r = row(&format!("v{i}"), 0.1, 0.2, 1, 1);
                r.push(Value::Null);
                r
            })
            .collect();
        let ds = Dataset::from_rows(h, rows).unwrap();
        assert_eq!(ds.schema.column("Total acidity").unwrap().dtype, ColumnType::Numeric);
    }

    #[test]
    fn collects_names_and_sorted_labels() {
        let ds = sample_dataset();
        assert_eq!(ds.prime_names, vec!["Chardonnay", "Merlot", "Riesling", "Syrah"]);
        assert_eq!(ds.labels(ClusterScheme::KMeans), ["1", "2"]);
        assert_eq!(ds.labels(ClusterScheme::Ward), ["1", "3"]);
        assert_eq!(ds.cluster_label(3, ClusterScheme::Ward), "3");
    }

    #[test]
    fn numeric_labels_sort_by_value() {
        let rows = (0..12)
            .map(|i| row(&format!("v{i}"), 0.1, 0.1, 11 - i, 0))
            .collect();
        let ds = Dataset::from_rows(headers(), rows).unwrap();
        let labels = ds.labels(ClusterScheme::KMeans);
        assert_eq!(labels.first().map(String::as_str), Some("0"));
        assert_eq!(labels.last().map(String::as_str), Some("11"));
        assert_eq!(labels[2], "2");
    }

    #[test]
    fn reports_every_missing_column() {
        let err = Dataset::from_rows(vec![PRIME_NAME.to_string()], vec![]).unwrap_err();
        match err {
            SchemaError::MissingColumns(cols) => {
                assert_eq!(cols.len(), REQUIRED_COLUMNS.len() - 1);
                assert!(cols.contains(&KMEANS_CLUSTER.to_string()));
                assert!(!cols.contains(&PRIME_NAME.to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicates_and_empty_tables() {
        let mut dup = headers();
        dup.push(SPECIES.to_string());
        assert_eq!(
            Dataset::from_rows(dup, vec![]).unwrap_err(),
            SchemaError::DuplicateColumn(SPECIES.to_string())
        );
        assert_eq!(
            Dataset::from_rows(headers(), vec![]).unwrap_err(),
            SchemaError::NoRecords
        );
    }

    #[test]
    fn parses_cells() {
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("NaN"), Value::Null);
        assert_eq!(Value::parse(" 42 "), Value::Integer(42));
        assert_eq!(Value::parse("0.25"), Value::Float(0.25));
        assert_eq!(Value::parse("0,25"), Value::Float(0.25));
        assert_eq!(Value::parse("Müller-Thurgau"), Value::Text("Müller-Thurgau".into()));
        assert_eq!(Value::parse("1,234.5"), Value::Text("1,234.5".into()));
    }

    #[test]
    fn labels_are_canonical() {
        assert_eq!(Value::Integer(1).label(), "1");
        assert_eq!(Value::Float(1.0).label(), "1");
        assert_eq!(Value::Text("1".into()).label(), "1");
        assert_eq!(Value::Float(0.5).label(), "0.5");
    }
}
