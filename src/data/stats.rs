use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::filter::FilteredView;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insufficiency {
    /// Fewer than two rows in the view.
    TooFewRows(usize),
    /// These columns have no spread (or fewer than two paired observations).
    ZeroVariance(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("no rows match the current filters")]
    EmptyInput,

    #[error("{} is not a numeric column", .0)]
    UnknownColumn(String),

    #[error("correlation undefined: {}", describe(.reason))]
    InsufficientData {
        reason: Insufficiency,
        /// Every entry that could still be computed.
        partial: Option<Box<CorrelationMatrix>>,
    },
}

fn describe(reason: &Insufficiency) -> String {
    match reason {
        Insufficiency::TooFewRows(n) => format!("{n} row(s), need at least 2"),
        Insufficiency::ZeroVariance(cols) => format!("no variance in {}", cols.join(", ")),
    }
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// `describe()`-style statistics of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(mut values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                p25: f64::NAN,
                p50: f64::NAN,
                p75: f64::NAN,
                max: f64::NAN,
            };
        }
        values.sort_by(f64::total_cmp);

        let (min, max) = (values[0], values[count - 1]);
        if min == max {
            return Self {
                count,
                mean: min,
                std: 0.0,
                min,
                p25: min,
                p50: min,
                p75: min,
                max,
            };
        }

        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        // count >= 2 here: a single value has min == max.
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        let std = (ss / (n - 1.0)).sqrt();

        Self {
            count,
            mean,
            std,
            min,
            p25: quantile(&values, 0.25),
            p50: quantile(&values, 0.50),
            p75: quantile(&values, 0.75),
            max,
        }
    }
}

/// Linear interpolation between order statistics of an ascending, non-empty slice.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

fn check_columns(view: &FilteredView, columns: &[String]) -> Result<(), StatsError> {
    if view.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    match columns
        .iter()
        .find(|c| !view.numeric_columns().contains(*c))
    {
        Some(unknown) => Err(StatsError::UnknownColumn(unknown.clone())),
        None => Ok(()),
    }
}

/// Summary statistics of `columns` over the rows of `view`.
///
/// The caller is expected to check [`FilteredView::is_empty`] first.
pub fn summarize(
    view: &FilteredView,
    columns: &[String],
) -> Result<BTreeMap<String, ColumnSummary>, StatsError> {
    check_columns(view, columns)?;
    Ok(columns
        .iter()
        .map(|c| (c.clone(), ColumnSummary::from_values(view.column_values(c))))
        .collect())
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pairwise Pearson coefficients. `None` marks an undefined entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// Columns whose own diagonal entry is undefined.
    pub fn undefined_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.values[*i][*i].is_none())
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn is_complete(&self) -> bool {
        self.values.iter().flatten().all(Option::is_some)
    }
}

/// Pearson coefficient over rows where both sides are present.
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    // A constant side has no variance, even when its mean rounds away from the value.
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|p| p.0 == x0) || pairs.iter().all(|p| p.1 == y0) {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        ss_x += dx * dx;
        ss_y += dy * dy;
    }

    let denom = (ss_x * ss_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Pearson correlation matrix of `columns` over the rows of `view`.
///
/// A matrix with undefined entries is returned inside
/// [`StatsError::InsufficientData`] so callers can still show the rest.
pub fn correlation_matrix(
    view: &FilteredView,
    columns: &[String],
) -> Result<CorrelationMatrix, StatsError> {
    check_columns(view, columns)?;
    if view.len() < 2 {
        return Err(StatsError::InsufficientData {
            reason: Insufficiency::TooFewRows(view.len()),
            partial: None,
        });
    }

    let dataset = view.dataset();
    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| view.rows().iter().map(|&r| dataset.numeric(r, c)).collect())
        .collect();

    let k = columns.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        // Diagonal is 1.0 exactly whenever the column has spread.
        values[i][i] = pearson(&series[i], &series[i]).map(|_| 1.0);
        for j in (i + 1)..k {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    let matrix = CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    };
    if matrix.is_complete() {
        return Ok(matrix);
    }

    let mut undefined = matrix.undefined_columns();
    if undefined.is_empty() {
        // Every column varies on its own, but some pairs share < 2 rows.
        undefined = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| matrix.values[*i].iter().any(Option::is_none))
            .map(|(_, c)| c.clone())
            .collect();
    }
    log::warn!("correlation has undefined entries for {undefined:?}");
    Err(StatsError::InsufficientData {
        reason: Insufficiency::ZeroVariance(undefined),
        partial: Some(Box::new(matrix)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
