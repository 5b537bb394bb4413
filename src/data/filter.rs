use std::collections::BTreeSet;
use std::sync::Arc;

use super::model::{ClusterScheme, ColumnType, Dataset, Schema};

// ---------------------------------------------------------------------------
// Filter selection: what the user picked in the side panel
// ---------------------------------------------------------------------------

/// A cluster filter: either the "All" sentinel or one concrete label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ClusterChoice {
    #[default]
    All,
    Label(String),
}

impl ClusterChoice {
    fn admits(&self, label: &str) -> bool {
        match self {
            ClusterChoice::All => true,
            ClusterChoice::Label(wanted) => wanted == label,
        }
    }
}

/// The full filter state. The default selection restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    /// Chosen cultivar names; empty means "no restriction".
    pub names: BTreeSet<String>,
    pub kmeans: ClusterChoice,
    pub ward: ClusterChoice,
}

impl FilterSelection {
    pub fn cluster(&self, scheme: ClusterScheme) -> &ClusterChoice {
        match scheme {
            ClusterScheme::KMeans => &self.kmeans,
            ClusterScheme::Ward => &self.ward,
        }
    }

    pub fn cluster_mut(&mut self, scheme: ClusterScheme) -> &mut ClusterChoice {
        match scheme {
            ClusterScheme::KMeans => &mut self.kmeans,
            ClusterScheme::Ward => &mut self.ward,
        }
    }

    /// Whether this selection lets every row through.
    pub fn is_unrestricted(&self) -> bool {
        self.names.is_empty() && self.kmeans == ClusterChoice::All && self.ward == ClusterChoice::All
    }

    /// Row predicate: conjunction of name membership and both cluster choices.
    pub fn matches(&self, dataset: &Dataset, row: usize) -> bool {
        (self.names.is_empty() || self.names.contains(&dataset.prime_name(row)))
            && self
                .kmeans
                .admits(&dataset.cluster_label(row, ClusterScheme::KMeans))
            && self
                .ward
                .admits(&dataset.cluster_label(row, ClusterScheme::Ward))
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// The rows of a dataset that pass a selection, in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView {
    dataset: Arc<Dataset>,
    rows: Vec<usize>,
    numeric_columns: Vec<String>,
}

impl FilteredView {
    /// A view over every row.
    pub fn all(dataset: Arc<Dataset>) -> Self {
        let rows = (0..dataset.len()).collect();
        let numeric_columns = eligible_numeric_columns(&dataset.schema);
        Self {
            dataset,
            rows,
            numeric_columns,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Indices into `dataset().records`, ascending.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Columns eligible for charting and statistics.
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No rows match; an expected state, not an error.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Apply `selection` on top of this view.
    pub fn refine(&self, selection: &FilterSelection) -> Self {
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|&row| selection.matches(&self.dataset, row))
            .collect();
        Self {
            dataset: Arc::clone(&self.dataset),
            rows,
            numeric_columns: self.numeric_columns.clone(),
        }
    }

    /// Split the view by cluster label, labels in sorted order.
    ///
    /// Labels with no rows in this view are left out.
    pub fn group_by(&self, scheme: ClusterScheme) -> Vec<(String, FilteredView)> {
        self.dataset
            .labels(scheme)
            .iter()
            .filter_map(|label| {
                let mut selection = FilterSelection::default();
                *selection.cluster_mut(scheme) = ClusterChoice::Label(label.clone());
                let group = self.refine(&selection);
                (!group.is_empty()).then(|| (label.clone(), group))
            })
            .collect()
    }

    /// Non-null values of `column` over the view's rows.
    pub fn column_values(&self, column: &str) -> Vec<f64> {
        let Some(idx) = self.dataset.schema.index_of(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|&row| self.dataset.records[row].get(idx).as_f64())
            .collect()
    }
}

/// Return the view of `dataset` selected by `selection`.
pub fn apply_filter(dataset: &Arc<Dataset>, selection: &FilterSelection) -> FilteredView {
    let view = FilteredView::all(Arc::clone(dataset));
    if selection.is_unrestricted() {
        return view;
    }
    let view = view.refine(selection);
    log::debug!(
        "filter kept {}/{} rows ({} names, kmeans {:?}, ward {:?})",
        view.len(),
        dataset.len(),
        selection.names.len(),
        selection.kmeans,
        selection.ward
    );
    view
}

/// Numeric columns other than the cluster labels, in schema order.
pub fn eligible_numeric_columns(schema: &Schema) -> Vec<String> {
    schema
        .columns
        .iter()
        .filter(|c| c.dtype == ColumnType::Numeric && !ClusterScheme::is_label_column(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_dataset;
    use crate::data::model::{END_OF_MATURATION, KMEANS_CLUSTER, PARENT_2, WARD_CLUSTER};

    fn dataset() -> Arc<Dataset> {
        Arc::new(sample_dataset())
    }

    fn names(view: &FilteredView) -> Vec<String> {
        view.rows()
            .iter()
            .map(|&r| view.dataset().prime_name(r))
            .collect()
    }

    #[test]
    fn unrestricted_selection_returns_everything() {
        let ds = dataset();
        let view = apply_filter(&ds, &FilterSelection::default());
        assert_eq!(view.rows(), &[0, 1, 2, 3]);
        assert!(!view.is_empty());
    }

    #[test]
    fn kmeans_filter_keeps_matching_rows_in_order() {
        let ds = dataset();
        let selection = FilterSelection {
            kmeans: ClusterChoice::Label("1".into()),
            ..Default::default()
        };
        let view = apply_filter(&ds, &selection);
        assert_eq!(names(&view), ["Chardonnay", "Merlot"]);
    }

    #[test]
    fn predicates_are_conjoined() {
        let ds = dataset();
        let selection = FilterSelection {
            names: ["Merlot", "Riesling", "Syrah"].iter().map(|s| s.to_string()).collect(),
            kmeans: ClusterChoice::Label("2".into()),
            ward: ClusterChoice::Label("1".into()),
        };
        assert_eq!(names(&apply_filter(&ds, &selection)), ["Riesling"]);
    }

    #[test]
    fn unknown_name_yields_empty_view() {
        let ds = dataset();
        let selection = FilterSelection {
            names: ["Nebbiolo".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let view = apply_filter(&ds, &selection);
        assert!(view.is_empty());
        assert_eq!(view.len(), 0);
        assert_eq!(view.numeric_columns().len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = dataset();
        let selection = FilterSelection {
            ward: ClusterChoice::Label("3".into()),
            ..Default::default()
        };
        let once = apply_filter(&ds, &selection);
        let twice = once.refine(&selection);
        assert_eq!(once.rows(), twice.rows());
        assert_eq!(once.rows(), &[0, 3]);
    }

    #[test]
    fn numeric_columns_exclude_labels_and_lineage() {
        let ds = dataset();
        let cols = eligible_numeric_columns(&ds.schema);
        assert_eq!(cols, [END_OF_MATURATION, "Berry weight"]);
        assert!(!cols
            .iter()
            .any(|c| c == KMEANS_CLUSTER || c == WARD_CLUSTER || c == PARENT_2));
    }

    #[test]
    fn numeric_columns_do_not_depend_on_rows() {
        let ds = dataset();
        let empty = apply_filter(
            &ds,
            &FilterSelection {
                names: ["nope".to_string()].into_iter().collect(),
                ..Default::default()
            },
        );
        let full = apply_filter(&ds, &FilterSelection::default());
        assert_eq!(empty.numeric_columns(), full.numeric_columns());
    }

    #[test]
    fn groups_by_cluster_label() {
        let ds = dataset();
        let view = apply_filter(
            &ds,
            &FilterSelection {
                kmeans: ClusterChoice::Label("1".into()),
                ..Default::default()
            },
        );
        let groups = view.group_by(ClusterScheme::Ward);
        let summary: Vec<(&str, &[usize])> = groups
            .iter()
            .map(|(label, g)| (label.as_str(), g.rows()))
            .collect();
        assert_eq!(summary, vec![("1", &[1][..]), ("3", &[0][..])]);
    }

    #[test]
    fn column_values_skip_nulls() {
        let ds = dataset();
        let view = apply_filter(&ds, &FilterSelection::default());
        assert_eq!(view.column_values("Berry weight"), vec![1.0, 2.0, 3.0, 5.0]);
        assert!(view.column_values(PARENT_2).is_empty());
        assert!(view.column_values("missing").is_empty());
    }
}
