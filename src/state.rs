use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::color::ColorMap;
use crate::data::export::{write_csv, write_summary_json};
use crate::data::filter::{apply_filter, ClusterChoice, FilterSelection, FilteredView};
use crate::data::loader::DatasetCache;
use crate::data::model::{ClusterScheme, Dataset, END_OF_MATURATION};
use crate::data::stats::{correlation_matrix, summarize, ColumnSummary, CorrelationMatrix, StatsError};

/// Central panel tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Table,
    Summary,
    Scatter,
    Box,
    Histogram,
    Parallel,
    Correlation,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Table,
        Tab::Summary,
        Tab::Scatter,
        Tab::Box,
        Tab::Histogram,
        Tab::Parallel,
        Tab::Correlation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Table => "Table",
            Tab::Summary => "Summary",
            Tab::Scatter => "Scatter",
            Tab::Box => "Box",
            Tab::Histogram => "Histogram",
            Tab::Parallel => "Parallel coordinates",
            Tab::Correlation => "Correlation",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Parsed datasets keyed by path.
    cache: DatasetCache,

    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<Arc<Dataset>>,

    /// The user's current filter choices.
    pub selection: FilterSelection,

    /// Rows passing `selection` (recomputed on every change).
    pub view: Option<FilteredView>,

    /// Statistics of the view; None while the view is empty.
    pub summary: Option<Result<BTreeMap<String, ColumnSummary>, StatsError>>,
    pub correlation: Option<Result<CorrelationMatrix, StatsError>>,

    pub tab: Tab,

    /// Which cluster scheme colours the charts.
    pub color_scheme: ClusterScheme,
    pub color_map: ColorMap,

    /// Chart axes.
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    /// Column shown by the box plot and histogram.
    pub focus_column: Option<String>,

    /// Search text of the cultivar list.
    pub name_query: String,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Load `path` (once per path) and make it the active dataset.
    pub fn open(&mut self, path: &Path) {
        match self.cache.load(path) {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                self.dataset = None;
                self.view = None;
                self.summary = None;
                self.correlation = None;
            }
        }
    }

    /// Ingest a newly loaded dataset, reset filters and chart defaults.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.selection = FilterSelection::default();
        self.name_query.clear();

        let numeric = FilteredView::all(Arc::clone(&dataset))
            .numeric_columns()
            .to_vec();
        let preferred = numeric
            .iter()
            .find(|c| c.as_str() == END_OF_MATURATION)
            .or_else(|| numeric.first())
            .cloned();
        self.x_column = preferred.clone();
        self.y_column = numeric
            .iter()
            .find(|c| Some(*c) != preferred.as_ref())
            .cloned()
            .or_else(|| preferred.clone());
        self.focus_column = preferred;

        self.color_map = ColorMap::new(dataset.labels(self.color_scheme));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the view and its statistics after a filter change.
    pub fn refilter(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let view = apply_filter(ds, &self.selection);
        if view.is_empty() {
            self.summary = None;
            self.correlation = None;
        } else {
            let columns = view.numeric_columns().to_vec();
            self.summary = Some(summarize(&view, &columns));
            self.correlation = Some(correlation_matrix(&view, &columns));
        }
        self.view = Some(view);
    }

    /// Add or remove a cultivar from the name filter.
    pub fn toggle_name(&mut self, name: &str) {
        if !self.selection.names.remove(name) {
            self.selection.names.insert(name.to_string());
        }
        self.refilter();
    }

    pub fn set_cluster(&mut self, scheme: ClusterScheme, choice: ClusterChoice) {
        *self.selection.cluster_mut(scheme) = choice;
        self.refilter();
    }

    /// Back to the unrestricted selection.
    pub fn reset_filters(&mut self) {
        self.selection = FilterSelection::default();
        self.refilter();
    }

    /// Set the colouring scheme and rebuild the map.
    pub fn set_color_scheme(&mut self, scheme: ClusterScheme) {
        self.color_scheme = scheme;
        if let Some(ds) = &self.dataset {
            self.color_map = ColorMap::new(ds.labels(scheme));
        }
    }

    pub fn visible_rows(&self) -> usize {
        self.view.as_ref().map_or(0, FilteredView::len)
    }

    /// Write the filtered rows to `path`.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let view = self.view.as_ref().context("no dataset loaded")?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_csv(view, std::io::BufWriter::new(file))
    }

    /// Write the current summary statistics to `path`.
    pub fn export_summary(&self, path: &Path) -> Result<()> {
        let summary = match &self.summary {
            Some(Ok(summary)) => summary,
            Some(Err(e)) => return Err(e.clone().into()),
            None => return Err(StatsError::EmptyInput.into()),
        };
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_summary_json(summary, std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_dataset;

    fn loaded() -> AppState {
        let mut state = AppState::default();
        state.set_dataset(Arc::new(sample_dataset()));
        state
    }

    #[test]
    fn new_dataset_shows_everything() {
        let state = loaded();
        assert_eq!(state.visible_rows(), 4);
        assert_eq!(state.x_column.as_deref(), Some(END_OF_MATURATION));
        assert_eq!(state.focus_column.as_deref(), Some(END_OF_MATURATION));
        assert_ne!(state.y_column, state.x_column);
        assert!(matches!(state.summary, Some(Ok(_))));
    }

    #[test]
    fn selection_changes_refilter() {
        let mut state = loaded();
        state.set_cluster(ClusterScheme::KMeans, ClusterChoice::Label("2".into()));
        assert_eq!(state.visible_rows(), 2);
        state.toggle_name("Syrah");
        assert_eq!(state.visible_rows(), 1);
        state.toggle_name("Syrah");
        assert_eq!(state.visible_rows(), 2);
        state.reset_filters();
        assert_eq!(state.visible_rows(), 4);
    }

    #[test]
    fn empty_view_clears_statistics() {
        let mut state = loaded();
        state.toggle_name("Chardonnay");
        state.set_cluster(ClusterScheme::Ward, ClusterChoice::Label("1".into()));
        assert_eq!(state.visible_rows(), 0);
        assert!(state.summary.is_none());
        assert!(state.correlation.is_none());
        assert!(state.export_summary(Path::new("unused.json")).is_err());
    }

    #[test]
    fn failed_open_reports_status() {
        let mut state = loaded();
        state.open(Path::new("/definitely/not/here.csv"));
        assert!(state.dataset.is_none());
        assert!(state.status_message.is_some());
    }
}
