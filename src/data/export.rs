use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use super::filter::FilteredView;
use super::stats::ColumnSummary;

/// Write the rows of `view` as UTF-8, comma-separated CSV with a header row
/// and no index column.
pub fn write_csv<W: Write>(view: &FilteredView, writer: W) -> Result<()> {
    let dataset = view.dataset();
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(dataset.schema.names())
        .context("writing CSV header")?;
    for &row in view.rows() {
        out.write_record(dataset.records[row].values.iter().map(|v| v.export_text()))
            .with_context(|| format!("writing row {row}"))?;
    }
    out.flush().context("flushing CSV")?;
    log::info!("Exported {} rows", view.len());
    Ok(())
}

/// Write summary statistics as pretty-printed JSON, one object per column.
pub fn write_summary_json<W: Write>(
    summary: &BTreeMap<String, ColumnSummary>,
    writer: W,
) -> Result<()> {
    serde_json::to_writer_pretty(writer, summary).context("writing summary JSON")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::filter::{apply_filter, ClusterChoice, FilterSelection};
    use crate::data::model::tests::sample_dataset;
    use crate::data::stats::summarize;

    #[test]
    fn exports_only_filtered_rows() {
        let ds = Arc::new(sample_dataset());
        let view = apply_filter(
            &ds,
            &FilterSelection {
                kmeans: ClusterChoice::Label("2".into()),
                ..Default::default()
            },
        );
        let mut buf = Vec::new();
        write_csv(&view, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Prime name,Species,Parent 1,Parent 2,End of maturation,Berry weight,Kmeans cluster,Ward cluster"
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Riesling,Vitis vinifera,Pinot,,0.6,3,2,1");
        assert!(lines[2].starts_with("Syrah,"));
    }

    #[test]
    fn summary_json_is_keyed_by_column() {
        let ds = Arc::new(sample_dataset());
        let view = apply_filter(&ds, &FilterSelection::default());
        let summary = summarize(&view, &["Berry weight".to_string()]).unwrap();
        let mut buf = Vec::new();
        write_summary_json(&summary, &mut buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["Berry weight"]["count"], 4);
        assert_eq!(parsed["Berry weight"]["max"], 5.0);
    }
}
