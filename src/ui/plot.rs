use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, RichText, ScrollArea, Sense, Stroke, Ui, Vec2,
};
use egui_extras::{Column as TableColumn, TableBuilder};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};

use crate::color::diverging;
use crate::data::filter::FilteredView;
use crate::data::stats::{summarize, CorrelationMatrix, StatsError};
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the tab bar and the active view in the central panel.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(view) = state.view.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a variety table to start exploring  (File → Open…)");
        });
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.title());
        }
    });
    ui.separator();

    if view.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(
                RichText::new("No data matches the current filters.")
                    .color(Color32::YELLOW)
                    .heading(),
            );
        });
        return;
    }

    match state.tab {
        Tab::Table => data_table(ui, &view),
        Tab::Summary => summary_table(ui, state, &view),
        Tab::Scatter => scatter_plot(ui, state, &view),
        Tab::Box => box_plot(ui, state, &view),
        Tab::Histogram => histogram_plot(ui, state, &view),
        Tab::Parallel => parallel_coordinates(ui, state, &view),
        Tab::Correlation => correlation_tab(ui, state),
    }
}

/// Combo box over the numeric columns of the view.
fn column_picker(ui: &mut Ui, id: &str, label: &str, current: &mut Option<String>, columns: &[String]) {
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.clone().unwrap_or_default())
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                ui.selectable_value(current, Some(col.clone()), col);
            }
        });
}

// ---------------------------------------------------------------------------
// Table and summary
// ---------------------------------------------------------------------------

fn data_table(ui: &mut Ui, view: &FilteredView) {
    let dataset = view.dataset();
    ui.label(format!("Filtered Cultivar Data ({} rows)", view.len()));
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(TableColumn::auto().at_least(60.0), dataset.schema.len())
            .header(20.0, |mut header| {
                for name in dataset.schema.names() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, view.len(), |mut row| {
                    let record = &dataset.records[view.rows()[row.index()]];
                    for value in &record.values {
                        row.col(|ui: &mut Ui| {
                            ui.label(value.to_string());
                        });
                    }
                });
            });
    });
}

fn summary_table(ui: &mut Ui, state: &AppState, view: &FilteredView) {
    let summary = match &state.summary {
        Some(Ok(summary)) => summary,
        Some(Err(e)) => {
            ui.colored_label(Color32::YELLOW, e.to_string());
            return;
        }
        None => return,
    };

    ScrollArea::both().show(ui, |ui: &mut Ui| {
        egui::Grid::new("summary_grid")
            .striped(true)
            .spacing([16.0, 4.0])
            .show(ui, |ui: &mut Ui| {
                for heading in ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
                    ui.strong(heading);
                }
                ui.end_row();

                for col in view.numeric_columns() {
                    let Some(s) = summary.get(col) else {
                        continue;
                    };
                    ui.label(col);
                    ui.label(s.count.to_string());
                    for v in [s.mean, s.std, s.min, s.p25, s.p50, s.p75, s.max] {
                        ui.label(format_stat(v));
                    }
                    ui.end_row();
                }
            });
    });
}

fn format_stat(v: f64) -> String {
    if v.is_nan() {
        "–".to_string()
    } else {
        format!("{v:.2}")
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

fn scatter_plot(ui: &mut Ui, state: &mut AppState, view: &FilteredView) {
    let columns = view.numeric_columns();
    ui.horizontal(|ui: &mut Ui| {
        column_picker(ui, "scatter_x", "x", &mut state.x_column, columns);
        column_picker(ui, "scatter_y", "y", &mut state.y_column, columns);
    });
    let (Some(x), Some(y)) = (state.x_column.clone(), state.y_column.clone()) else {
        return;
    };

    let dataset = view.dataset();
    let scheme = state.color_scheme;
    let color_map = &state.color_map;
    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label(x.clone())
        .y_axis_label(y.clone())
        .show(ui, |plot_ui| {
            for (label, group) in view.group_by(scheme) {
                let points: PlotPoints = group
                    .rows()
                    .iter()
                    .filter_map(|&r| Some([dataset.numeric(r, &x)?, dataset.numeric(r, &y)?]))
                    .collect();
                plot_ui.points(
                    Points::new(points)
                        .name(format!("{scheme} {label}"))
                        .color(color_map.color_for(&label))
                        .radius(3.5),
                );
            }
        });
}

fn box_plot(ui: &mut Ui, state: &mut AppState, view: &FilteredView) {
    ui.horizontal(|ui: &mut Ui| {
        column_picker(ui, "box_column", "column", &mut state.focus_column, view.numeric_columns());
    });
    let Some(column) = state.focus_column.clone() else {
        return;
    };

    let scheme = state.color_scheme;
    let mut plots = Vec::new();
    for (i, (label, group)) in view.group_by(scheme).into_iter().enumerate() {
        let Ok(summary) = summarize(&group, std::slice::from_ref(&column)) else {
            continue;
        };
        let Some(s) = summary.get(&column).filter(|s| s.count > 0) else {
            continue;
        };
        let color = state.color_map.color_for(&label);
        let elem = BoxElem::new(i as f64, BoxSpread::new(s.min, s.p25, s.p50, s.p75, s.max))
            .name(format!("{scheme} {label}"))
            .fill(color.linear_multiply(0.3))
            .stroke(Stroke::new(1.5, color));
        plots.push(BoxPlot::new(vec![elem]).name(format!("{scheme} {label}")));
    }

    Plot::new("box_plot")
        .legend(Legend::default())
        .y_axis_label(column)
        .show(ui, |plot_ui| {
            for plot in plots {
                plot_ui.box_plot(plot);
            }
        });
}

/// Equal-width bins over `values` as (bin centre, count) pairs.
pub fn histogram_bins(values: &[f64], bins: usize) -> (f64, Vec<(f64, usize)>) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() || bins == 0 {
        return (0.0, Vec::new());
    }
    let range = max - min;
    if range.abs() < f64::EPSILON {
        return (1.0, vec![(min, values.len())]);
    }
    let width = range / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let centres = counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (min + width * (i as f64 + 0.5), c))
        .collect();
    (width, centres)
}

fn histogram_plot(ui: &mut Ui, state: &mut AppState, view: &FilteredView) {
    ui.horizontal(|ui: &mut Ui| {
        column_picker(ui, "hist_column", "column", &mut state.focus_column, view.numeric_columns());
    });
    let Some(column) = state.focus_column.clone() else {
        return;
    };

    let values = view.column_values(&column);
    let bins = ((values.len() as f64).sqrt().ceil() as usize).clamp(5, 30);
    let (width, centres) = histogram_bins(&values, bins);
    let bars = centres
        .into_iter()
        .map(|(x, c)| Bar::new(x, c as f64).width(width * 0.95))
        .collect();

    Plot::new("histogram")
        .legend(Legend::default())
        .x_axis_label(column.clone())
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(column).color(Color32::LIGHT_BLUE));
        });
}

fn parallel_coordinates(ui: &mut Ui, state: &AppState, view: &FilteredView) {
    let columns = view.numeric_columns();
    ui.label(
        columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{i} = {c}"))
            .collect::<Vec<_>>()
            .join(",  "),
    );

    let dataset = view.dataset();
    let scheme = state.color_scheme;
    Plot::new("parallel_coordinates")
        .legend(Legend::default())
        .x_axis_label("descriptor")
        .show(ui, |plot_ui| {
            for (label, group) in view.group_by(scheme) {
                let color = state.color_map.color_for(&label);
                for &row in group.rows() {
                    let points: PlotPoints = columns
                        .iter()
                        .enumerate()
                        .filter_map(|(i, c)| Some([i as f64, dataset.numeric(row, c)?]))
                        .collect();
                    plot_ui.line(
                        Line::new(points)
                            .name(format!("{scheme} {label}"))
                            .color(color)
                            .width(1.0),
                    );
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Correlation heatmap
// ---------------------------------------------------------------------------

fn correlation_tab(ui: &mut Ui, state: &AppState) {
    let matrix = match &state.correlation {
        Some(Ok(matrix)) => matrix,
        Some(Err(e @ StatsError::InsufficientData { partial: Some(partial), .. })) => {
            ui.colored_label(Color32::YELLOW, format!("⚠ {e}"));
            &**partial
        }
        Some(Err(e)) => {
            ui.colored_label(Color32::YELLOW, format!("⚠ {e}"));
            return;
        }
        None => return,
    };
    ScrollArea::both().show(ui, |ui: &mut Ui| heatmap(ui, matrix));
}

fn heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let n = matrix.columns.len();
    if n == 0 {
        ui.label("No numeric columns.");
        return;
    }

    let label_width = 180.0;
    let header_height = 20.0;
    let cell = ((ui.available_width() - label_width) / n as f32).clamp(18.0, 56.0);
    let size = Vec2::new(label_width + cell * n as f32, header_height + cell * n as f32);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let origin = response.rect.min + Vec2::new(label_width, header_height);
    let font = FontId::proportional(11.0);
    let text_color = ui.visuals().text_color();

    for (i, name) in matrix.columns.iter().enumerate() {
        let offset = cell * (i as f32 + 0.5);
        painter.text(
            Pos2::new(origin.x - 6.0, origin.y + offset),
            Align2::RIGHT_CENTER,
            format!("{i}. {name}"),
            font.clone(),
            text_color,
        );
        painter.text(
            Pos2::new(origin.x + offset, origin.y - 4.0),
            Align2::CENTER_BOTTOM,
            i.to_string(),
            font.clone(),
            text_color,
        );
    }

    for (i, row) in matrix.values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let rect = Rect::from_min_size(
                origin + Vec2::new(cell * j as f32, cell * i as f32),
                Vec2::splat(cell),
            );
            let fill = value.map_or(Color32::DARK_GRAY, diverging);
            painter.rect_filled(rect.shrink(1.0), 0.0, fill);
            if let Some(r) = value {
                if cell >= 36.0 {
                    painter.text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        format!("{r:.2}"),
                        font.clone(),
                        Color32::BLACK,
                    );
                }
            }
        }
    }

    let hovered = response.hover_pos().and_then(|pos| {
        let rel = pos - origin;
        if rel.x < 0.0 || rel.y < 0.0 {
            return None;
        }
        let (i, j) = ((rel.y / cell) as usize, (rel.x / cell) as usize);
        let value = matrix.values.get(i)?.get(j)?;
        Some(format!(
            "{} × {}: {}",
            matrix.columns[i],
            matrix.columns[j],
            value.map_or("undefined".to_string(), |r| format!("{r:.3}"))
        ))
    });
    if let Some(text) = hovered {
        response.on_hover_text(text);
    }
}
