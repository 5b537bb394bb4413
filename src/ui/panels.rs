use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::ClusterChoice;
use crate::data::model::ClusterScheme;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter Options");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => Arc::clone(ds),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    // ---- Cluster selectors ----
    for scheme in ClusterScheme::ALL {
        ui.strong(format!("{scheme} group"));
        let current = state.selection.cluster(scheme).clone();
        let selected_text = match &current {
            ClusterChoice::All => "All".to_string(),
            ClusterChoice::Label(label) => label.clone(),
        };
        let mut picked = None;
        egui::ComboBox::from_id_salt(scheme.column())
            .selected_text(selected_text)
            .show_ui(ui, |ui: &mut Ui| {
                if ui
                    .selectable_label(current == ClusterChoice::All, "All")
                    .clicked()
                {
                    picked = Some(ClusterChoice::All);
                }
                for label in dataset.labels(scheme) {
                    let choice = ClusterChoice::Label(label.clone());
                    if ui.selectable_label(current == choice, label).clicked() {
                        picked = Some(choice);
                    }
                }
            });
        if let Some(choice) = picked {
            if choice != current {
                state.set_cluster(scheme, choice);
            }
        }
        ui.add_space(4.0);
    }
    ui.separator();

    // ---- Cultivar multiselect ----
    let n_selected = state.selection.names.len();
    let header_text = if n_selected == 0 {
        format!("Cultivars  (all {})", dataset.prime_names.len())
    } else {
        format!("Cultivars  ({n_selected}/{})", dataset.prime_names.len())
    };
    let mut toggled: Option<String> = None;
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("cultivars")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Search");
                ui.text_edit_singleline(&mut state.name_query);
            });
            let query = state.name_query.to_lowercase();
            ScrollArea::vertical()
                .max_height(280.0)
                .auto_shrink([false, true])
                .show(ui, |ui: &mut Ui| {
                    for name in &dataset.prime_names {
                        if !query.is_empty() && !name.to_lowercase().contains(&query) {
                            continue;
                        }
                        let mut checked = state.selection.names.contains(name);
                        if ui.checkbox(&mut checked, name).changed() {
                            toggled = Some(name.clone());
                        }
                    }
                });
        });
    if let Some(name) = toggled {
        state.toggle_name(&name);
    }

    ui.add_space(4.0);
    if ui
        .add_enabled(!state.selection.is_unrestricted(), egui::Button::new("Reset filters"))
        .clicked()
    {
        state.reset_filters();
    }
    ui.separator();

    // ---- Colour-by selector ----
    ui.strong("Color by");
    let mut scheme = state.color_scheme;
    egui::ComboBox::from_id_salt("color_by")
        .selected_text(scheme.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for s in ClusterScheme::ALL {
                ui.selectable_value(&mut scheme, s, s.to_string());
            }
        });
    if scheme != state.color_scheme {
        state.set_color_scheme(scheme);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let has_rows = state.visible_rows() > 0;
            if ui
                .add_enabled(has_rows, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                export_csv_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(has_rows, egui::Button::new("Export summary JSON…"))
                .clicked()
            {
                export_summary_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} varieties loaded, {} visible",
                ds.len(),
                state.visible_rows()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open variety table")
        .add_filter("Supported files", &["csv", "txt", "parquet", "pq", "json"])
        .add_filter("CSV (Latin-1, ';')", &["csv", "txt"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

fn export_csv_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered varieties")
        .set_file_name("filtered_varieties.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        let result = state.export_csv(&path);
        report(state, result, "export filtered rows");
    }
}

fn export_summary_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export summary statistics")
        .set_file_name("summary.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        let result = state.export_summary(&path);
        report(state, result, "export summary");
    }
}

fn report(state: &mut AppState, result: anyhow::Result<()>, what: &str) {
    match result {
        Ok(()) => state.status_message = None,
        Err(e) => {
            log::error!("Failed to {what}: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
