mod app;
mod color;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use app::ScionExplorerApp;
use clap::Parser;
use eframe::egui;

/// Grapevine scion variety explorer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Variety table to open at startup (.csv, .parquet or .json).
    path: Option<PathBuf>,
}

fn main() -> eframe::Result {
    env_logger::init();

    let initial = Args::parse().path;
    if let Some(path) = &initial {
        log::info!("Opening {} at startup", path.display());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Grapevine Scion Variety Explorer",
        options,
        Box::new(move |_cc| Ok(Box::new(ScionExplorerApp::new(initial.as_deref())))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_path_is_optional() {
        let args = Args::try_parse_from(["scion-explorer"]).unwrap();
        assert!(args.path.is_none());

        let args = Args::try_parse_from(["scion-explorer", "data/scions.csv"]).unwrap();
        assert_eq!(args.path, Some(PathBuf::from("data/scions.csv")));

        assert!(Args::try_parse_from(["scion-explorer", "a.csv", "b.csv"]).is_err());
    }
}
