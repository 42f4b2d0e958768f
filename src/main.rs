use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Env};

use evo_tree_viewer::app::EvoTreeApp;
use evo_tree_viewer::settings::{DEFAULT_SETTINGS_FILE, Settings};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Species records (.csv or .json). Defaults to the file named in the settings.
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Seed for the tree layout.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> eframe::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::load_or_default(&args.settings);
    let data_path = args
        .data
        .unwrap_or_else(|| PathBuf::from(&settings.data_file));
    log::info!("loading species data from {}", data_path.display());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };

    eframe::run_native(
        "evo-tree-viewer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(EvoTreeApp::new(cc, data_path, settings, args.seed)))
        }),
    )
}
