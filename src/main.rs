mod app;
mod color;
mod state;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use app::AstroCubeApp;
use astrocube::config::ViewerConfig;
use astrocube::HduSelector;
use clap::Parser;
use eframe::egui;
use state::AppState;

/// Browse spectral-line data cubes channel by channel.
#[derive(Parser, Debug)]
#[command(name = "astrocube-view", version, about, long_about = None)]
struct Args {
    /// FITS cube to open. Defaults to the only FITS file in the working directory.
    path: Option<PathBuf>,

    /// HDU holding the cube: zero-based index or EXTNAME
    #[arg(long, default_value = "0")]
    hdu: HduSelector,

    /// JSON file with viewer settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip noise estimation at load time
    #[arg(long)]
    no_noise: bool,
}

fn is_fits(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "fits" | "fit" | "fts"))
}

/// The given path, or the single FITS file in `dir`.
fn resolve_input(path: Option<PathBuf>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = path {
        return Ok(path);
    }
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_fits(p))
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => bail!("no FITS files in {}; pass a path", dir.display()),
        1 => Ok(candidates.remove(0)),
        _ => {
            let names: Vec<String> = candidates
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            bail!("several FITS files found, pass one of: {}", names.join(", "))
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if args.no_noise {
        config.compute_noise = false;
    }

    let mut state = AppState::new(config);
    let loaded = resolve_input(args.path, Path::new("."))
        .and_then(|path| state.load_cube(&path, &args.hdu));
    if let Err(e) = loaded {
        log::error!("{e:#}");
        state.status_message = Some(format!("Error: {e:#}"));
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "astrocube – Spectral Cube Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(AstroCubeApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
