//! Lane Finder - Main Entry Point

use std::path::PathBuf;

use anyhow::{Context, Result};
use lane_cli::{init_logging, run, Settings};
use tracing::info;

fn main() -> Result<()> {
    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref()).context("loading settings")?;
    init_logging(settings.log_format, &settings.log_level)?;

    info!("=== Lane Finder v{} ===", env!("CARGO_PKG_VERSION"));

    let stats = run(&settings)?;
    info!(
        frames = stats.frames,
        with_lane = stats.frames_with_lane,
        output = %settings.output_dir.display(),
        "Done"
    );

    Ok(())
}
