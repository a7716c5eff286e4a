use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use seamtile::{
    editor::DEFAULT_CONVERT, grid::DEFAULT_GRID_WIDTH, scheduler::DEFAULT_WORKERS, MagickEditor,
    MergeConfig, Orchestrator, Target,
};
use std::{path::PathBuf, sync::Arc};

/// `mapmerge` - merges the seam tiles between independently rendered base images.
///
/// Expects `<BASE_DIR>/<base image>/<zoom>/<column>/<row>.png` and writes merged
/// tiles to `<BASE_DIR>/tmp/<zoom>/<column>/<row>.png`.
#[derive(Parser, Debug)]
#[command(name = "mapmerge", version, about, long_about = None)]
struct Args {
    /// Directory holding one numbered sub-directory per base image.
    base_dir: PathBuf,

    /// Only merge the seams anchored at this base image.
    index: Option<u32>,

    /// Log every editor invocation and its output.
    #[arg(long, env = "MAPMERGE_DEBUG", default_value_t = false)]
    debug: bool,

    /// Number of base images per grid row.
    #[arg(long, env = "MAPMERGE_GRID_WIDTH", default_value_t = DEFAULT_GRID_WIDTH)]
    grid_width: u32,

    /// Merges running at the same time.
    #[arg(long, env = "MAPMERGE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Exclusive upper bound of the base image sweep; defaults to one past the
    /// highest base image found.
    #[arg(long, env = "MAPMERGE_MAX_INDEX")]
    max_index: Option<u32>,

    /// ImageMagick program used for every edit.
    #[arg(long, env = "MAPMERGE_CONVERT", default_value = DEFAULT_CONVERT)]
    convert: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("Starting merge in {}", args.base_dir.display());

    let config = MergeConfig {
        grid_width: args.grid_width,
        workers: args.workers,
        max_index: args.max_index,
        ..MergeConfig::new(&args.base_dir)
    };
    let editor = Arc::new(MagickEditor::new(&args.convert));
    let mut orchestrator =
        Orchestrator::new(config, editor).context("Failed to set up merge run")?;

    let target = args.index.map_or(Target::All, Target::Single);
    let summary = orchestrator
        .run(target)
        .with_context(|| format!("Merge in {} failed", args.base_dir.display()))?;

    info!(
        "Merged {} horizontal, {} vertical and {} four-way seam tiles",
        summary.horizontal, summary.vertical, summary.four_way
    );
    info!("Elapsed time: {}s", summary.elapsed.as_secs());

    Ok(())
}
