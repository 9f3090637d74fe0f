use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error, info};

use history_timeline::config::{load_config, DataOrigin, TimelineConfig};
use history_timeline::orchestrator::run_export;
use history_timeline::render::render_era_summary;
use history_timeline::TimelineError;

/// History Timeline - builds era-bucketed timeline layouts from category datasets
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the category JSON files (overrides TIMELINE_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Fetch the category files from this base URL instead of a directory (overrides TIMELINE_BASE_URL)
    #[arg(short, long)]
    base_url: Option<String>,

    /// Path to a JSON source config (overrides TIMELINE_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Output directory for generated files (default: "out")
    #[arg(short, long, default_value = "out")]
    output_dir: String,

    /// Viewport width in pixels, the minimum canvas width
    #[arg(long)]
    viewport_width: Option<f64>,

    /// Focus this era (English or Persian name) in the exported index
    #[arg(long)]
    era: Option<String>,
}

fn resolve_config(arg: Option<&str>) -> Result<TimelineConfig> {
    let path = arg
        .map(PathBuf::from)
        .or_else(|| std::env::var("TIMELINE_CONFIG").ok().map(PathBuf::from));
    match path {
        Some(p) => {
            debug!("Using source config - path={}", p.display());
            load_config(&p)
        }
        None => {
            debug!("Using built-in source list");
            Ok(TimelineConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting history_timeline");

    let args = Args::parse();

    let mut cfg = resolve_config(args.config.as_deref())?;
    if let Some(width) = args.viewport_width {
        cfg.viewport_width = width;
    }
    let origin = DataOrigin::resolve(args.base_url.as_deref(), args.data_dir.as_deref())?;
    let output_dir = PathBuf::from(&args.output_dir);

    match run_export(cfg, &origin, &output_dir, args.era.as_deref()).await {
        Ok(timeline) => {
            println!("{}", render_era_summary(&timeline));
            Ok(())
        }
        Err(e) if matches!(e.downcast_ref::<TimelineError>(), Some(TimelineError::NoEventsLoaded)) => {
            error!("Nothing to export");
            eprintln!("No events could be loaded. Check the data directory or base URL.");
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}
