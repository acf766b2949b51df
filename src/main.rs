use clap::Parser;
use galpage::config::{Overrides, SortMode};
use galpage::media::NativeBackend;
use galpage::{build, config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "galpage")]
#[command(about = "Generate a single-file HTML gallery with inline previews")]
#[command(long_about = "\
Generate a single-file HTML gallery with inline previews

Writes DIR.html next to DIR, containing previews of all the images and
videos in the directory. If DIR.html already exists it is parsed first: the
original generation parameters are reused unless overridden below, and any
up-to-date preview is carried over instead of being recomputed. Re-running
against an unchanged directory leaves DIR.html untouched.

Files sharing a name with different extensions (IMG_1.JPG + IMG_1.MP4 from
a live photo) produce a single entry, preferring the still image.")]
#[command(version = version_string())]
struct Cli {
    /// Directory to generate the gallery from
    dir: PathBuf,

    /// Pixel height of each preview
    #[arg(long)]
    height: Option<u32>,

    /// Gallery entry ordering
    #[arg(long, value_enum)]
    sort_by: Option<SortMode>,

    /// Regular expression of paths to exclude
    #[arg(long)]
    exclude: Option<String>,

    /// Number of concurrent preview workers (default: CPU cores)
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        height: cli.height,
        sort_by: cli.sort_by,
        exclude: cli.exclude,
        workers: cli.workers,
    };
    info!(
        "generation flags: height={} sort_by={:?} workers={}",
        cli.height.unwrap_or(config::DEFAULT_HEIGHT),
        cli.sort_by.unwrap_or_default(),
        config::effective_workers(cli.workers)
    );

    let report = build::build(&cli.dir, &overrides, &NativeBackend::new())?;

    info!("{}", report.stats);
    if report.wrote {
        info!("wrote {}", report.artifact_path.display());
    } else {
        info!("no changes made to {}", report.artifact_path.display());
    }
    Ok(())
}
