use anyhow::{Context, Result};
use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walsort::core::duplicate::DuplicateDetector;
use walsort::core::image::{ImageCrateDecoder, ImageRecord, Resolution};
use walsort::core::scanner::{collect_inputs, Ingestor};
use walsort::core::scatter::{self, DEFAULT_MIN_COUNT};
use walsort::core::signature::PerceptualHasher;
use walsort::services::{
    EventSink, LocalFilesystem, Materializer, RunDetails, RunSummary, TracingSink, Transfer,
};

#[derive(Parser, Debug)]
#[command(
    name = "walsort",
    version,
    about = "Deduplicate and sort wallpapers by similarity and resolution"
)]
struct Cli {
    /// Only report what would be done
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Descend into subdirectories of directory inputs
    #[arg(short, long, global = true)]
    recursive: bool,

    /// Write a JSON summary of the run to FILE
    #[arg(long, value_name = "FILE", global = true)]
    report: Option<PathBuf>,

    /// Never draw a progress bar
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Delete images that are perceptually near-identical to a larger copy
    #[command(visible_alias = "d")]
    Dedup {
        /// Similarity threshold in [0, 1]; lower is stricter
        #[arg(short, long, value_name = "T", default_value_t = 0.3, value_parser = parse_threshold)]
        threshold: f64,

        /// Images or directories of images
        images: Vec<PathBuf>,
    },

    /// Copy or move images into per-resolution directories under OUTPUT
    #[command(visible_alias = "s")]
    Sort {
        /// Move instead of copy
        #[arg(short, long = "move")]
        move_files: bool,

        /// How often a resolution must occur to get its own directory
        #[arg(long, value_name = "N", default_value_t = DEFAULT_MIN_COUNT,
              value_parser = clap::value_parser!(u32).range(1..).map(|n| n as usize))]
        min_count: usize,

        /// Use exactly these resolutions as directories (repeatable)
        #[arg(long = "resolution", value_name = "WxH")]
        resolutions: Vec<Resolution>,

        /// Images or directories of images
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output directory
        output: PathBuf,
    },
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("{s:?} is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside [0, 1]"))
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "walsort=debug" } else { "walsort=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let sink = TracingSink;
    let show_progress = !cli.no_progress && std::io::stderr().is_terminal();

    let summary = match cli.command {
        Commands::Dedup { threshold, images } => {
            let inputs = collect_inputs(&images, cli.recursive, &sink);
            let records = Ingestor::new(&ImageCrateDecoder)
                .with_progress(show_progress)
                .ingest(&inputs, &sink);
            let details = run_dedup(&records, threshold, cli.dry_run, &sink);
            RunSummary::new(cli.dry_run, inputs.len(), records.len(), details)
        }

        Commands::Sort {
            move_files,
            min_count,
            resolutions,
            images,
            output,
        } => {
            let output = std::path::absolute(&output)
                .with_context(|| format!("Invalid output directory {}", output.display()))?;
            let inputs = collect_inputs(&images, cli.recursive, &sink);
            let records = Ingestor::new(&ImageCrateDecoder)
                .with_progress(show_progress)
                .ingest(&inputs, &sink);
            let whitelist = if resolutions.is_empty() {
                scatter::whitelist(&records, min_count)
            } else {
                resolutions.into_iter().collect()
            };
            let transfer = if move_files {
                Transfer::Move
            } else {
                Transfer::Copy
            };
            let details = run_sort(&records, &output, whitelist, transfer, cli.dry_run, &sink);
            RunSummary::new(cli.dry_run, inputs.len(), records.len(), details)
        }
    };

    if cli.dry_run {
        tracing::info!("Dry run only; no files were changed");
    }
    if let Some(report) = cli.report {
        summary.write(&report)?;
        tracing::info!(report = %report.display(), "Wrote run summary");
    }

    Ok(())
}

fn run_dedup(
    records: &[ImageRecord],
    threshold: f64,
    dry_run: bool,
    sink: &dyn EventSink,
) -> RunDetails {
    let start = Instant::now();
    let duplicates = DuplicateDetector::new(threshold).cluster(records, &PerceptualHasher::new(), sink);
    tracing::info!(
        duplicates = duplicates.len(),
        elapsed = ?start.elapsed(),
        "Clustering complete"
    );

    let doomed: Vec<PathBuf> = duplicates.iter().map(|d| d.discarded.clone()).collect();
    let deleted = Materializer::new(&LocalFilesystem, sink, dry_run).delete_paths(&doomed);
    if deleted.failed > 0 {
        tracing::warn!(failed = deleted.failed, "Some duplicates could not be removed");
    }

    RunDetails::Dedup {
        threshold,
        duplicates,
        deleted,
    }
}

fn run_sort(
    records: &[ImageRecord],
    output: &std::path::Path,
    whitelist: BTreeSet<Resolution>,
    transfer: Transfer,
    dry_run: bool,
    sink: &dyn EventSink,
) -> RunDetails {
    tracing::debug!(
        whitelist = ?whitelist.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Resolution directories"
    );

    let plan = scatter::plan(records, output, &whitelist, &LocalFilesystem);
    let materializer = Materializer::new(&LocalFilesystem, sink, dry_run);
    let directories_created = materializer.create_directories(&plan.directories);
    let placed = materializer.apply_mapping(&plan.mapping, transfer);
    tracing::info!(
        placed = placed.applied,
        failed = placed.failed,
        unchanged = records.len() - plan.mapping.len(),
        "Sort complete"
    );

    RunDetails::sort(transfer, &whitelist, plan, directories_created, placed)
}
