//! vistack CLI - vegetation-index time stacks from satellite imagery

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vistack_algorithms::imagery::SpectralIndex;
use vistack_pipeline::{Engine, ExportStatus, JobSpec, PipelineConfig, StacImageCatalog};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vistack")]
#[command(author, version, about = "Vegetation-index time stacks from satellite imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every export job in a job file
    Run {
        #[command(flatten)]
        job: JobArgs,
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date (YYYY-MM-DD, exclusive)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Root directory for exported files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Assemble the collection and list what would be stacked
    Inspect {
        #[command(flatten)]
        job: JobArgs,
    },
    /// List supported spectral indices
    Indices,
}

#[derive(Args)]
struct JobArgs {
    /// Job configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,
    /// Index to compute, overriding the job file (repeatable)
    #[arg(short, long = "index", value_name = "NAME")]
    indices: Vec<String>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(args: &JobArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load job file {}", args.config.display()))?;
    if !args.indices.is_empty() {
        config.indices.names = args.indices.clone();
    }
    Ok(config)
}

fn validate(config: &PipelineConfig) -> Result<JobSpec> {
    let job = config.validate().context("Invalid job configuration")?;
    info!(
        "Area: ({:.5}, {:.5}) r={} m, {}",
        job.aoi().center().lon,
        job.aoi().center().lat,
        job.aoi().radius_m(),
        job.interval()
    );
    Ok(job)
}

fn engine(job: &JobSpec) -> Result<Engine<StacImageCatalog>> {
    let catalog = StacImageCatalog::new(job.catalog()).context("Failed to create STAC catalog")?;
    Ok(Engine::new(catalog, job.output_dir()))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            job,
            start,
            end,
            output_dir,
        } => {
            let mut config = load_config(&job)?;
            if let Some(start) = start {
                config.dates.start = start;
            }
            if let Some(end) = end {
                config.dates.end = end;
            }
            if let Some(dir) = output_dir {
                config.export.output_dir = dir;
            }
            let job = validate(&config)?;
            let engine = engine(&job)?;

            let tasks = job.tasks();
            let total = tasks.len();
            let mut failed = 0usize;
            for task in tasks {
                let start = Instant::now();
                let pb = spinner(&format!("Exporting {}...", task.file_name));
                let outcome = engine.export(task);
                pb.finish_and_clear();

                match &outcome.status {
                    ExportStatus::Completed(report) => {
                        println!(
                            "{} saved to: {} ({} bands)",
                            outcome.task.file_name,
                            report.path.display(),
                            report.band_names.len()
                        );
                        println!("  Processing time: {:.2?}", start.elapsed());
                    }
                    ExportStatus::Failed(e) => {
                        failed += 1;
                        println!("{} FAILED: {}", outcome.task.file_name, e);
                    }
                }
            }

            if failed > 0 {
                anyhow::bail!("{} of {} export jobs failed", failed, total);
            }
        }

        Commands::Inspect { job } => {
            let config = load_config(&job)?;
            let job = validate(&config)?;
            let engine = engine(&job)?;

            for &index in job.indices() {
                let request = job.request(index);
                let pb = spinner(&format!("Assembling {} collection...", index));
                let collection = engine
                    .collection(&request)
                    .with_context(|| format!("Failed to assemble {} collection", index))?;
                pb.finish_and_clear();

                println!("{}: {} acquisitions", index, collection.len());
                for acq in &collection {
                    let cloud = acq
                        .cloud_cover
                        .map(|c| format!("{:.1}%", c))
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {}_{}  {}  cloud {}", index.name(), acq.id, acq.acquired, cloud);
                }
            }
        }

        Commands::Indices => {
            for index in SpectralIndex::ALL {
                let bands: Vec<String> = index.required_bands().iter().map(|b| b.to_string()).collect();
                println!("{:<6} {}", index.name(), index.formula());
                println!("       bands: {}", bands.join(", "));
            }
        }
    }

    Ok(())
}
