mod classify;
mod error;
mod pages;
mod pipeline;
mod settings;
mod stats;
mod trace;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use pages::GroupingMode;
use settings::{GroupingKind, Settings};

#[derive(Parser)]
#[command(
    name = "ucb_trace",
    about = "Group UCB Home-IP binary traces into page views",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Binary trace file
    trace: Option<PathBuf>,

    /// Where to write the page-grouped text
    output: Option<PathBuf>,

    /// Page grouping strategy (default from UCB_TRACE_GROUPING, else contiguous)
    #[arg(long, value_enum)]
    grouping: Option<GroupingKind>,

    /// Gap in seconds that opens a new page in timeout grouping
    #[arg(long)]
    timeout: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print decoded trace records, one per line
    Dump {
        input: PathBuf,
        /// Max records to print (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Summarize a page-grouped output file
    Stats {
        input: PathBuf,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    debug!(?settings, "settings loaded");

    let result = match cli.command {
        Some(Commands::Dump { input, limit }) => {
            let file = open_trace(&input)?;
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let summary = trace::dump::dump(BufReader::new(file), &mut out, limit)?;
            out.flush()?;
            if let Some(stop) = summary.stop.filter(|s| s.is_truncated()) {
                eprintln!("Trace ends mid-record: {:?}", stop);
            }
            eprintln!("{} records", summary.records);
            Ok(())
        }
        Some(Commands::Stats { input, json }) => {
            let file = File::open(&input).with_context(|| format!("Failed to open {:?}", input))?;
            let loaded = pages::reader::read_pages(BufReader::new(file))
                .with_context(|| format!("Failed to read pages from {:?}", input))?;
            let s = stats::compute(&loaded);
            if json {
                println!("{}", serde_json::to_string_pretty(&s)?);
            } else {
                stats::print(&s);
            }
            Ok(())
        }
        None => {
            let (Some(trace), Some(output)) = (cli.trace, cli.output) else {
                bail!("Usage: ucb_trace <trace_file> <output_file.txt>");
            };
            if let Some(kind) = cli.grouping {
                settings.grouping = kind;
            }
            if let Some(secs) = cli.timeout {
                settings.page_timeout_secs = secs;
            }
            parse_trace(&trace, &output, &settings)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Open a trace for reading, refusing missing or empty files.
fn open_trace(path: &Path) -> Result<File> {
    if !path.is_file() {
        bail!("Trace file {:?} does not exist", path);
    }
    let len = fs::metadata(path)
        .with_context(|| format!("Failed to stat {:?}", path))?
        .len();
    if len == 0 {
        bail!("Trace file {:?} is empty", path);
    }
    File::open(path).with_context(|| format!("Failed to open {:?}", path))
}

fn parse_trace(trace: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let input = open_trace(trace)?;
    let mode = settings.grouping_mode();
    if let GroupingMode::Timeout { secs } = mode {
        info!("Timeout grouping: a {}s gap opens a new page", secs);
    }

    let out = File::create(output).with_context(|| format!("Failed to create {:?}", output))?;
    let mut out = BufWriter::new(out);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    let summary = pipeline::run(
        BufReader::new(input),
        &mut out,
        mode,
        settings.progress_every,
        |n| {
            pb.set_message(format!("Processed {} records...", n));
            pb.tick();
        },
    )
    .with_context(|| format!("Failed to process {:?} into {:?}", trace, output))?;
    pb.finish_and_clear();

    println!(
        "Successfully parsed {} records, wrote {} pages ({} clients) to {}",
        summary.requests,
        summary.pages,
        summary.clients,
        output.display()
    );
    if summary.promoted > 0 {
        println!("  {} orphan pages had their first request promoted", summary.promoted);
    }
    if summary.skipped > 0 {
        println!("  {} records skipped", summary.skipped);
    }
    if summary.stop.is_truncated() {
        println!("Note: trace ended mid-record; the partial tail was dropped.");
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
