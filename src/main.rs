use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use provwatch::{BatchSource, FileSource, Report, Session, Settings, StreamSource};

#[derive(Parser, Debug)]
#[command(name = "provwatch")]
#[command(about = "Lineage and performance diagnostics for flow provenance")]
struct Args {
    /// Provenance file, or a directory of .json/.ndjson/.jsonl files
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Read newline-delimited JSON events from standard input
    #[arg(long, global = true)]
    stdin: bool,

    /// TOML configuration file with analyzer defaults
    #[arg(short, long, global = true, env = "PROVWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Event totals, distinct flowfiles and components, time span
    Summary,

    /// Most common traversal paths
    Paths {
        /// Number of paths to show
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Per-component duration percentiles
    Bottlenecks {
        /// Percentile to report, within [0, 100]
        #[arg(short, long)]
        percentile: Option<f64>,

        /// Ignore components with fewer duration samples
        #[arg(long)]
        min_samples: Option<usize>,

        /// Show only the slowest components
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Components dropping flowfiles within a window before the last event
    Drops {
        /// Window length: minutes or a duration such as "90m", "2h", "3600s"
        #[arg(short, long)]
        window: Option<String>,

        /// Minimum drops for a component to be listed
        #[arg(long)]
        min_drops: Option<usize>,
    },

    /// Ancestors and descendants of one flowfile
    Trace {
        /// Flowfile id to trace
        flowfile_id: String,

        /// Stop expanding after this many hops
        #[arg(long)]
        max_depth: Option<usize>,

        /// Print every traced event once, sorted by time, instead of the tree
        #[arg(long)]
        flat: bool,
    },

    /// Inbound and outbound transfers by endpoint
    Transfers,

    /// Fan-out and fan-in per component
    ForkJoin,

    /// Content and attribute modifications per component
    Modifications {
        /// Show only the busiest components
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run every analysis
    Report {
        /// Write the report to a JSON file instead of stdout
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut settings = Settings::load(args.config.as_deref())?;
    apply_overrides(&mut settings, &args.command);
    debug!(?settings, "effective settings");

    let mut source = open_source(&args)?;
    let batch = source
        .load()
        .await
        .with_context(|| format!("failed to load {}", source.description()))?;
    let session = Session::new(batch);

    match args.command {
        Command::Summary => print_json(&session.summary()),
        Command::Paths { .. } => print_json(&session.paths(&settings.path_query())),
        Command::Bottlenecks { .. } => {
            print_json(&session.bottlenecks(&settings.bottleneck_query())?)
        }
        Command::Drops { .. } => print_json(&session.drops(&settings.drop_query()?)),
        Command::Trace {
            ref flowfile_id,
            flat,
            ..
        } => {
            let trace = session.trace(flowfile_id, &settings.trace_options())?;
            if flat {
                print_json(&trace.flatten())
            } else {
                print_json(&trace)
            }
        }
        Command::Transfers => print_json(&session.transfers()),
        Command::ForkJoin => print_json(&session.fork_join()),
        Command::Modifications { .. } => {
            print_json(&session.modifications(&settings.modification_query()))
        }
        Command::Report { ref export } => {
            let report = Report::build(&session, &settings).await?;
            match export {
                Some(path) => {
                    report.export(path)?;
                    eprintln!("Exported report to: {}", path.display());
                    Ok(())
                }
                None => print_json(&report),
            }
        }
    }
}

/// Install the stderr log subscriber.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line flags take precedence over every configuration source.
fn apply_overrides(settings: &mut Settings, command: &Command) {
    match command {
        Command::Paths { top_n } => {
            if let Some(n) = top_n {
                settings.paths.top_n = *n;
            }
        }
        Command::Bottlenecks {
            percentile,
            min_samples,
            limit,
        } => {
            if let Some(p) = percentile {
                settings.bottlenecks.percentile = *p;
            }
            if let Some(n) = min_samples {
                settings.bottlenecks.min_samples = *n;
            }
            if limit.is_some() {
                settings.bottlenecks.limit = *limit;
            }
        }
        Command::Drops { window, min_drops } => {
            if let Some(w) = window {
                settings.drops.window = w.clone();
            }
            if let Some(n) = min_drops {
                settings.drops.min_drops = *n;
            }
        }
        Command::Trace { max_depth, .. } => {
            if max_depth.is_some() {
                settings.trace.max_depth = *max_depth;
            }
        }
        Command::Modifications { limit } => {
            if limit.is_some() {
                settings.modifications.limit = *limit;
            }
        }
        Command::Summary | Command::Transfers | Command::ForkJoin | Command::Report { .. } => {}
    }
}

fn open_source(args: &Args) -> Result<Box<dyn BatchSource>> {
    match (&args.file, args.stdin) {
        (Some(_), true) => bail!("--file and --stdin cannot be used together"),
        (Some(path), false) => Ok(Box::new(FileSource::new(path))),
        (None, true) => Ok(Box::new(StreamSource::stdin())),
        (None, false) => bail!("no input given: pass --file <path> or --stdin"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
