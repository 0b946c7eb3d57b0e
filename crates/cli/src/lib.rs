pub mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use carmatch_core::config::{AppConfig, LogFormat, LoggingConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::doctor;
use crate::commands::inspect::InspectArgs;
use crate::commands::recommend::RecommendArgs;
use crate::commands::similar::SimilarArgs;
use crate::commands::RuntimeArgs;

#[derive(Debug, Parser)]
#[command(
    name = "carmatch",
    about = "Car recommender CLI",
    long_about = "Filter a car catalogue by hard constraints, rank the matches by your preferences, and find similar cars.",
    after_help = "Examples:\n  carmatch options\n  carmatch recommend --engine V8 --hp 450-620 --price '$100,000-$199,999' --torque 500-750 --car-type Sports\n  carmatch similar 'Porsche 911' --top-k 3\n  carmatch doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recommend the best-fit car for a full set of constraints and weights")]
    Recommend(RecommendArgs),
    #[command(about = "List the cars most similar to a named car")]
    Similar(SimilarArgs),
    #[command(about = "Summarise the loaded catalogue and its derived structures")]
    Inspect(InspectArgs),
    #[command(about = "List the allowed value of every constraint")]
    Options {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Validate config, catalogue load, and derived structure consistency")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}

impl Command {
    fn runtime(&self) -> Option<&RuntimeArgs> {
        match self {
            Command::Recommend(args) => Some(&args.runtime),
            Command::Similar(args) => Some(&args.runtime),
            Command::Inspect(args) => Some(&args.runtime),
            Command::Doctor { runtime, .. } | Command::Config { runtime } => Some(runtime),
            Command::Options { .. } => None,
        }
    }
}

/// Installs a stderr subscriber so stdout only carries command output.
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(logging.level.trim()))
        .with_context(|| format!("invalid log level `{}`", logging.level))?;
    let builder =
        tracing_subscriber::fmt().with_target(false).with_env_filter(filter).with_writer(io::stderr);

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("could not install log subscriber: {error}"))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Commands report configuration errors themselves; logging falls back to
    // defaults so that those reports still get emitted.
    let logging = cli
        .command
        .runtime()
        .and_then(|runtime| AppConfig::load(runtime.load_options()).ok())
        .map(|config| config.logging)
        .unwrap_or_else(|| AppConfig::default().logging);
    if let Err(error) = init_logging(&logging) {
        eprintln!("warning: {error:#}");
    }

    let result = match &cli.command {
        Command::Recommend(args) => commands::recommend::run(args),
        Command::Similar(args) => commands::similar::run(args),
        Command::Inspect(args) => commands::inspect::run(args),
        Command::Options { json } => commands::options::run(*json),
        Command::Doctor { json, runtime } => doctor::run(runtime, *json),
        Command::Config { runtime } => commands::config::run(runtime),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
