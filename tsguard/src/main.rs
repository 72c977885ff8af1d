//! Detector configuration validation tool.
//!
//! Reads a detector document, validates it and prints the normalized form
//! with every default resolved. The first violated invariant is reported
//! and the process exits non-zero.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tsguard_core::{Config, ParseOptions, TimeSeriesSettings, TsGuardError, logging::init_logging};

#[derive(Parser)]
#[command(name = "tsguard")]
#[command(about = "Time-series anomaly detector configuration validator")]
#[command(version)]
#[command(long_about = "
tsguard - Validate and normalize anomaly detector configurations

Checks a detector document against the same rules the detection engine
applies: name, indices, time field, interval units and signs, filter and
feature query shapes, shingle size, custom result index naming, recency
emphasis, imputation fill values and suppression rules.

EXAMPLES:
  tsguard validate --input detector.json
  tsguard validate --input detector.json --settings settings.json -v
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a detector document and print its normalized form
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Detector document to validate
    #[arg(short, long, help = "Path to the detector JSON document")]
    pub input: PathBuf,

    /// Settings overriding the built-in defaults
    #[arg(
        short,
        long,
        env = "TSGUARD_SETTINGS",
        help = "Path to a JSON settings file (missing keys keep their defaults)"
    )]
    pub settings: Option<PathBuf>,

    /// Persisted detector id
    #[arg(long, help = "Detector id to attach to the configuration")]
    pub id: Option<String>,

    /// Output file path
    #[arg(short, long, help = "Write the normalized document here instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Command::Validate(args) => validate(args),
    }
}

/// Validates one detector document.
fn validate(args: &ValidateArgs) -> Result<()> {
    let settings = match &args.settings {
        Some(path) => TimeSeriesSettings::from_json_file(path)?,
        None => TimeSeriesSettings::default(),
    };
    debug!(?settings, "Using settings");

    let document = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read detector document '{}'", args.input.display()))?;

    let mut options = ParseOptions::new().with_settings(settings);
    if let Some(id) = &args.id {
        options = options.with_id(id.clone());
    }

    let config = Config::parse_with(&document, &options).map_err(|e| describe(e, &args.input))?;
    info!(
        detector = config.name(),
        high_cardinality = config.is_high_cardinality(),
        shingle_size = config.shingle_size(),
        "Detector configuration is valid"
    );

    let normalized = config.to_json()?;
    match &args.output {
        Some(path) => std::fs::write(path, normalized + "\n")
            .with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => println!("{}", normalized),
    }
    Ok(())
}

/// Adds the input path and, for validation failures, the offending field.
fn describe(error: TsGuardError, input: &Path) -> anyhow::Error {
    let context = match error.as_validation() {
        Some(validation) => format!(
            "{} is invalid ({})",
            input.display(),
            validation.issue_type()
        ),
        None => format!("{} could not be parsed", input.display()),
    };
    anyhow::Error::new(error).context(context)
}
