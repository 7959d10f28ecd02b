use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueHint};
use sinelab::{stream, LabConfig, LabMachine, LabSession};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod tui;

#[derive(Parser)]
#[command(version, about = "Learn amplitude, frequency and phase by matching sine waves")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the lab in the terminal
    Run(RunArgs),

    /// Drive the lab with JSON-lines commands on stdin, printing a frame per command
    Stream(LabArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct LabArgs {
    /// The config file to use instead of the per-user one
    #[arg(long, env = "SINELAB_CONFIG", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Seed for challenge targets, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    lab: LabArgs,

    /// Frames per second
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u16).range(1..=120))]
    fps: u16,

    /// Write logs to this file
    #[arg(long, value_hint = ValueHint::FilePath)]
    log_file: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, env = "SINELAB_CONFIG", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Print the config JSON schema instead
    #[cfg(feature = "json-schema")]
    #[arg(long)]
    schema: bool,
}

enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Off,
}

const DEFAULT_LOG_FILTER: &str = "sinelab=info";

/// The user's `RUST_LOG` directives, or [DEFAULT_LOG_FILTER] when unset or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_logging(target: LogTarget) -> anyhow::Result<()> {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
        }
        LogTarget::File(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        // the terminal host owns the screen
        LogTarget::Off => {}
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LabConfig> {
    match path {
        Some(path) => LabConfig::load(path).with_context(|| format!("loading config from {}", path.display())),
        None => match LabConfig::default_path() {
            Some(path) => {
                LabConfig::load_or_default(&path).with_context(|| format!("loading config from {}", path.display()))
            }
            None => Ok(LabConfig::default()),
        },
    }
}

fn build_machine(args: &LabArgs) -> anyhow::Result<LabMachine> {
    let config = load_config(args.config.as_deref())?;
    let machine = match args.seed {
        Some(seed) => LabMachine::with_seed(config, seed),
        None => LabMachine::with_random_targets(config),
    };
    Ok(machine)
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let target = match &args.log_file {
        Some(path) => LogTarget::File(path),
        None => LogTarget::Off,
    };
    init_logging(target)?;
    let session = LabSession::new(build_machine(&args.lab)?);
    match tui::run(&session, args.fps).context("running terminal lab")? {
        tui::Outcome::Exited(values) => {
            println!("{}", sinelab::formula::reveal(&values));
        }
        tui::Outcome::Quit => {}
    }
    Ok(())
}

fn run_stream(args: LabArgs) -> anyhow::Result<()> {
    init_logging(LogTarget::Stderr)?;
    let session = LabSession::new(build_machine(&args)?);
    let processed = stream::run_stream(&session, io::stdin().lock(), io::stdout().lock())?;
    tracing::info!(processed, "stream finished");
    Ok(())
}

#[cfg(feature = "json-schema")]
fn print_schema(args: &ConfigArgs) -> anyhow::Result<bool> {
    if !args.schema {
        return Ok(false);
    }
    let schema = schemars::schema_for!(LabConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(true)
}

#[cfg(not(feature = "json-schema"))]
fn print_schema(_: &ConfigArgs) -> anyhow::Result<bool> {
    Ok(false)
}

fn print_config(args: ConfigArgs) -> anyhow::Result<()> {
    init_logging(LogTarget::Stderr)?;
    if print_schema(&args)? {
        return Ok(());
    }
    let config = load_config(args.config.as_deref())?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::Stream(args) => run_stream(args),
        Command::Config(args) => print_config(args),
    }
}
