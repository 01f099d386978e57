//! Gridfall confidential-execution binary
//!
//! Runs one host task (`roles`, `action` or `winners`) against the request in
//! the input directory and writes its results to the output directory.

use clap::{Parser, Subcommand};
use gridfall::{
    config::{ConfigLoader, GridfallConfig},
    errors::GridfallResult,
    host::{run_task, HostTask},
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Gridfall game engine CLI
#[derive(Parser)]
#[command(name = "gridfall")]
#[command(about = "Hidden-role elimination game engine for confidential execution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the request file
    #[arg(long, global = true, env = "IEXEC_IN", default_value = "/iexec_in")]
    input_dir: PathBuf,

    /// Directory receiving the result files
    #[arg(long, global = true, env = "IEXEC_OUT", default_value = "/iexec_out")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Deal secret roles to a roster of 10 players
    Roles,
    /// Resolve one scan or exit against a game state
    Action,
    /// Compute the winners of a finished game
    Winners,
}

impl From<&Commands> for HostTask {
    fn from(command: &Commands) -> Self {
        match command {
            Commands::Roles => HostTask::Roles,
            Commands::Action => HostTask::Action,
            Commands::Winners => HostTask::Winners,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gridfall: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    let task = HostTask::from(&cli.command);
    match run_task(task, &cli.input_dir, &cli.output_dir, &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn load_config(cli: &Cli) -> GridfallResult<GridfallConfig> {
    let loader = match cli.config {
        Some(ref path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    loader.load()
}

fn init_tracing(config: &GridfallConfig) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();
}
