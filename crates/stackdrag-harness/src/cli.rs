use std::path::PathBuf;

use clap::Parser;
use stackdrag_core::CoordinatorConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{HarnessError, Result};
use crate::replay::replay;
use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(
    name = "stackdrag-harness",
    about = "Replay scripted drag scenarios against in-memory folders",
    version
)]
pub struct Cli {
    /// Scenario file (JSON).
    pub scenario: PathBuf,

    /// Coordinator config (TOML, or JSON with a `.json` extension).
    /// Overrides any `config` embedded in the scenario.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the replay report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let scenario = Scenario::load(&cli.scenario)?;
    let config = match &cli.config {
        Some(path) if !path.exists() => {
            return Err(HarnessError::MissingPath { path: path.clone() });
        }
        Some(path) => Some(CoordinatorConfig::from_file(path)?),
        None => None,
    };

    let report = replay(&scenario, config)?;
    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| HarnessError::invalid(format!("report serialization: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
