mod config;
mod error;
mod feature;
mod patch;
mod pipeline;
mod process;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::feature::Registry;
use crate::pipeline::Pipeline;
use crate::process::TokioRunner;

#[derive(Parser)]
#[command(
  name = "brezn-agent",
  about = "Implements the next pending Brezn MVP feature and gates it behind the test suite"
)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,

  /// Path to config file (defaults to brezn-agent.yaml if present)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
  /// Analyze, implement the next pending feature, validate, report (default)
  Run {
    /// Also write the JSON report to this file
    #[arg(long)]
    output: Option<PathBuf>,
  },
  /// Print feature status without modifying anything
  Status,
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(code) => std::process::exit(code),
    Err(e) => {
      error!("{e}");
      std::process::exit(1);
    }
  }
}

async fn run(cli: Cli) -> Result<i32> {
  let config = Config::resolve(cli.config.as_deref())?;
  let repo_root = std::env::current_dir()?;
  let registry = Registry::builtin()?;

  match cli.command.unwrap_or(Commands::Run { output: None }) {
    Commands::Run { output } => cmd_run(&registry, &config, &repo_root, output.as_deref()).await,
    Commands::Status => cmd_status(&registry, &config, &repo_root),
  }
}

async fn cmd_run(
  registry: &Registry,
  config: &Config,
  repo_root: &Path,
  output: Option<&Path>,
) -> Result<i32> {
  info!("brezn-agent starting in {}", repo_root.display());

  let runner = TokioRunner;
  let report = Pipeline::new(registry, config, repo_root, &runner)
    .run()
    .await?;

  let json = serde_json::to_string_pretty(&report)?;
  println!("{json}");

  if let Some(path) = output {
    std::fs::write(path, format!("{json}\n"))?;
    info!("report written to {}", path.display());
  }

  Ok(report.exit_code())
}

fn cmd_status(registry: &Registry, config: &Config, repo_root: &Path) -> Result<i32> {
  let runner = TokioRunner;
  let status = Pipeline::new(registry, config, repo_root, &runner).status()?;

  println!("{}", serde_json::to_string_pretty(&status)?);
  Ok(0)
}
