use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use avot_core::{AppConfig, AvotError, CouncilSpec, WorkflowSpec};
use avot_council::{CouncilOrchestrator, Scenario};
use avot_runtime::{has_errors, prepare, stub_capabilities, validate, GraphExecutor};

#[derive(Parser)]
#[command(name = "avot", version, about = "Compile and run AVOT workflow graphs and councils")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "avot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a workflow spec and print its diagnostics
    Validate {
        /// Workflow spec (TOML)
        spec: PathBuf,
    },
    /// Execute one AVOT with the stub providers
    Run {
        /// Workflow spec (TOML)
        spec: PathBuf,
        /// Request text, passed to the graph as {"query": ...}
        #[arg(short, long)]
        input: String,
    },
    /// Route a request through a council of AVOTs
    Council {
        /// Council spec (TOML)
        council: PathBuf,
        /// Member workflow specs
        #[arg(required = true)]
        avots: Vec<PathBuf>,
        /// Request text
        #[arg(short, long)]
        input: String,
    },
    /// Run a scenario file and check its expected outcome
    Scenario {
        /// Scenario file (TOML)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    // stdout carries JSON results only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { spec } => {
            let spec = WorkflowSpec::load(&spec)?;
            let diags = validate(&spec);
            for diag in &diags {
                println!("{}", diag);
            }
            if has_errors(&diags) {
                return Ok(ExitCode::FAILURE);
            }
            println!("OK: {}", spec.identity.avot_id);
        }
        Commands::Run { spec, input } => {
            let avot = prepare(WorkflowSpec::load(&spec)?, &config.defaults)?;
            let run = executor(&config)
                .run(&avot, json!({ "query": input }))
                .await?;

            let report = json!({
                "result": run.result,
                "resonance": run.state.resonance(),
                "ethics_flags": run.state.ethics_flags(),
                "trace": run.state.trace(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Council {
            council,
            avots,
            input,
        } => {
            let council = CouncilSpec::load(&council)?;
            let agents = avots
                .iter()
                .map(|path| prepare(WorkflowSpec::load(path)?, &config.defaults))
                .collect::<avot_core::Result<Vec<_>>>()?;
            info!(members = council.members.len(), agents = agents.len(), "Council loaded");

            let outcome = CouncilOrchestrator::new(council, executor(&config))
                .with_agents(agents)
                .handle(&input)
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Scenario { file } => {
            let scenario = Scenario::load(&file)?;
            let report = scenario.run(&config.defaults, executor(&config)).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.passed() {
                for mismatch in &report.mismatches {
                    error!(scenario = %report.name, "{}", mismatch);
                }
                return Ok(ExitCode::FAILURE);
            }
            info!(scenario = %report.name, "Scenario passed");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// A missing config file means defaults; a malformed one is an error.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    match AppConfig::load(path) {
        Ok(config) => Ok(config),
        Err(AvotError::ConfigNotFound(_)) => Ok(AppConfig::default()),
        Err(e) => Err(e.into()),
    }
}

/// Stub-backed executor that cancels its run on Ctrl-C.
fn executor(config: &AppConfig) -> GraphExecutor {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });
    GraphExecutor::new(stub_capabilities(&config.stub)).with_cancellation(token)
}
