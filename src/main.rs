use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use draftguard::{Config, Mode, Orchestrator, RoundReport, Session};

#[derive(Parser)]
#[command(
    name = "draftguard",
    about = "Analyze documents and refine them through a rewrite service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze files (reads stdin if none provided) and print JSON results
    Analyze { files: Vec<PathBuf> },
    /// Run refinement rounds and print the session as JSON
    Refine {
        /// Input file (reads stdin if omitted)
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ModeArg::Improve)]
        mode: ModeArg,
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        /// Override DRAFTGUARD_MODEL
        #[arg(long)]
        model: Option<String>,
        /// Override DRAFTGUARD_ORACLE_TIMEOUT_SECS
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Generate,
    Improve,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Generate => Mode::Generate,
            ModeArg::Improve => Mode::Improve,
        }
    }
}

#[derive(Serialize)]
struct RefineOutput<'a> {
    session: &'a Session,
    rounds: &'a [RoundReport],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Error reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

fn run_analyze(files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        let result = draftguard::analyze(&read_input(None)?)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    for path in files {
        let result = draftguard::analyze(&read_input(Some(path))?)
            .with_context(|| format!("Error analyzing {}", path.display()))?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

async fn run_refine(
    file: Option<&PathBuf>,
    mode: Mode,
    rounds: u32,
    config: Config,
) -> Result<()> {
    if rounds == 0 {
        bail!("--rounds must be at least 1");
    }
    let input = read_input(file)?;
    let orchestrator = Orchestrator::new(config.claude_oracle()?).with_timeout(config.oracle_timeout);

    let mut session = Session::new();
    let mut reports = Vec::new();
    let mut error = None;

    for n in 0..rounds {
        // Later rounds always revise the previous output.
        let (round_mode, document) = if n == 0 {
            (mode, Some(input.as_str()))
        } else {
            (Mode::Improve, None)
        };
        match orchestrator.round(&mut session, round_mode, document).await {
            Ok(report) => {
                info!(version = report.version, fixed = ?report.fixed, "Round complete");
                reports.push(report);
            }
            Err(e) => {
                error = Some(e.to_string());
                break;
            }
        }
    }

    let output = RefineOutput {
        session: &session,
        rounds: &reports,
        error,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    output.status()
}

impl RefineOutput<'_> {
    /// A failed round still prints the session, but the process fails.
    fn status(&self) -> Result<()> {
        match &self.error {
            Some(e) => bail!("Round {} failed: {}", self.rounds.len() + 1, e),
            None => Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("draftguard=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { files } => run_analyze(&files),
        Command::Refine {
            file,
            mode,
            rounds,
            model,
            timeout_secs,
        } => {
            let mut config = Config::from_env();
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(secs) = timeout_secs {
                config.oracle_timeout = Duration::from_secs(secs);
            }
            run_refine(file.as_ref(), mode.into(), rounds, config).await
        }
    }
}
