//! `rambler` binary.
//!
//! Usage:
//!   rambler triage --file notes.txt --mode loose --strategy discourse
//!   cat notes.txt | rambler triage --pretty
//!   rambler analyze "asdflkjasdf"
//!   rambler infer-url "that blue bird social media site" --validate
//!
//! Reports go to stdout as JSON; logs go to stderr.
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - log filter (default: `info,rambler_triage=debug`)
//! - `OPENAI_API_KEY` - API key for the relationship classifier

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rambler_triage::{
    ChunkingStrategy, QualityClassifier, SegmentationMode, TriageConfig, TriageOrchestrator,
    UrlInferencer,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rambler")]
#[command(about = "Triage raw text captures into thoughts, URLs, todos and quarantine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage a text dump read from a file or stdin
    Triage(TriageArgs),

    /// Score the quality of a single fragment
    Analyze {
        text: String,
    },

    /// Resolve a vague website description to a URL
    #[command(name = "infer-url")]
    InferUrl {
        text: String,

        /// HEAD-check the inferred URL
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Args)]
struct TriageArgs {
    /// Input file (reads stdin when omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Segmentation mode: strict, balanced or loose
    #[arg(short, long)]
    mode: Option<SegmentationMode>,

    /// Chunking strategy: naive or discourse
    #[arg(short, long)]
    strategy: Option<ChunkingStrategy>,

    /// TOML config file
    #[arg(short, long, env = "RAMBLER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rambler_triage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Triage(args) => triage(args, cli.pretty).await,
        Commands::Analyze { text } => {
            let text = non_empty(&text)?;
            print_json(&QualityClassifier::new().analyze(text), cli.pretty)
        }
        Commands::InferUrl { text, validate } => infer_url(&text, validate, cli.pretty).await,
    }
}

async fn triage(args: TriageArgs, pretty: bool) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => TriageConfig::from_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => TriageConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    let mode = args.mode.unwrap_or(config.segmentation_mode);

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let orchestrator = TriageOrchestrator::from_config(config);
    let report = orchestrator.process(&text, mode).await?;

    info!(
        run_id = %report.run_id,
        fragments = report.summary.total_chunks,
        quarantined = orchestrator.quarantine_len(),
        "Report ready"
    );
    println!("{}", report.to_json(pretty)?);
    Ok(())
}

async fn infer_url(text: &str, validate: bool, pretty: bool) -> anyhow::Result<()> {
    let text = non_empty(text)?;
    let inferencer = UrlInferencer::new();
    let explicit = inferencer.extract_explicit(text);
    if !explicit.is_empty() {
        return print_json(&explicit, pretty);
    }

    let mut inferred = inferencer.infer(text).await;
    if validate {
        inferred = inferencer.apply_validation(inferred).await;
    }
    print_json(&inferred, pretty)
}

fn non_empty(text: &str) -> anyhow::Result<&str> {
    if text.trim().is_empty() {
        anyhow::bail!("Input text cannot be empty");
    }
    Ok(text)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
