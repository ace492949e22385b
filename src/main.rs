//! GuardDog - Risk classification and decision engine
//!
//! Command-line front end over the library. Inputs come from a file or
//! stdin (`-`); results are printed to stdout as pretty JSON. Logs go to
//! stderr so output stays pipeable.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use guarddog::{
    api::ScanContentRequest,
    compliance::{default_rules, ComplianceRule, Transaction},
    config::GuardDogConfig,
    monitor::{ApiSourceSnapshot, InMemoryStatsStore},
    CallEvent, GuardEngine,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "guarddog")]
#[command(author = "WalletGyde Team")]
#[command(version)]
#[command(about = "Risk classification and decision engine for API and AI-model traffic")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GUARDDOG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List sensitive data found in text or a JSON payload
    Classify {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Print text with every sensitive span masked
    Redact {
        #[arg(default_value = "-")]
        input: String,
    },

    /// Scan generated content and decide allow, rewrite or block
    Scan {
        #[arg(default_value = "-")]
        input: String,

        /// Source label recorded on incidents
        #[arg(long)]
        source: Option<String>,
    },

    /// Evaluate one call event against a rule set
    Monitor {
        /// JSON file holding one call event, or `-` for stdin
        #[arg(long)]
        event: String,

        /// JSON array of rules; the starter rule set when omitted
        #[arg(long)]
        rules: Option<String>,
    },

    /// Run transaction checks over a JSON array of transactions
    Transactions {
        #[arg(default_value = "-")]
        input: String,

        #[arg(long, default_value = "transactions")]
        source: String,
    },

    /// Run anomaly heuristics over source snapshots and recent calls
    Anomalies {
        /// JSON file holding `{"sources": [...], "calls": [...]}`
        #[arg(default_value = "-")]
        input: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Deserialize)]
struct AnomalyInput {
    #[serde(default)]
    sources: Vec<ApiSourceSnapshot>,
    #[serde(default)]
    calls: Vec<CallEvent>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("guarddog={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => GuardDogConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GuardDogConfig::default(),
    };

    if let Commands::Config { default } = cli.command {
        return show_config(if default { None } else { Some(&config) });
    }

    let engine = GuardEngine::new(config, Arc::new(InMemoryStatsStore::new()))?;

    match cli.command {
        Commands::Classify { input } => {
            let content = read_input(&input)?;
            print_json(&engine.classify(&content)?)?;
        }
        Commands::Redact { input } => {
            let content = read_input(&input)?;
            engine.check_input(&content)?;
            println!("{}", engine.classifier().redact(&content));
        }
        Commands::Scan { input, source } => {
            let mut request = ScanContentRequest::new(read_input(&input)?);
            if let Some(source) = source {
                request.metadata.insert("source".to_string(), source.into());
            }
            print_json(&engine.scan_content(&request)?)?;
        }
        Commands::Monitor { event, rules } => {
            let event: CallEvent = parse_json(&event)?;
            let rules: Vec<ComplianceRule> = match rules {
                Some(path) => parse_json(&path)?,
                None => default_rules(),
            };
            print_json(&engine.monitor_call(&event, &rules)?)?;
        }
        Commands::Transactions { input, source } => {
            let transactions: Vec<Transaction> = parse_json(&input)?;
            tracing::info!(count = transactions.len(), "Scanning transactions");
            print_json(&engine.scan_transactions(&transactions, &source))?;
        }
        Commands::Anomalies { input } => {
            let data: AnomalyInput = parse_json(&input)?;
            let detector = engine.anomaly_detector();
            let mut alerts = detector.detect_source_anomalies(&data.sources, Utc::now());
            alerts.extend(detector.detect_temporal_anomalies(&data.calls));
            alerts.extend(detector.detect_geographic_anomalies(&data.calls));
            print_json(&alerts)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(Path::new(input)).with_context(|| format!("Failed to read {}", input))
}

fn parse_json<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
    let content = read_input(input)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", input))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_config(config: Option<&GuardDogConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
