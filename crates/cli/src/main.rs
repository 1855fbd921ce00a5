//! Metric Sentinel CLI
//!
//! A command-line client for the sentinel agent: ingest samples, run
//! detections and manage the anomaly lifecycle.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{anomalies, metrics, reports};

/// Metric Sentinel CLI
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author, version, about = "CLI for the Metric Sentinel anomaly detection agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via SENTINEL_API_URL env var)
    #[arg(long, env = "SENTINEL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a metric sample
    Ingest {
        /// Metric name
        metric: String,

        /// Sample value
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// RFC 3339 timestamp (defaults to the agent's clock)
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Check a value against the metric's history without recording it
    Detect {
        /// Metric name
        metric: String,

        /// Value to check
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Sensitivity (low, medium, high)
        #[arg(long, short)]
        sensitivity: Option<String>,
    },

    /// Detect, ingest and record a value in one step
    Observe {
        /// Metric name
        metric: String,

        /// Observed value
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Sensitivity (low, medium, high)
        #[arg(long, short)]
        sensitivity: Option<String>,
    },

    /// Manage recorded anomalies
    #[command(subcommand)]
    Anomalies(AnomalyCommands),

    /// Show insights for the last 24 hours
    Insights,

    /// Show all-time anomaly statistics
    Stats,
}

#[derive(Subcommand)]
pub enum AnomalyCommands {
    /// List anomalies, most recent first
    List {
        /// Maximum number of anomalies to show
        #[arg(long, short)]
        limit: Option<usize>,

        /// Filter by severity (low, medium, high, critical)
        #[arg(long)]
        severity: Option<String>,

        /// Only resolved anomalies
        #[arg(long, conflicts_with = "unresolved")]
        resolved: bool,

        /// Only unresolved anomalies
        #[arg(long)]
        unresolved: bool,
    },

    /// Acknowledge an anomaly
    Ack {
        /// Anomaly ID
        id: String,
    },

    /// Resolve an anomaly
    Resolve {
        /// Anomaly ID
        id: String,

        /// Resolution note
        #[arg(long, short)]
        note: Option<String>,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;

    let format = match cli.format {
        Some(format) => format,
        None => config
            .default_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default(),
    };
    let default_sensitivity = config.default_sensitivity.clone();

    // Initialize client
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Ingest {
            metric,
            value,
            timestamp,
        } => {
            metrics::ingest(&client, &metric, value, timestamp, format).await?;
        }
        Commands::Detect {
            metric,
            value,
            sensitivity,
        } => {
            let sensitivity = sensitivity.or(default_sensitivity);
            metrics::detect(&client, &metric, value, sensitivity, format).await?;
        }
        Commands::Observe {
            metric,
            value,
            sensitivity,
        } => {
            let sensitivity = sensitivity.or(default_sensitivity);
            metrics::observe(&client, &metric, value, sensitivity, format).await?;
        }
        Commands::Anomalies(anomaly_cmd) => match anomaly_cmd {
            AnomalyCommands::List {
                limit,
                severity,
                resolved,
                unresolved,
            } => {
                let resolved = match (resolved, unresolved) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                anomalies::list(&client, limit, severity, resolved, format).await?;
            }
            AnomalyCommands::Ack { id } => {
                anomalies::acknowledge(&client, &id, format).await?;
            }
            AnomalyCommands::Resolve { id, note } => {
                anomalies::resolve(&client, &id, note, format).await?;
            }
        },
        Commands::Insights => {
            reports::insights(&client, format).await?;
        }
        Commands::Stats => {
            reports::stats(&client, format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
