//! Sample ingestion and detection commands

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, DetectRequest, IngestRequest, MetricSample, Observation, Verdict};
use crate::output::{
    color_confidence, color_severity, print_info, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Row for the per-method verdict table
#[derive(Tabled)]
struct MethodRow {
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Flagged")]
    flagged: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Send one sample to the agent
pub async fn ingest(
    client: &ApiClient,
    metric: &str,
    value: f64,
    timestamp: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(ts) = &timestamp {
        chrono::DateTime::parse_from_rfc3339(ts)
            .with_context(|| format!("Invalid RFC 3339 timestamp '{}'", ts))?;
    }

    let request = IngestRequest {
        metric: metric.to_string(),
        value,
        timestamp,
    };
    let sample: MetricSample = client.post("api/v1/metrics", &request).await?;

    match format {
        OutputFormat::Json => print_json(&sample)?,
        OutputFormat::Table => print_success(&format!(
            "Ingested {} = {} at {}",
            sample.metric_name, sample.value, sample.timestamp
        )),
    }

    Ok(())
}

/// Judge a value against the stored history without recording it
pub async fn detect(
    client: &ApiClient,
    metric: &str,
    value: f64,
    sensitivity: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = DetectRequest {
        metric: metric.to_string(),
        value,
        sensitivity,
    };
    let verdict: Verdict = client.post("api/v1/detect", &request).await?;

    match format {
        OutputFormat::Json => print_json(&verdict)?,
        OutputFormat::Table => print_verdict(metric, value, &verdict),
    }

    Ok(())
}

/// Detect, ingest and record in one call
pub async fn observe(
    client: &ApiClient,
    metric: &str,
    value: f64,
    sensitivity: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = DetectRequest {
        metric: metric.to_string(),
        value,
        sensitivity,
    };
    let observation: Observation = client.post("api/v1/observe", &request).await?;

    match format {
        OutputFormat::Json => print_json(&observation)?,
        OutputFormat::Table => {
            print_verdict(metric, value, &observation.verdict);
            if let Some(record) = &observation.record {
                println!(
                    "\nRecorded {} ({})",
                    record.id.bold(),
                    color_severity(&record.severity)
                );
            }
        }
    }

    Ok(())
}

fn print_verdict(metric: &str, value: f64, verdict: &Verdict) {
    let Some(methods) = &verdict.methods else {
        print_info(&format!(
            "{}: {}",
            metric,
            verdict.message.as_deref().unwrap_or("no verdict")
        ));
        return;
    };

    if verdict.is_anomaly {
        print_warning(&format!("{} = {} is anomalous", metric, value));
    } else {
        print_success(&format!("{} = {} looks normal", metric, value));
    }
    println!(
        "Confidence: {} ({}/{} methods)",
        color_confidence(verdict.confidence),
        verdict.anomaly_count,
        verdict.total_methods
    );

    let rows: Vec<MethodRow> = methods
        .iter()
        .map(|(name, vote)| MethodRow {
            method: name.clone(),
            flagged: if vote.flagged {
                "yes".red().to_string()
            } else {
                "no".to_string()
            },
            detail: vote
                .detail
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "not enough samples".dimmed().to_string()),
        })
        .collect();
    print_table(rows);
}
