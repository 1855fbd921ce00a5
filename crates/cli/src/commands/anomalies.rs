//! Anomaly listing and lifecycle commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{AnomalyRecord, ApiClient, LifecycleResponse, ResolveRequest};
use crate::output::{
    color_confidence, color_severity, color_state, format_timestamp, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

/// Row for anomalies table
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Detected")]
    timestamp: String,
}

/// Build the list query string; `None` filters are omitted
fn list_path(limit: Option<usize>, severity: Option<&str>, resolved: Option<bool>) -> String {
    let mut params = Vec::new();
    if let Some(limit) = limit {
        params.push(format!("limit={}", limit));
    }
    if let Some(severity) = severity {
        params.push(format!("severity={}", severity.to_lowercase()));
    }
    if let Some(resolved) = resolved {
        params.push(format!("resolved={}", resolved));
    }

    if params.is_empty() {
        "api/v1/anomalies".to_string()
    } else {
        format!("api/v1/anomalies?{}", params.join("&"))
    }
}

/// List stored anomalies, most recent first
pub async fn list(
    client: &ApiClient,
    limit: Option<usize>,
    severity: Option<String>,
    resolved: Option<bool>,
    format: OutputFormat,
) -> Result<()> {
    let path = list_path(limit, severity.as_deref(), resolved);
    let records: Vec<AnomalyRecord> = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No anomalies found");
                return Ok(());
            }

            let rows: Vec<AnomalyRow> = records
                .iter()
                .map(|r| AnomalyRow {
                    id: r.id.clone(),
                    metric: r.metric.clone(),
                    value: format!("{:.3}", r.value),
                    confidence: color_confidence(r.confidence),
                    severity: color_severity(&r.severity),
                    state: color_state(r.state()),
                    timestamp: format_timestamp(&r.timestamp),
                })
                .collect();

            print_table(rows);
            println!("\nTotal: {} anomalies", records.len());
        }
    }

    Ok(())
}

/// Acknowledge an anomaly
pub async fn acknowledge(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let path = format!("api/v1/anomalies/{}/acknowledge", id);
    let response: LifecycleResponse = client.post(&path, &serde_json::json!({})).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!("Anomaly {} acknowledged", response.id)),
    }

    Ok(())
}

/// Resolve an anomaly with an optional note
pub async fn resolve(
    client: &ApiClient,
    id: &str,
    note: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/anomalies/{}/resolve", id);
    let request = ResolveRequest {
        note: note.unwrap_or_default(),
    };
    let response: LifecycleResponse = client.post(&path, &request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!("Anomaly {} resolved", response.id)),
    }

    Ok(())
}
