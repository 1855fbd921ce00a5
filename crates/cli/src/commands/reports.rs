//! Insight and statistics commands

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::client::{ApiClient, InsightsReport, Statistics};
use crate::output::{color_severity, print_json, print_success, print_table, OutputFormat};

/// Row for count breakdown tables
#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Count")]
    count: u64,
}

fn count_rows(counts: &BTreeMap<String, u64>) -> Vec<CountRow> {
    let mut rows: Vec<CountRow> = counts
        .iter()
        .map(|(name, count)| CountRow {
            name: name.clone(),
            count: *count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Show prioritized insights for the last 24 hours
pub async fn insights(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report: InsightsReport = client.get("api/v1/insights").await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "{} total anomalies, {} in the last 24 hours\n",
                report.total_anomalies, report.recent_24h
            );

            if report.insights.is_empty() {
                print_success("No insights, nothing needs attention");
                return Ok(());
            }

            for insight in &report.insights {
                println!(
                    "[{}] {}",
                    color_severity(&insight.priority),
                    insight.title.bold()
                );
                println!("  {}", insight.message);
                println!("  {} {}\n", "→".cyan(), insight.recommendation);
            }
        }
    }

    Ok(())
}

/// Show all-time anomaly statistics
pub async fn stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: Statistics = client.get("api/v1/statistics").await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            println!("Total:        {}", stats.total);
            println!("Unresolved:   {}", stats.unresolved_count);
            println!("Resolved:     {}", stats.resolved_count);
            println!("Acknowledged: {}", stats.acknowledged_count);

            if !stats.by_severity.is_empty() {
                println!("\nBy severity:");
                print_table(count_rows(&stats.by_severity));
            }
            if !stats.by_metric.is_empty() {
                println!("\nBy metric:");
                print_table(count_rows(&stats.by_metric));
            }
        }
    }

    Ok(())
}
