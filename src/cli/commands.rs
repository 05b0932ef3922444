//! CLI command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::classifier::{Category, ContractClassifier, MatchSource};
use crate::config::Config;
use crate::analysis::TransferRecord;
use crate::ingest::{load_casts, load_contracts, FallbackSource, TransferSource};
use crate::pipeline::AnalysisPipeline;
use crate::report::{ActivityView, CategoryStatus, CombinedReport, HistoricalReport, ReportView};

/// Rows of the ranked recipient table shown in the text summary
const SUMMARY_RECIPIENTS: usize = 10;

/// Fetch transfers from the given files, or the configured ones
async fn load_transfers(config: &Config, inputs: &[PathBuf]) -> Result<Vec<TransferRecord>> {
    let inputs = if inputs.is_empty() {
        config.ingest.inputs.as_slice()
    } else {
        inputs
    };
    if inputs.is_empty() {
        anyhow::bail!("No input files given (use --input or [ingest].inputs)");
    }

    let source = FallbackSource::from_paths(
        inputs,
        Duration::from_millis(config.ingest.source_timeout_ms),
    );
    info!(sources = source.len(), "Loading transfers...");
    source.fetch().await.context("Failed to load transfers")
}

/// Analyze transfer files and print the combined report
pub async fn analyze(
    config: &Config,
    inputs: &[PathBuf],
    window_hours: Option<f64>,
    json: bool,
) -> Result<()> {
    let pipeline = AnalysisPipeline::from_config(config, window_hours)
        .context("Failed to build analysis pipeline")?;
    let records = load_transfers(config, inputs).await?;

    let report = pipeline.run(&records, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Print per-day transfer totals for the trailing period
pub async fn history(config: &Config, inputs: &[PathBuf], days: Option<u32>, json: bool) -> Result<()> {
    let pipeline =
        AnalysisPipeline::from_config(config, None).context("Failed to build analysis pipeline")?;
    let records = load_transfers(config, inputs).await?;

    let report = pipeline.history(&records, days, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_history(&report);
    }

    Ok(())
}

/// Score how concentrated cast activity is among authors
pub async fn activity(
    config: &Config,
    input: &Path,
    window_hours: Option<f64>,
    json: bool,
) -> Result<()> {
    let pipeline = AnalysisPipeline::from_config(config, window_hours)
        .context("Failed to build analysis pipeline")?;
    let casts = load_casts(input)
        .await
        .with_context(|| format!("Failed to read casts from {}", input.display()))?;

    let view = pipeline.activity(&casts, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_activity(&view);
    }

    Ok(())
}

/// Classify contracts from a metadata file
pub async fn classify(config: &Config, input: &Path, json: bool) -> Result<()> {
    let classifier = ContractClassifier::new(&config.classifier, &config.categories)
        .context("Failed to build classifier")?;
    let contracts = load_contracts(input)
        .await
        .with_context(|| format!("Failed to read contracts from {}", input.display()))?;

    let mut results = Vec::with_capacity(contracts.len());
    for contract in &contracts {
        match classifier.classify(contract) {
            Ok(classification) => results.push(classification),
            Err(e) => warn!(address = %contract.address, error = %e, "Skipping contract"),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("\n=== CONTRACT CLASSIFICATION ===\n");
    println!("{:<44} {:<12} {}", "ADDRESS", "CATEGORY", "MATCHED BY");
    println!("{}", "-".repeat(80));
    for result in &results {
        let matched_by = match &result.matched_by {
            MatchSource::KnownAddress => "known address".to_string(),
            MatchSource::Pattern(p) => format!("pattern /{}/", p),
            MatchSource::RewardEvents => "reward events".to_string(),
            MatchSource::NoMatch => "-".to_string(),
        };
        println!("{:<44} {:<12} {}", result.address, result.category.as_str(), matched_by);
    }

    let categorized = results.iter().filter(|r| r.category != Category::Unknown).count();
    println!("\n{} of {} contracts categorized", categorized, results.len());

    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.display_summary());
    Ok(())
}

fn print_report(report: &CombinedReport) {
    println!("\n=== REWARD CONCENTRATION ({}h window) ===", report.window_hours);
    println!("Generated: {}", report.timestamp.to_rfc3339());
    println!("Highest risk: {}", report.highest_risk());

    println!("\n--- All transfers ---");
    print_view(&report.global);

    for (category, section) in &report.categories {
        println!("\n--- {} ---", category);
        match section.status {
            CategoryStatus::Active => print_view(&section.report),
            CategoryStatus::Monitoring => println!("Monitoring (no transfers in window)"),
        }
    }
    println!();
}

fn print_view(view: &ReportView) {
    println!(
        "Transfers: {}  Recipients: {}  Volume: {}",
        view.total_transfers, view.unique_recipients, view.total_volume_formatted
    );
    println!(
        "Gini: {:.4}  Top 1%: {:.2}%  Top 5%: {:.2}%  Top 10%: {:.2}%  Largest: {:.2}%",
        view.gini,
        view.top1_share_pct,
        view.top5_share_pct,
        view.top10_share_pct,
        view.largest_recipient_share_pct
    );
    println!(
        "Manipulation score: {} ({})",
        view.manipulation_score, view.risk_level
    );
    if view.alerts.any() {
        println!(
            "ALERT: inequality {}{}",
            view.alerts.inequality,
            if view.alerts.top_share_alert {
                ", top 10% share over threshold"
            } else {
                ""
            }
        );
    }
    for reason in &view.manipulation_reasons {
        println!("  - {}", reason);
    }

    let skipped = view.skipped.malformed();
    if skipped > 0 {
        println!("Skipped malformed records: {}", skipped);
    }

    if !view.top_recipients.is_empty() {
        println!("\n{:<6} {:<44} {:>24} {:>9}", "RANK", "ADDRESS", "AMOUNT", "SHARE");
        for recipient in view.top_recipients.iter().take(SUMMARY_RECIPIENTS) {
            println!(
                "{:<6} {:<44} {:>24} {:>8.2}%",
                recipient.rank, recipient.address, recipient.amount_formatted, recipient.percentage
            );
        }
    }
}

fn print_history(report: &HistoricalReport) {
    println!("\n=== REWARD HISTORY ({} days) ===", report.period_days);
    println!("Generated: {}", report.timestamp.to_rfc3339());

    if report.daily_data.is_empty() {
        println!("No transfers in period\n");
        return;
    }

    println!(
        "\n{:<12} {:>10} {:>10} {:>24} {:>10} {:>24}",
        "DATE", "TRANSFERS", "RECIPIENTS", "VOLUME", "FARCASTER", "CUMULATIVE VOLUME"
    );
    for day in &report.daily_data {
        println!(
            "{:<12} {:>10} {:>10} {:>24} {:>10} {:>24}",
            day.date.to_string(),
            day.total_transfers,
            day.unique_recipients,
            day.total_volume,
            day.farcaster_transfers,
            day.cumulative_volume
        );
    }

    let summary = &report.summary;
    println!(
        "\nDays: {}  Transfers: {} (Farcaster {})  Volume: {} (Farcaster {})",
        summary.total_days,
        summary.total_transfers,
        summary.total_farcaster_transfers,
        summary.total_volume,
        summary.total_farcaster_volume
    );
    println!(
        "Daily average: {} transfers, {} volume\n",
        summary.average_daily_transfers, summary.average_daily_volume
    );
}

fn print_activity(view: &ActivityView) {
    println!("\n=== CAST ACTIVITY ({}h window) ===", view.window_hours);
    println!("Generated: {}", view.timestamp.to_rfc3339());
    println!(
        "Casts: {}  Authors: {}  Per author: {:.2}",
        view.total_casts, view.unique_authors, view.average_casts_per_author
    );
    println!(
        "Top 10% share: {:.2}%  Manipulation score: {}/2",
        view.top10_share_pct, view.manipulation_score
    );

    if !view.top_authors.is_empty() {
        println!("\n{:<6} {:<32} {:>8} {:>9}", "RANK", "AUTHOR", "CASTS", "SHARE");
        for author in &view.top_authors {
            println!(
                "{:<6} {:<32} {:>8} {:>8.2}%",
                author.rank, author.author, author.casts, author.percentage
            );
        }
    }
    println!();
}
