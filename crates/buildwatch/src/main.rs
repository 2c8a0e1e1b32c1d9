//! Buildwatch - Jenkins failure triage CLI.
//!
//! Scans failed builds across all jobs inside a time window, isolates the
//! failure line of each log, classifies and aggregates the results, then
//! reports to the console and (optionally) Slack.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};

use buildwatch::config::Config;
use buildwatch::console;
use buildwatch::jenkins::JenkinsClient;
use buildwatch::runner;
use buildwatch::slack::SlackNotifier;

#[derive(Parser)]
#[command(name = "buildwatch")]
#[command(about = "Jenkins failure triage - scan, classify and report failed builds", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the scan window in hours
    #[arg(long)]
    window_hours: Option<u64>,

    /// Override the per-job failed-build limit
    #[arg(long)]
    limit: Option<usize>,

    /// Console output only, no Slack notification
    #[arg(long)]
    no_slack: bool,

    /// Print the finalized report as JSON instead of the console summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref());
    if let Some(hours) = cli.window_hours {
        config.analysis.window_hours = hours;
    }
    if let Some(limit) = cli.limit {
        config.analysis.max_builds_per_job = limit;
    }
    if config.jenkins.base_url.is_empty() {
        bail!("Jenkins base URL not configured (set JENKINS_URL or [jenkins] base_url)");
    }

    info!("Buildwatch v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Scanning the last {}h, up to {} failed builds per job",
        config.analysis.window_hours, config.analysis.max_builds_per_job
    );

    let client = JenkinsClient::new(&config.jenkins)?;
    let summary = runner::process_failed_builds(&client, &config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary.report)?);
    } else {
        console::print_summary(&summary.report, summary.failed_jobs, summary.failed_builds);
    }

    if !cli.no_slack {
        let notifier = SlackNotifier::new(&config.slack);
        if let Err(e) = notifier
            .send_report(
                &summary,
                config.analysis.window_hours,
                config.analysis.max_builds_per_job,
            )
            .await
        {
            warn!("Slack notification failed: {:#}", e);
        }
    }

    info!("Jenkins failure analysis completed");
    Ok(())
}
