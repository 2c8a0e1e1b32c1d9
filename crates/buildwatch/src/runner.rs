//! Streaming run loop.
//!
//! Processes failed builds one at a time, entirely in memory: fetch one
//! console log, run it through the engine, record the result, move on.
//! Job-level fetch errors skip the job with a warning; a single
//! unreachable build log becomes a LogFetchError record instead of
//! aborting the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use buildwatch_core::aggregate::{LOG_FETCH_ERROR_CATEGORY, LOG_FETCH_ERROR_MESSAGE};
use buildwatch_core::{AggregationStore, FailureReport, TriageEngine, TriageError};

use crate::config::Config;
use crate::jenkins::JenkinsClient;

/// Outcome of one complete scan run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Finalized, sorted snapshot
    pub report: FailureReport,
    /// Jobs with at least one successfully analyzed build log
    pub failed_jobs: usize,
    /// Build logs successfully fetched and analyzed
    pub failed_builds: usize,
}

/// Feed one build's (possibly missing) console log into the store.
///
/// `None` or an empty log records the LogFetchError convention. Returns
/// the category that was recorded.
pub fn ingest_build(
    engine: &TriageEngine,
    store: &mut AggregationStore,
    job_name: &str,
    build_url: &str,
    log_text: Option<&str>,
) -> Result<String, TriageError> {
    match log_text {
        Some(text) if !text.is_empty() => {
            let analysis = engine.analyze(text);
            store.record(job_name, &analysis.category, &analysis.canonical_message, build_url)?;
            Ok(analysis.category)
        }
        _ => {
            store.record(
                job_name,
                LOG_FETCH_ERROR_CATEGORY,
                LOG_FETCH_ERROR_MESSAGE,
                build_url,
            )?;
            Ok(LOG_FETCH_ERROR_CATEGORY.to_string())
        }
    }
}

/// Scan all jobs for failed builds inside the window and aggregate them.
pub async fn process_failed_builds(client: &JenkinsClient, config: &Config) -> Result<RunSummary> {
    let cutoff_ms = (Utc::now() - Duration::hours(config.analysis.window_hours as i64))
        .timestamp_millis();
    let limit = config.analysis.max_builds_per_job;

    info!("Fetching jobs...");
    let jobs = client.get_jobs().await.context("Error fetching job list")?;
    info!("Found {} jobs", jobs.len());

    let engine = TriageEngine::new(config.analysis.ignore_patterns.clone());
    let mut store = AggregationStore::new();
    let mut failed_jobs = 0;
    let mut failed_builds = 0;

    if jobs.is_empty() {
        warn!("No jobs found - check credentials / folder permissions");
        return Ok(RunSummary {
            report: store.finalize(),
            failed_jobs,
            failed_builds,
        });
    }

    for job in &jobs {
        let failures = match client.get_failed_builds(&job.url, cutoff_ms, limit).await {
            Ok(failures) => failures,
            Err(e) => {
                warn!("Skipping job '{}' - {:#}", job.name, e);
                continue;
            }
        };
        if failures.is_empty() {
            continue;
        }

        info!("Processing logs for job: {} ({} failed builds)", job.name, failures.len());
        let mut job_had_failures = false;

        for build in &failures {
            match client.fetch_console_text(&build.url).await {
                Ok(log_text) if !log_text.is_empty() => {
                    job_had_failures = true;
                    failed_builds += 1;
                    let category =
                        ingest_build(&engine, &mut store, &job.name, &build.url, Some(&log_text))?;
                    info!(
                        "  Processed: build_{}_{} -> {}",
                        build.number,
                        format_build_timestamp(build.timestamp),
                        category
                    );
                }
                Ok(_) => {
                    ingest_build(&engine, &mut store, &job.name, &build.url, None)?;
                    warn!("  Empty log for build_{}", build.number);
                }
                Err(e) => {
                    ingest_build(&engine, &mut store, &job.name, &build.url, None)?;
                    warn!("  Failed to fetch log for build_{}: {:#}", build.number, e);
                }
            }
        }

        if job_had_failures {
            failed_jobs += 1;
        }
    }

    let report = store.finalize();
    info!("Jobs with failures: {}", failed_jobs);
    info!("Total failed builds processed: {}", failed_builds);

    Ok(RunSummary {
        report,
        failed_jobs,
        failed_builds,
    })
}

/// `build_17_20240101_100000` style suffix for progress lines.
fn format_build_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%Y%m%d_%H%M%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_build_with_log() {
        let engine = TriageEngine::default();
        let mut store = AggregationStore::new();

        let category = ingest_build(
            &engine,
            &mut store,
            "etl",
            "https://ci/job/etl/1/",
            Some("ValueError: boom"),
        )
        .unwrap();
        assert_eq!(category, "ValueError");

        let report = store.finalize();
        assert_eq!(report.jobs[0].job, "etl");
        assert_eq!(report.jobs[0].categories[0].count, 1);
    }

    #[test]
    fn test_ingest_build_without_log_records_fetch_error() {
        let engine = TriageEngine::default();
        let mut store = AggregationStore::new();

        let category =
            ingest_build(&engine, &mut store, "etl", "https://ci/job/etl/2/", None).unwrap();
        assert_eq!(category, LOG_FETCH_ERROR_CATEGORY);

        let report = store.finalize();
        let cat = &report.jobs[0].categories[0];
        assert_eq!(cat.category, "LogFetchError");
        assert_eq!(cat.messages[0].message, LOG_FETCH_ERROR_MESSAGE);
        assert_eq!(cat.messages[0].build_refs, vec!["https://ci/job/etl/2/"]);
    }

    #[test]
    fn test_ingest_build_empty_log_counts_as_fetch_error() {
        let engine = TriageEngine::default();
        let mut store = AggregationStore::new();

        let category =
            ingest_build(&engine, &mut store, "etl", "https://ci/job/etl/3/", Some("")).unwrap();
        assert_eq!(category, LOG_FETCH_ERROR_CATEGORY);
    }

    #[test]
    fn test_format_build_timestamp() {
        // 2024-01-01 10:00:00 UTC
        assert_eq!(format_build_timestamp(1_704_103_200_000), "20240101_100000");
        assert_eq!(format_build_timestamp(i64::MAX), "unknown");
    }
}
