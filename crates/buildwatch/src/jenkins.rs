//! Jenkins API client: job listing, failed-build pagination, console logs.
//!
//! Pagination uses the `allBuilds` tree with 1000-build batches and stops
//! at the time cutoff, the per-job limit, or a hard safety cap. Older
//! Jenkins versions without `allBuilds` get a limited `builds` fallback.

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::JenkinsConfig;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const BATCH_SIZE: usize = 1000;

/// Hard cap on builds scanned per job, across all batches
const MAX_BUILDS_SCANNED: usize = 10_000;

/// One job as listed by the server
#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    pub name: String,
    pub url: String,
}

/// One build of a job
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRef {
    pub number: u64,
    /// "SUCCESS", "FAILURE", "ABORTED", ... or null while running
    pub result: Option<String>,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub url: String,
}

impl BuildRef {
    fn is_failure(&self) -> bool {
        self.result.as_deref() == Some("FAILURE")
    }
}

#[derive(Debug, Default, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<JobRef>,
}

#[derive(Debug, Default, Deserialize)]
struct AllBuildsResponse {
    #[serde(rename = "allBuilds", default)]
    all_builds: Vec<BuildRef>,
}

#[derive(Debug, Default, Deserialize)]
struct BuildsResponse {
    #[serde(default)]
    builds: Vec<BuildRef>,
}

/// Client for the Jenkins JSON API
pub struct JenkinsClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    token: String,
}

impl JenkinsClient {
    pub fn new(config: &JenkinsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    async fn json_get<T: DeserializeOwned>(&self, url: &str, tree: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(&self.token))
            .query(&[("tree", tree)])
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        // Bad Gateway is a Jenkins-side hiccup; name it so callers can
        // skip the job instead of treating it as a client bug.
        if response.status() == StatusCode::BAD_GATEWAY {
            bail!("Jenkins server error (502 Bad Gateway) for URL: {}", url);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("Jenkins returned an error for {}", url))?;

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }

    /// List every job (non-recursive).
    pub async fn get_jobs(&self) -> Result<Vec<JobRef>> {
        let api = format!("{}/api/json", self.base_url);
        let response: JobsResponse = self.json_get(&api, "jobs[name,url]").await?;
        Ok(response.jobs)
    }

    /// Up to `limit` FAILURE builds of `job_url` newer than `cutoff_ms`,
    /// newest first as the server returns them.
    pub async fn get_failed_builds(
        &self,
        job_url: &str,
        cutoff_ms: i64,
        limit: usize,
    ) -> Result<Vec<BuildRef>> {
        let api = format!("{}api/json", with_trailing_slash(job_url));
        let mut failures: Vec<BuildRef> = Vec::new();
        let mut offset = 0;

        loop {
            let tree = format!(
                "allBuilds[number,result,timestamp,url]{{{},{}}}",
                offset,
                offset + BATCH_SIZE - 1
            );
            let batch = match self.json_get::<AllBuildsResponse>(&api, &tree).await {
                Ok(response) => response.all_builds,
                Err(e) if offset == 0 => {
                    // Server may predate allBuilds; retry with a limited
                    // plain-builds window before giving up on the job.
                    debug!("allBuilds failed for {}, trying builds fallback: {:#}", job_url, e);
                    let response: BuildsResponse = self
                        .json_get(&api, "builds[number,result,timestamp,url]{0,100}")
                        .await?;
                    collect_failures(response.builds, cutoff_ms, limit, &mut failures);
                    return Ok(failures);
                }
                Err(e) => {
                    warn!(
                        "Error fetching allBuilds batch {}-{} for {}: {:#}",
                        offset,
                        offset + BATCH_SIZE - 1,
                        job_url,
                        e
                    );
                    break;
                }
            };

            if batch.is_empty() {
                break;
            }
            let reached_cutoff = collect_failures(batch, cutoff_ms, limit, &mut failures);
            if reached_cutoff || failures.len() >= limit {
                break;
            }

            offset += BATCH_SIZE;
            if offset >= MAX_BUILDS_SCANNED {
                break;
            }
        }

        Ok(failures)
    }

    /// Fetch the console log of a build into memory.
    pub async fn fetch_console_text(&self, build_url: &str) -> Result<String> {
        let log_url = format!("{}consoleText", with_trailing_slash(build_url));
        let response = self
            .client
            .get(&log_url)
            .basic_auth(&self.user, Some(&self.token))
            .send()
            .await
            .with_context(|| format!("Request to {} failed", log_url))?
            .error_for_status()
            .with_context(|| format!("Jenkins returned an error for {}", log_url))?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read log body from {}", log_url))
    }
}

/// Append failures newer than the cutoff; true if an older build was seen
/// (builds arrive newest-first, so pagination can stop there).
fn collect_failures(
    batch: Vec<BuildRef>,
    cutoff_ms: i64,
    limit: usize,
    failures: &mut Vec<BuildRef>,
) -> bool {
    for build in batch {
        if build.timestamp < cutoff_ms {
            return true;
        }
        if build.is_failure() {
            failures.push(build);
            if failures.len() >= limit {
                return false;
            }
        }
    }
    false
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(number: u64, result: Option<&str>, timestamp: i64) -> BuildRef {
        BuildRef {
            number,
            result: result.map(str::to_string),
            timestamp,
            url: format!("https://ci/job/x/{number}/"),
        }
    }

    #[test]
    fn test_collect_failures_filters_and_stops_at_cutoff() {
        let batch = vec![
            build(5, Some("FAILURE"), 500),
            build(4, Some("SUCCESS"), 400),
            build(3, Some("FAILURE"), 300),
            build(2, Some("FAILURE"), 100), // older than cutoff
            build(1, Some("FAILURE"), 50),
        ];
        let mut failures = Vec::new();
        let reached = collect_failures(batch, 200, 10, &mut failures);
        assert!(reached);
        let numbers: Vec<u64> = failures.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![5, 3]);
    }

    #[test]
    fn test_collect_failures_respects_limit() {
        let batch = (0..10).map(|n| build(n, Some("FAILURE"), 1000)).collect();
        let mut failures = Vec::new();
        let reached = collect_failures(batch, 0, 3, &mut failures);
        assert!(!reached);
        assert_eq!(failures.len(), 3);
    }

    #[test]
    fn test_collect_failures_skips_running_builds() {
        let batch = vec![build(2, None, 1000), build(1, Some("FAILURE"), 900)];
        let mut failures = Vec::new();
        collect_failures(batch, 0, 10, &mut failures);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].number, 1);
    }

    #[test]
    fn test_parse_jobs_response() {
        let json = r#"{"jobs":[{"name":"etl","url":"https://ci/job/etl/"}]}"#;
        let response: JobsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.jobs.len(), 1);
        assert_eq!(response.jobs[0].name, "etl");
    }

    #[test]
    fn test_parse_all_builds_response() {
        let json = r#"{"allBuilds":[{"number":7,"result":"FAILURE","timestamp":1700000000000,"url":"https://ci/job/etl/7/"}]}"#;
        let response: AllBuildsResponse = serde_json::from_str(json).unwrap();
        assert!(response.all_builds[0].is_failure());
    }

    #[test]
    fn test_with_trailing_slash() {
        assert_eq!(with_trailing_slash("https://ci/job/x"), "https://ci/job/x/");
        assert_eq!(with_trailing_slash("https://ci/job/x/"), "https://ci/job/x/");
    }
}
