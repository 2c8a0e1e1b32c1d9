//! Slack Block Kit notifier for run reports.
//!
//! Sends one comprehensive summary message via chat.postMessage: header
//! with the scan window, failed-job/build totals, then a section per job
//! in the snapshot's order with per-category counts, a representative
//! message and up to three build links.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use buildwatch_core::aggregate::{CategoryAggregate, JobFailures};

use crate::config::SlackConfig;
use crate::runner::RunSummary;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const MAX_LINKED_BUILDS: usize = 3;

/// Slack notifier using a bot token
pub struct SlackNotifier {
    client: reqwest::Client,
    bot_token: String,
    channel: String,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: config.bot_token.clone(),
            channel: config.channel.clone(),
        }
    }

    /// Both a token and a channel are needed to post.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.channel.is_empty()
    }

    /// Send the summary message for a finished run.
    ///
    /// Missing configuration is a warning, not an error: console output
    /// still happened and the run itself succeeded.
    pub async fn send_report(
        &self,
        summary: &RunSummary,
        window_hours: u64,
        max_builds_per_job: usize,
    ) -> Result<()> {
        if !self.is_configured() {
            warn!("SLACK_BOT_TOKEN / SLACK_CHANNEL not configured; skipping Slack notification");
            return Ok(());
        }

        let header = header_text(window_hours);
        let blocks = summary_blocks(summary, window_hours, max_builds_per_job);
        let payload = json!({
            "channel": self.channel,
            "blocks": blocks,
            // Fallback text for notification previews
            "text": header,
        });

        let response: Value = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.bot_token)
            .json(&payload)
            .send()
            .await
            .context("Slack request failed")?
            .json()
            .await
            .context("Slack returned a non-JSON response")?;

        if response["ok"].as_bool() == Some(true) {
            info!("Slack summary sent to {}", self.channel);
            debug!("Slack message ts: {}", response["ts"].as_str().unwrap_or(""));
            Ok(())
        } else {
            let error = response["error"].as_str().unwrap_or("unknown error");
            anyhow::bail!("Slack API error: {}", error)
        }
    }
}

fn header_text(window_hours: u64) -> String {
    let unit = if window_hours == 1 { "Hour" } else { "Hours" };
    format!("Jenkins Health Report Last {} {}", window_hours, unit)
}

/// `&`, `<` and `>` carry formatting meaning in Slack mrkdwn.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `xN`, or `xN+` when the per-job fetch cap was hit.
fn display_count(count: u32, cap: usize) -> String {
    if count as usize >= cap {
        format!("x{}+", cap)
    } else {
        format!("x{}", count)
    }
}

/// Trailing path segment of a build URL, for link labels.
fn build_number_label(url: &str) -> &str {
    url.rsplit('/').find(|s| !s.is_empty()).unwrap_or(url)
}

fn category_section(category: &CategoryAggregate, cap: usize) -> String {
    let preview = escape_text(category.latest_message().unwrap_or(""));
    let mut text = format!(
        "*{}* ({})\n```\n{}\n```",
        category.category,
        display_count(category.count, cap),
        preview
    );

    let refs: Vec<&str> = category.build_refs().collect();
    if !refs.is_empty() {
        let links: Vec<String> = refs
            .iter()
            .take(MAX_LINKED_BUILDS)
            .map(|url| format!("<{}|{}>", url, build_number_label(url)))
            .collect();
        text.push_str(&format!("\nAppeared in {}", links.join(", ")));
        if refs.len() > MAX_LINKED_BUILDS {
            text.push_str(&format!(" and {} more", refs.len() - MAX_LINKED_BUILDS));
        }
    }
    text
}

fn job_section(job: &JobFailures, cap: usize) -> Value {
    let total = job.total_failures();
    let failure_display = if total as usize >= cap {
        format!("{}+ failures", cap)
    } else {
        format!("{} failures", total)
    };

    let category_texts: Vec<String> =
        job.categories.iter().map(|c| category_section(c, cap)).collect();
    let text = format!(
        "*{}* ({})\n\n{}",
        escape_text(&job.job),
        failure_display,
        category_texts.join("\n\n")
    );

    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text }
    })
}

/// Full Block Kit block list for the summary message.
fn summary_blocks(summary: &RunSummary, window_hours: u64, cap: usize) -> Vec<Value> {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": header_text(window_hours) }
        }),
        json!({
            "type": "context",
            "elements": [
                { "type": "plain_text", "emoji": true, "text": format!("Failed Jobs: {}", summary.failed_jobs) },
                { "type": "plain_text", "emoji": true, "text": format!("Failed Builds: {}", summary.failed_builds) }
            ]
        }),
    ];

    if summary.report.is_empty() {
        blocks.push(json!({ "type": "divider" }));
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": "*All systems healthy!* No failed builds in the specified time window."
            }
        }));
        return blocks;
    }

    blocks.push(json!({ "type": "divider" }));
    let job_count = summary.report.jobs.len();
    for (i, job) in summary.report.jobs.iter().enumerate() {
        blocks.push(job_section(job, cap));
        if i + 1 < job_count {
            blocks.push(json!({ "type": "divider" }));
        }
    }
    blocks
}
