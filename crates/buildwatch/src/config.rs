//! Configuration for a buildwatch run.
//!
//! Loads settings from a TOML file (default /etc/buildwatch/config.toml)
//! and applies environment-variable overrides on top, so the tool can run
//! from CI secrets alone without any file present.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default config file path
pub const CONFIG_PATH: &str = "/etc/buildwatch/config.toml";

/// Jenkins connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JenkinsConfig {
    /// Jenkins base URL, e.g. "https://ci.example.com"
    #[serde(default)]
    pub base_url: String,

    /// API user
    #[serde(default)]
    pub user: String,

    /// API token for the user
    #[serde(default)]
    pub token: String,
}

/// Slack notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token used with chat.postMessage
    #[serde(default)]
    pub bot_token: String,

    /// Target channel
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "#jenkins-health".to_string()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel: default_channel(),
        }
    }
}

/// Analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How far back to scan for failed builds, in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,

    /// Per-job cap on failed builds fetched and analyzed
    #[serde(default = "default_max_builds_per_job")]
    pub max_builds_per_job: usize,

    /// Case-sensitive substrings; candidate failure lines containing any
    /// of them are never selected by the extractor
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_window_hours() -> u64 {
    1
}

fn default_max_builds_per_job() -> usize {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            max_builds_per_job: default_max_builds_per_job(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Full run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jenkins: JenkinsConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load config from the given path (or the default location), then
    /// apply environment overrides. Missing file means defaults + env.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or(Path::new(CONFIG_PATH));
        let mut config = Self::load_from_path(path).unwrap_or_else(|e| {
            warn!("Config not found at {}, using defaults: {}", path.display(), e);
            Config::default()
        });
        config.apply_env();
        config
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Environment variables win over file values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("JENKINS_URL") {
            self.jenkins.base_url = v;
        }
        if let Ok(v) = env::var("JENKINS_USER") {
            self.jenkins.user = v;
        }
        if let Ok(v) = env::var("JENKINS_TOKEN") {
            self.jenkins.token = v;
        }
        if let Ok(v) = env::var("SLACK_BOT_TOKEN") {
            self.slack.bot_token = v;
        }
        if let Ok(v) = env::var("SLACK_CHANNEL") {
            self.slack.channel = v;
        }
        if let Ok(v) = env::var("WINDOW_HOURS") {
            match v.parse() {
                Ok(hours) => self.analysis.window_hours = hours,
                Err(_) => warn!("Ignoring unparseable WINDOW_HOURS={}", v),
            }
        }
        if let Ok(v) = env::var("MAX_FAILURES_COUNT_PER_JOB") {
            match v.parse() {
                Ok(max) => self.analysis.max_builds_per_job = max,
                Err(_) => warn!("Ignoring unparseable MAX_FAILURES_COUNT_PER_JOB={}", v),
            }
        }
    }
}
