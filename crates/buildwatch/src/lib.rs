//! Buildwatch - Jenkins failure triage.
//!
//! Plumbing around `buildwatch-core`: configuration, the Jenkins API
//! client, the streaming run loop, and the console/Slack presentation of
//! the finalized report.

pub mod config;
pub mod console;
pub mod jenkins;
pub mod runner;
pub mod slack;
