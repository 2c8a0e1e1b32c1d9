//! Failure aggregation across an entire scan run.
//!
//! One [`AggregationStore`] per run. Records flow in strictly sequential
//! build order; `finalize` freezes the store and yields the sorted,
//! immutable [`FailureReport`] snapshot handed to presentation code.
//! Lookups never create entries; only `record` mutates.

use serde::{Deserialize, Serialize};

use crate::error::TriageError;

/// Synthetic category recorded when a build's log could not be fetched.
pub const LOG_FETCH_ERROR_CATEGORY: &str = "LogFetchError";

/// Fixed canonical message paired with [`LOG_FETCH_ERROR_CATEGORY`].
pub const LOG_FETCH_ERROR_MESSAGE: &str = "Error fetching log content";

/// One canonical message and the distinct builds it appeared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    /// Canonical (normalized) failure message
    pub message: String,
    /// Build references in arrival order, each at most once
    pub build_refs: Vec<String>,
}

/// Aggregate for one (job, category) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    /// Short classifier string, e.g. "myapp.utils.MyCustomException"
    pub category: String,
    /// Raw occurrence count: one per record() call, duplicates included
    pub count: u32,
    /// Distinct canonical messages in first-seen order
    pub messages: Vec<MessageGroup>,
}

impl CategoryAggregate {
    /// Most recently recorded canonical message, for display.
    pub fn latest_message(&self) -> Option<&str> {
        self.messages.last().map(|g| g.message.as_str())
    }

    /// Build references across all messages, in arrival order.
    pub fn build_refs(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(|g| g.build_refs.iter().map(String::as_str))
    }
}

/// All failure categories observed for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailures {
    /// Job (pipeline) name
    pub job: String,
    /// Categories; first-seen order while open, count-descending once finalized
    pub categories: Vec<CategoryAggregate>,
}

impl JobFailures {
    /// Total record() calls across all categories of this job.
    pub fn total_failures(&self) -> u32 {
        self.categories.iter().map(|c| c.count).sum()
    }
}

/// Immutable snapshot of one complete scan run.
///
/// Jobs are sorted by descending total failure count, categories within a
/// job by descending count; ties keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub jobs: Vec<JobFailures>,
}

impl FailureReport {
    /// Number of jobs that had at least one recorded failure.
    pub fn total_failed_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Total recorded failures across all jobs.
    pub fn total_failures(&self) -> u32 {
        self.jobs.iter().map(|j| j.total_failures()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Mutable accumulator for one scan run: Open until `finalize`, then Closed.
#[derive(Debug, Default)]
pub struct AggregationStore {
    jobs: Vec<JobFailures>,
    closed: bool,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure occurrence.
    ///
    /// Increments the (job, category) count unconditionally. The build
    /// reference is appended to the canonical message's list only if not
    /// already present, so duplicate references for the same message are
    /// deduplicated at the URL level while still counting as occurrences.
    pub fn record(
        &mut self,
        job: &str,
        category: &str,
        canonical_message: &str,
        build_ref: &str,
    ) -> Result<(), TriageError> {
        if self.closed {
            return Err(TriageError::StoreClosed);
        }

        let job_idx = match self.jobs.iter().position(|j| j.job == job) {
            Some(i) => i,
            None => {
                self.jobs.push(JobFailures {
                    job: job.to_string(),
                    categories: Vec::new(),
                });
                self.jobs.len() - 1
            }
        };
        let categories = &mut self.jobs[job_idx].categories;

        let cat_idx = match categories.iter().position(|c| c.category == category) {
            Some(i) => i,
            None => {
                categories.push(CategoryAggregate {
                    category: category.to_string(),
                    count: 0,
                    messages: Vec::new(),
                });
                categories.len() - 1
            }
        };
        let aggregate = &mut categories[cat_idx];
        aggregate.count += 1;

        let group = match aggregate
            .messages
            .iter()
            .position(|g| g.message == canonical_message)
        {
            Some(i) => &mut aggregate.messages[i],
            None => {
                aggregate.messages.push(MessageGroup {
                    message: canonical_message.to_string(),
                    build_refs: Vec::new(),
                });
                let last = aggregate.messages.len() - 1;
                &mut aggregate.messages[last]
            }
        };
        if !group.build_refs.iter().any(|r| r == build_ref) {
            group.build_refs.push(build_ref.to_string());
        }

        Ok(())
    }

    /// Freeze the store and yield the sorted snapshot. Terminal: any
    /// later `record` fails with [`TriageError::StoreClosed`].
    pub fn finalize(&mut self) -> FailureReport {
        self.closed = true;
        let mut jobs = std::mem::take(&mut self.jobs);

        // Stable sorts keep first-seen order among equal counts
        for job in &mut jobs {
            job.categories.sort_by(|a, b| b.count.cmp(&a.count));
        }
        jobs.sort_by(|a, b| b.total_failures().cmp(&a.total_failures()));

        FailureReport { jobs }
    }
}
