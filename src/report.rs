//! Per-record issues and the end-of-run summary.
//!
//! A single bad record never aborts a run. Each stage records what it dropped
//! into an [`IssueLog`], and the pipeline folds the logs into a [`RunReport`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueKind {
    MissingIdentifier,
    DuplicateRecord,
    IncompleteMetadata,
    DanglingEdge,
    SourceFetchFailure,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        IssueKind::MissingIdentifier,
        IssueKind::DuplicateRecord,
        IssueKind::IncompleteMetadata,
        IssueKind::DanglingEdge,
        IssueKind::SourceFetchFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingIdentifier => "MissingIdentifier",
            IssueKind::DuplicateRecord => "DuplicateRecord",
            IssueKind::IncompleteMetadata => "IncompleteMetadata",
            IssueKind::DanglingEdge => "DanglingEdge",
            IssueKind::SourceFetchFailure => "SourceFetchFailure",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal defect in a single record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineIssue {
    #[error("{record}: no usable {field}, record dropped")]
    MissingIdentifier { record: String, field: &'static str },

    #[error("{loser} duplicates {survivor} on {key}, kept {survivor}")]
    DuplicateRecord {
        survivor: String,
        loser: String,
        key: String,
    },

    #[error("{record}: missing {field}, skipped")]
    IncompleteMetadata { record: String, field: &'static str },

    #[error("edge {edge} dropped: {reason}")]
    DanglingEdge { edge: String, reason: String },

    #[error("{source_name} fetch failed for {record}: {message}")]
    SourceFetchFailure {
        source_name: &'static str,
        record: String,
        message: String,
    },
}

impl PipelineIssue {
    pub fn kind(&self) -> IssueKind {
        match self {
            PipelineIssue::MissingIdentifier { .. } => IssueKind::MissingIdentifier,
            PipelineIssue::DuplicateRecord { .. } => IssueKind::DuplicateRecord,
            PipelineIssue::IncompleteMetadata { .. } => IssueKind::IncompleteMetadata,
            PipelineIssue::DanglingEdge { .. } => IssueKind::DanglingEdge,
            PipelineIssue::SourceFetchFailure { .. } => IssueKind::SourceFetchFailure,
        }
    }
}

/// Ordered collection of the issues raised by a stage.
#[derive(Debug, Default, Clone)]
pub struct IssueLog {
    issues: Vec<PipelineIssue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs the issue and keeps it for the summary.
    pub fn record(&mut self, issue: PipelineIssue) {
        match issue.kind() {
            IssueKind::DuplicateRecord => info!("{}", issue),
            _ => warn!("{}", issue),
        }
        self.issues.push(issue);
    }

    /// Appends issues that were already logged by another stage.
    pub fn extend(&mut self, other: IssueLog) {
        self.issues.extend(other.issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineIssue> {
        self.issues.iter()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind() == kind).count()
    }

    /// Counts per kind, with every kind present.
    pub fn counts(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts: BTreeMap<IssueKind, usize> =
            IssueKind::ALL.iter().map(|k| (*k, 0)).collect();
        for issue in &self.issues {
            *counts.entry(issue.kind()).or_default() += 1;
        }
        counts
    }
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub build: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub records_read: usize,
    pub articles_kept: usize,
    pub chunks_written: usize,
    pub chunks_skipped: usize,
    pub nodes_written: usize,
    pub edges_written: usize,
    pub issues: BTreeMap<IssueKind, usize>,
}

impl RunReport {
    pub fn start(dry_run: bool) -> Self {
        let now = Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            build: env!("GIT_HASH").to_string(),
            started_at: now,
            finished_at: now,
            dry_run,
            records_read: 0,
            articles_kept: 0,
            chunks_written: 0,
            chunks_skipped: 0,
            nodes_written: 0,
            edges_written: 0,
            issues: IssueLog::new().counts(),
        }
    }

    pub fn finish(&mut self, issues: &IssueLog) {
        self.issues = issues.counts();
        self.finished_at = Utc::now();
    }

    pub fn issue_count(&self, kind: IssueKind) -> usize {
        self.issues.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_issues(&self) -> usize {
        self.issues.values().sum()
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Emits the summary through `tracing`.
    pub fn log_summary(&self) {
        info!("Run {} finished in {} ms", self.run_id, self.elapsed_ms());
        info!(
            "Records read: {}, articles kept: {}",
            self.records_read, self.articles_kept
        );
        info!(
            "Chunks written: {}, skipped: {}",
            self.chunks_written, self.chunks_skipped
        );
        info!(
            "Nodes written: {}, edges written: {}",
            self.nodes_written, self.edges_written
        );
        for (kind, count) in &self.issues {
            if *count > 0 {
                warn!("{}: {}", kind, count);
            }
        }
    }
}
