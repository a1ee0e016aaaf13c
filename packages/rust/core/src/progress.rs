//! Progress observer for extraction runs.

use std::time::Duration;

use dossier_shared::Subject;

/// Totals for a finished ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Subjects fully extracted.
    pub subjects: usize,
    /// Documents produced before chunking.
    pub documents: usize,
    /// Chunks handed to the store.
    pub chunks: usize,
    /// Sources dropped under the skip policy.
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a subject's sources are fetched. `index` is 1-based.
    fn subject_started(&self, subject: &Subject, index: usize, total: usize);
    /// Called once a subject's documents are merged.
    fn subject_finished(&self, subject: &Subject, documents: usize);
    /// Called for every source skipped after a failure.
    fn source_failed(&self, subject: &Subject, url: &str, error: &str);
    /// Called when an ingest run completes.
    fn done(&self, summary: &IngestSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn subject_started(&self, _subject: &Subject, _index: usize, _total: usize) {}
    fn subject_finished(&self, _subject: &Subject, _documents: usize) {}
    fn source_failed(&self, _subject: &Subject, _url: &str, _error: &str) {}
    fn done(&self, _summary: &IngestSummary) {}
}
