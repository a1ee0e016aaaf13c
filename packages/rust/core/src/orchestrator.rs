//! Extraction orchestrator: per-subject reference + web extraction as a
//! pull-driven stream.

use std::sync::Arc;

use tracing::{info, instrument};

use dossier_crawler::WebExtractor;
use dossier_reference::ReferenceExtractor;
use dossier_shared::{
    AppConfig, Document, ExtractOutcome, ExtractionMode, FailurePolicy, Result, Subject,
    SubjectExtractionRequest,
};

use crate::progress::{ProgressReporter, SilentProgress};
use crate::registry::SubjectRegistry;

// ---------------------------------------------------------------------------
// ExtractionPolicy
// ---------------------------------------------------------------------------

/// How the reference article for a subject is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceLookup {
    /// Search by subject name (or its configured reference title).
    SubjectName,
    /// Load one article per reference-domain URL in the request.
    RequestUrls,
}

/// Failure handling plus reference lookup for one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPolicy {
    pub failure: FailurePolicy,
    pub lookup: ReferenceLookup,
}

impl ExtractionPolicy {
    /// Any failure aborts; the reference article is found by name.
    pub fn strict() -> Self {
        Self {
            failure: FailurePolicy::Abort,
            lookup: ReferenceLookup::SubjectName,
        }
    }

    /// Failing sources are skipped; reference articles come from request URLs.
    pub fn batch() -> Self {
        Self {
            failure: FailurePolicy::SkipAndContinue,
            lookup: ReferenceLookup::RequestUrls,
        }
    }
}

impl From<ExtractionMode> for ExtractionPolicy {
    fn from(mode: ExtractionMode) -> Self {
        match mode {
            ExtractionMode::Strict => Self::strict(),
            ExtractionMode::Batch => Self::batch(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Resolves subjects and runs both extractors for each request.
pub struct Extractor {
    registry: SubjectRegistry,
    reference: ReferenceExtractor,
    web: WebExtractor,
    policy: ExtractionPolicy,
    progress: Arc<dyn ProgressReporter>,
}

impl Extractor {
    pub fn new(
        registry: SubjectRegistry,
        reference: ReferenceExtractor,
        web: WebExtractor,
        policy: ExtractionPolicy,
    ) -> Self {
        Self {
            registry,
            reference,
            web,
            policy,
            progress: Arc::new(SilentProgress),
        }
    }

    /// Wire every component from a loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = SubjectRegistry::from_config(config)?;
        let reference = ReferenceExtractor::new(config.reference.clone(), &config.fetch)?;
        let web = WebExtractor::new(config.fetch.clone(), &config.reference)?;
        Ok(Self::new(registry, reference, web, config.extraction.mode.into()))
    }

    pub fn with_policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    pub fn progress(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }

    /// Lazily extract each request in order.
    pub fn stream_extract(&self, requests: Vec<SubjectExtractionRequest>) -> ExtractionStream<'_> {
        ExtractionStream {
            extractor: self,
            total: requests.len(),
            requests: requests.into_iter(),
            position: 0,
            skipped: 0,
            fused: false,
        }
    }

    /// Drain a stream into a list, stopping at the first error.
    pub async fn extract_all(
        &self,
        requests: Vec<SubjectExtractionRequest>,
    ) -> Result<Vec<(Subject, Vec<Document>)>> {
        let mut stream = self.stream_extract(requests);
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item?);
        }
        Ok(out)
    }

    /// Reference documents for one request under the current lookup.
    pub async fn extract_reference(
        &self,
        subject: &Subject,
        request: &SubjectExtractionRequest,
    ) -> Result<ExtractOutcome> {
        match self.policy.lookup {
            ReferenceLookup::SubjectName => Ok(ExtractOutcome {
                documents: self.reference.extract_for_subject(subject).await?,
                skipped: Vec::new(),
            }),
            ReferenceLookup::RequestUrls => {
                self.reference
                    .extract_from_urls(subject, &request.urls, self.policy.failure)
                    .await
            }
        }
    }

    #[instrument(skip_all, fields(subject_id = %request.subject_id))]
    async fn extract_subject(
        &self,
        request: &SubjectExtractionRequest,
        index: usize,
        total: usize,
    ) -> Result<(Subject, Vec<Document>, usize)> {
        let subject = self.registry.resolve(&request.subject_id)?;
        self.progress.subject_started(&subject, index, total);

        let reference = self.extract_reference(&subject, request).await?;
        let web = self
            .web
            .extract_web(&subject, &request.urls, self.policy.failure)
            .await?;

        let mut skipped = 0;
        for (url, error) in reference.skipped.iter().chain(&web.skipped) {
            self.progress.source_failed(&subject, url, error);
            skipped += 1;
        }

        let mut documents = reference.documents;
        documents.extend(web.documents);

        info!(documents = documents.len(), skipped, "subject extracted");
        self.progress.subject_finished(&subject, documents.len());
        Ok((subject, documents, skipped))
    }
}

// ---------------------------------------------------------------------------
// ExtractionStream
// ---------------------------------------------------------------------------

/// One `(subject, documents)` item per request, computed on `next()`.
///
/// After an error is yielded the stream is exhausted.
pub struct ExtractionStream<'a> {
    extractor: &'a Extractor,
    requests: std::vec::IntoIter<SubjectExtractionRequest>,
    total: usize,
    position: usize,
    skipped: usize,
    fused: bool,
}

impl ExtractionStream<'_> {
    /// Extract the next subject, or `None` once exhausted.
    pub async fn next(&mut self) -> Option<Result<(Subject, Vec<Document>)>> {
        if self.fused {
            return None;
        }
        let request = self.requests.next()?;
        self.position += 1;

        match self
            .extractor
            .extract_subject(&request, self.position, self.total)
            .await
        {
            Ok((subject, documents, skipped)) => {
                self.skipped += skipped;
                Some(Ok((subject, documents)))
            }
            Err(e) => {
                self.fused = true;
                Some(Err(e))
            }
        }
    }

    /// Sources skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Requests not yet pulled.
    pub fn remaining(&self) -> usize {
        if self.fused { 0 } else { self.requests.len() }
    }
}
