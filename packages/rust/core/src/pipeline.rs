//! End-to-end ingest: requests → stream extract → chunk → store.

use std::time::Instant;

use tracing::{error, info, instrument};

use dossier_chunking::TextSplitter;
use dossier_shared::{Result, SubjectExtractionRequest};

use crate::orchestrator::Extractor;
use crate::progress::IngestSummary;
use crate::store::MetadataStore;

/// Run the full pipeline over the store's requests.
#[instrument(skip_all)]
pub async fn ingest(
    extractor: &Extractor,
    splitter: &TextSplitter,
    store: &dyn MetadataStore,
) -> Result<IngestSummary> {
    let requests = store.load_requests()?;
    ingest_requests(extractor, splitter, store, requests).await
}

/// Run the pipeline over explicit requests; chunks go to `store`.
///
/// Subjects are processed one at a time. If a subject fails, the chunks of
/// the subjects before it are still stored before the error is returned.
#[instrument(skip_all, fields(requests = requests.len()))]
pub async fn ingest_requests(
    extractor: &Extractor,
    splitter: &TextSplitter,
    store: &dyn MetadataStore,
    requests: Vec<SubjectExtractionRequest>,
) -> Result<IngestSummary> {
    let start = Instant::now();
    let mut summary = IngestSummary::default();
    let mut chunks = Vec::new();

    let mut stream = extractor.stream_extract(requests);
    while let Some(item) = stream.next().await {
        let (subject, documents) = match item {
            Ok(pair) => pair,
            Err(e) => {
                if summary.subjects > 0 {
                    if let Err(store_err) = store.store_chunks(&chunks) {
                        error!(error = %store_err, "failed to store chunks of finished subjects");
                    }
                }
                info!(
                    subjects = summary.subjects,
                    chunks = chunks.len(),
                    "ingest stopped early"
                );
                return Err(e);
            }
        };
        let before = chunks.len();
        chunks.extend(splitter.split_documents(&documents));

        info!(
            subject_id = %subject.id,
            documents = documents.len(),
            chunks = chunks.len() - before,
            "subject chunked"
        );
        summary.subjects += 1;
        summary.documents += documents.len();
    }
    summary.skipped = stream.skipped();

    store.store_chunks(&chunks)?;
    summary.chunks = chunks.len();
    summary.elapsed = start.elapsed();

    info!(
        subjects = summary.subjects,
        documents = summary.documents,
        chunks = summary.chunks,
        skipped = summary.skipped,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "ingest complete"
    );
    extractor.progress().done(&summary);
    Ok(summary)
}
