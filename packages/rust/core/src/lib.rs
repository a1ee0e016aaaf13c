//! Pipeline orchestration for Dossier.
//!
//! Ties the subject registry, both extractors, chunking, and the metadata
//! store together into the end-to-end [`ingest`] workflow.

pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod store;

pub use orchestrator::{ExtractionPolicy, ExtractionStream, Extractor, ReferenceLookup};
pub use pipeline::{ingest, ingest_requests};
pub use progress::{IngestSummary, ProgressReporter, SilentProgress};
pub use registry::SubjectRegistry;
pub use store::{CHUNKS_FILE, JsonMetadataStore, MetadataStore, REQUESTS_FILE};
