//! Core domain types: subjects, extraction requests, and documents.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

/// A named entity whose biographical/technical material is extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identifier, referenced by extraction requests.
    pub id: String,
    /// Display name, also the reference-source search query.
    pub name: String,
    /// Canonical reference article title, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_title: Option<String>,
    /// Known source URLs for this subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reference_title: None,
            urls: Vec::new(),
        }
    }

    /// Title used to look the subject up in the reference source.
    pub fn reference_title(&self) -> &str {
        self.reference_title.as_deref().unwrap_or(&self.name)
    }
}

// ---------------------------------------------------------------------------
// SubjectExtractionRequest
// ---------------------------------------------------------------------------

/// One entry of the extraction metadata: which subject, which sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectExtractionRequest {
    #[serde(rename = "id")]
    pub subject_id: String,
    /// Source URLs in priority order. Absent or `null` means no sources.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub urls: Vec<String>,
}

impl SubjectExtractionRequest {
    pub fn new(subject_id: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            urls,
        }
    }

    /// Build a request from a subject's known URLs.
    pub fn for_subject(subject: &Subject) -> Self {
        Self::new(subject.id.clone(), subject.urls.clone())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// FailurePolicy
// ---------------------------------------------------------------------------

/// What an extractor does when a single source page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the failure to the caller.
    Abort,
    /// Log the failure, drop that source, and keep going.
    #[default]
    SkipAndContinue,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Which extractor produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Reference,
    Web,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance metadata attached to every document and chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: SourceKind,
    pub subject_id: String,
    pub subject_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Metadata for a reference-source article.
    pub fn reference(subject: &Subject, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: SourceKind::Reference,
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            url: Some(url.into()),
            title: Some(title.into()),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Metadata for an arbitrary web page.
    pub fn web(subject: &Subject, url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            source: SourceKind::Web,
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            url: Some(url.into()),
            title,
            fetched_at: Some(Utc::now()),
        }
    }

    /// Render as the flat string-to-scalar mapping consumed by retrieval tools.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// A unit of normalized text plus its provenance.
///
/// Metadata sits behind an [`Arc`]: chunks split from a document share the
/// parent's metadata rather than copying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Arc<DocumentMetadata>,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata: Arc::new(metadata),
        }
    }

    /// A new document with different content and this document's metadata.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Arc::clone(&self.metadata),
        }
    }

    /// Whether both documents point at the same metadata allocation.
    pub fn shares_metadata_with(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.metadata, &other.metadata)
    }

    pub fn source(&self) -> SourceKind {
        self.metadata.source
    }

    pub fn url(&self) -> Option<&str> {
        self.metadata.url.as_deref()
    }
}

/// Documents produced by one extractor call, plus the sources it skipped.
#[derive(Debug, Clone, Default)]
pub struct ExtractOutcome {
    pub documents: Vec<Document>,
    /// `(url, error message)` for every source dropped under
    /// [`FailurePolicy::SkipAndContinue`].
    pub skipped: Vec<(String, String)>,
}

impl ExtractOutcome {
    /// Apply `policy` to a single-source failure.
    ///
    /// Skippable failures are recorded and `Ok(())` is returned; anything
    /// else comes back as the error to propagate.
    pub fn absorb(
        &mut self,
        policy: FailurePolicy,
        url: &str,
        error: crate::DossierError,
    ) -> crate::Result<()> {
        if policy == FailurePolicy::SkipAndContinue && error.is_source_failure() {
            self.skipped.push((url.to_string(), error.to_string()));
            Ok(())
        } else {
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_missing_and_null_urls() {
        let json = r#"[
            {"id": "a", "urls": ["https://example.com/a"]},
            {"id": "b"},
            {"id": "c", "urls": null}
        ]"#;
        let parsed: Vec<SubjectExtractionRequest> = serde_json::from_str(json).expect("parse");
        assert_eq!(parsed[0].urls, vec!["https://example.com/a".to_string()]);
        assert!(parsed[1].urls.is_empty());
        assert!(parsed[2].urls.is_empty());
        assert_eq!(parsed[2].subject_id, "c");
    }

    #[test]
    fn reference_title_falls_back_to_name() {
        let mut subject = Subject::new("turing", "Alan Turing");
        assert_eq!(subject.reference_title(), "Alan Turing");

        subject.reference_title = Some("Alan Mathison Turing".into());
        assert_eq!(subject.reference_title(), "Alan Mathison Turing");
    }

    #[test]
    fn metadata_map_uses_flat_keys() {
        let subject = Subject::new("s1", "Ada Lovelace");
        let meta = DocumentMetadata::web(&subject, "https://example.com/a", None);
        let map = meta.to_map();

        assert_eq!(map["source"], "web");
        assert_eq!(map["subject_id"], "s1");
        assert_eq!(map["subject_name"], "Ada Lovelace");
        assert_eq!(map["url"], "https://example.com/a");
        assert!(!map.contains_key("title"));
    }

    #[test]
    fn with_content_shares_metadata() {
        let subject = Subject::new("s1", "Ada Lovelace");
        let doc = Document::new(
            "full text",
            DocumentMetadata::reference(
                &subject,
                "https://en.wikipedia.org/wiki/Ada_Lovelace",
                "Ada Lovelace",
            ),
        );
        let chunk = doc.with_content("full");

        assert!(chunk.shares_metadata_with(&doc));
        assert_eq!(chunk.metadata, doc.metadata);
        assert_eq!(chunk.source(), SourceKind::Reference);
    }

    #[test]
    fn outcome_absorbs_only_skippable_failures() {
        let mut outcome = ExtractOutcome::default();

        let skipped = outcome.absorb(
            FailurePolicy::SkipAndContinue,
            "https://example.com/a",
            crate::DossierError::fetch("https://example.com/a", "HTTP 500"),
        );
        assert!(skipped.is_ok());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, "https://example.com/a");

        let aborted = outcome.absorb(
            FailurePolicy::Abort,
            "https://example.com/b",
            crate::DossierError::fetch("https://example.com/b", "HTTP 500"),
        );
        assert!(aborted.is_err());

        let fatal = outcome.absorb(
            FailurePolicy::SkipAndContinue,
            "https://example.com/c",
            crate::DossierError::config("broken"),
        );
        assert!(fatal.is_err());
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn document_serializes_metadata_inline() {
        let subject = Subject::new("s1", "Ada Lovelace");
        let doc = Document::new(
            "text",
            DocumentMetadata::web(&subject, "https://example.com/a", Some("A".into())),
        );
        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["content"], "text");
        assert_eq!(json["metadata"]["source"], "web");
        assert_eq!(json["metadata"]["title"], "A");
    }
}
