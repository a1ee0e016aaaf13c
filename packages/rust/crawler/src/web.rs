//! Web-source extraction: arbitrary pages listed in a subject's request.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use dossier_shared::{
    Document, DocumentMetadata, ExtractOutcome, FailurePolicy, FetchConfig, ReferenceConfig,
    Result, Subject,
};

use crate::engine::{Fetcher, normalize_url};
use crate::extract::extract_text;

/// Fetches non-reference pages and turns them into documents.
pub struct WebExtractor {
    fetcher: Fetcher,
    domain_marker: String,
}

impl WebExtractor {
    pub fn new(fetch: FetchConfig, reference: &ReferenceConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch)?,
            domain_marker: reference.domain_marker.clone(),
        })
    }

    /// Fetch and extract every non-reference URL in `urls`, in input order.
    ///
    /// Reference-domain URLs and repeated URLs are dropped before any request
    /// is made. A page whose text matches an earlier page in the batch is
    /// dropped too, unless it is empty.
    #[instrument(skip_all, fields(subject_id = %subject.id, urls = urls.len()))]
    pub async fn extract_web(
        &self,
        subject: &Subject,
        urls: &[String],
        policy: FailurePolicy,
    ) -> Result<ExtractOutcome> {
        let mut outcome = ExtractOutcome::default();

        let mut seen_urls = HashSet::new();
        let targets: Vec<String> = urls
            .iter()
            .filter(|u| !u.contains(&self.domain_marker))
            .filter(|u| seen_urls.insert(normalize_url(u)))
            .cloned()
            .collect();

        if targets.is_empty() {
            return Ok(outcome);
        }

        let results = self.fetcher.fetch_all(&targets).await;
        let mut seen_content = HashSet::new();

        for (url, result) in targets.iter().zip(results) {
            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    let message = e.to_string();
                    outcome.absorb(policy, url, e)?;
                    warn!(
                        %url,
                        subject_id = %subject.id,
                        error = %message,
                        "web page failed, skipping"
                    );
                    continue;
                }
            };

            let text = extract_text(&page.html);
            let content = text.content();

            if !content.is_empty() && !seen_content.insert(content_hash(&content)) {
                debug!(%url, "duplicate page content, dropping");
                continue;
            }

            let mut metadata = DocumentMetadata::web(subject, url.clone(), text.title);
            metadata.fetched_at = Some(page.fetched_at);
            outcome.documents.push(Document::new(content, metadata));
        }

        info!(
            documents = outcome.documents.len(),
            skipped = outcome.skipped.len(),
            "web extraction complete"
        );
        Ok(outcome)
    }
}

/// SHA-256 hex digest of extracted page text.
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_shared::{DossierError, SourceKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor() -> WebExtractor {
        let fetch = FetchConfig {
            allow_private_hosts: true,
            ..FetchConfig::default()
        };
        WebExtractor::new(fetch, &ReferenceConfig::default()).unwrap()
    }

    fn ada() -> Subject {
        Subject::new("ada", "Ada Lovelace")
    }

    async fn mount_page(server: &MockServer, p: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(p.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn extracts_text_and_metadata() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/profile",
            "<html><head><title> Ada Profile </title></head><body><nav>menu</nav>\
             <h1>Ada</h1><p>Analytical Engine notes.</p></body></html>",
        )
        .await;

        let url = format!("{}/profile", server.uri());
        let outcome = extractor()
            .extract_web(&ada(), std::slice::from_ref(&url), FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(outcome.documents.len(), 1);
        let doc = &outcome.documents[0];
        assert_eq!(doc.content, "Ada\n\nAnalytical Engine notes.");
        assert_eq!(doc.source(), SourceKind::Web);
        assert_eq!(doc.url(), Some(url.as_str()));
        assert_eq!(doc.metadata.subject_id, "ada");
        assert_eq!(doc.metadata.subject_name, "Ada Lovelace");
        assert_eq!(doc.metadata.title.as_deref(), Some("Ada Profile"));
        assert!(doc.metadata.fetched_at.is_some());
    }

    #[tokio::test]
    async fn empty_urls_make_no_requests() {
        let outcome = extractor()
            .extract_web(&ada(), &[], FailurePolicy::Abort)
            .await
            .unwrap();
        assert!(outcome.documents.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[tokio::test]
    async fn reference_urls_are_never_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let urls = vec![format!("{}/wiki/wikipedia.org/Ada", server.uri())];
        let outcome = extractor()
            .extract_web(&ada(), &urls, FailurePolicy::Abort)
            .await
            .unwrap();
        assert!(outcome.documents.is_empty());
    }

    #[tokio::test]
    async fn keeps_input_order() {
        let server = MockServer::start().await;
        mount_page(&server, "/b", "<p>second</p>").await;
        mount_page(&server, "/a", "<p>first</p>").await;
        mount_page(&server, "/c", "<p>third</p>").await;

        let urls: Vec<String> = ["/a", "/b", "/c"]
            .iter()
            .map(|p| format!("{}{p}", server.uri()))
            .collect();
        let outcome = extractor()
            .extract_web(&ada(), &urls, FailurePolicy::Abort)
            .await
            .unwrap();

        let contents: Vec<&str> = outcome.documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failing_page_is_skipped_under_skip_policy() {
        let server = MockServer::start().await;
        mount_page(&server, "/ok", "<p>fine</p>").await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let broken = format!("{}/broken", server.uri());
        let urls = vec![broken.clone(), format!("{}/ok", server.uri())];
        let outcome = extractor()
            .extract_web(&ada(), &urls, FailurePolicy::SkipAndContinue)
            .await
            .unwrap();

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].content, "fine");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, broken);
    }

    #[tokio::test]
    async fn failing_page_aborts_under_abort_policy() {
        let server = MockServer::start().await;
        mount_page(&server, "/ok", "<p>fine</p>").await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let urls = vec![format!("{}/ok", server.uri()), format!("{}/broken", server.uri())];
        let err = extractor()
            .extract_web(&ada(), &urls, FailurePolicy::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, DossierError::SourceFetch { .. }));
    }

    #[tokio::test]
    async fn page_without_text_yields_empty_document() {
        let server = MockServer::start().await;
        mount_page(&server, "/blank", "<html><body><div>layout only</div></body></html>").await;
        mount_page(&server, "/blank2", "<html><body><span>also nothing</span></body></html>").await;

        let urls = vec![format!("{}/blank", server.uri()), format!("{}/blank2", server.uri())];
        let outcome = extractor()
            .extract_web(&ada(), &urls, FailurePolicy::Abort)
            .await
            .unwrap();

        // Empty pages are never treated as duplicates of each other.
        assert_eq!(outcome.documents.len(), 2);
        assert!(outcome.documents.iter().all(|d| d.content.is_empty()));
    }

    #[tokio::test]
    async fn duplicate_urls_and_content_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(path("/bio"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Same text</p>"))
            .expect(1)
            .mount(&server)
            .await;
        mount_page(
            &server,
            "/mirror",
            "<html><head><title>Mirror</title></head><p>Same text</p></html>",
        )
        .await;

        let urls = vec![
            format!("{}/bio", server.uri()),
            format!("{}/bio#early-life", server.uri()),
            format!("{}/mirror", server.uri()),
        ];
        let outcome = extractor()
            .extract_web(&ada(), &urls, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].url(), Some(urls[0].as_str()));
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        let hash = content_hash("Ada");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("Ada"));
        assert_ne!(hash, content_hash("ada"));
    }
}
