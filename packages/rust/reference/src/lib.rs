//! Reference-source extraction: one canonical encyclopedia article per subject.
//!
//! Articles are retrieved through the MediaWiki action API as full plaintext
//! extracts (no truncation). Two lookups are offered:
//! - [`ReferenceExtractor::extract_for_subject`] searches by subject name (or
//!   loads the subject's configured title) and propagates every failure.
//! - [`ReferenceExtractor::extract_from_urls`] loads one article per
//!   reference-domain URL in a request, applying a [`FailurePolicy`].

mod api;

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

use dossier_shared::{
    Document, DocumentMetadata, DossierError, ExtractOutcome, FailurePolicy, FetchConfig,
    ReferenceConfig, Result, Subject,
};

use api::{PagesQuery, QueryResponse, SearchQuery};

/// User-Agent string for reference API requests.
const USER_AGENT: &str = concat!("Dossier/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A resolved reference article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Canonical title after redirects.
    pub title: String,
    /// Canonical article URL.
    pub url: String,
    /// Full plaintext body.
    pub content: String,
}

// ---------------------------------------------------------------------------
// ReferenceExtractor
// ---------------------------------------------------------------------------

/// Client for the encyclopedic reference source.
pub struct ReferenceExtractor {
    client: Client,
    config: ReferenceConfig,
    max_response_bytes: u64,
}

impl ReferenceExtractor {
    /// Build an extractor with its own HTTP client.
    pub fn new(config: ReferenceConfig, fetch: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(fetch.max_redirects))
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()
            .map_err(|e| DossierError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            max_response_bytes: fetch.max_response_bytes,
        })
    }

    /// Whether `url` belongs to the reference source.
    pub fn is_reference_url(&self, url: &str) -> bool {
        url.contains(&self.config.domain_marker)
    }

    /// Load the subject's article by configured title or by name search.
    ///
    /// Returns zero documents when the search has no hit, one otherwise.
    #[instrument(skip_all, fields(subject_id = %subject.id))]
    pub async fn extract_for_subject(&self, subject: &Subject) -> Result<Vec<Document>> {
        let title = match &subject.reference_title {
            Some(title) => title.clone(),
            None => match self.search(&subject.name).await? {
                Some(title) => title,
                None => {
                    info!(name = %subject.name, "no reference article found");
                    return Ok(Vec::new());
                }
            },
        };

        let article = self.load_article(&title).await?;
        debug!(title = %article.title, chars = article.content.len(), "loaded reference article");

        Ok(vec![Document::new(
            article.content,
            DocumentMetadata::reference(subject, article.url, article.title),
        )])
    }

    /// Load one article per reference-domain URL in `urls`.
    ///
    /// Non-reference URLs are ignored. The document's `url` is the request URL.
    #[instrument(skip_all, fields(subject_id = %subject.id, urls = urls.len()))]
    pub async fn extract_from_urls(
        &self,
        subject: &Subject,
        urls: &[String],
        policy: FailurePolicy,
    ) -> Result<ExtractOutcome> {
        let mut outcome = ExtractOutcome::default();

        for url in urls.iter().filter(|u| self.is_reference_url(u)) {
            let result = match title_from_url(url) {
                Some(title) => self.load_article(&title).await,
                None => Err(DossierError::fetch(url, "no page title in URL")),
            };

            match result {
                Ok(article) => outcome.documents.push(Document::new(
                    article.content,
                    DocumentMetadata::reference(subject, url.clone(), article.title),
                )),
                Err(e) => {
                    let message = e.to_string();
                    outcome.absorb(policy, url, e)?;
                    warn!(
                        %url,
                        subject_id = %subject.id,
                        error = %message,
                        "reference article failed, skipping"
                    );
                }
            }
        }

        Ok(outcome)
    }

    /// Top search hit for `query`, if any.
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let response: QueryResponse<SearchQuery> = self
            .query(
                &[("list", "search"), ("srsearch", query), ("srlimit", "1")],
                &self.config.api_url,
            )
            .await?;

        Ok(response
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }

    /// Full plaintext article for `title`, following redirects.
    async fn load_article(&self, title: &str) -> Result<Article> {
        let article_url = self.article_url(title);
        let response: QueryResponse<PagesQuery> = self
            .query(
                &[
                    ("prop", "extracts|info"),
                    ("explaintext", "1"),
                    ("inprop", "url"),
                    ("redirects", "1"),
                    ("titles", title),
                ],
                &article_url,
            )
            .await?;

        let page = response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| DossierError::fetch(&article_url, "response contained no page"))?;

        if page.missing || page.invalid {
            return Err(DossierError::fetch(&article_url, "page does not exist"));
        }

        let url = page.fullurl.unwrap_or_else(|| self.article_url(&page.title));
        let content = clean_extract(page.extract.as_deref().unwrap_or_default());

        Ok(Article {
            title: page.title,
            url,
            content,
        })
    }

    /// Issue an `action=query` request. Failures are reported against `context_url`.
    async fn query<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        context_url: &str,
    ) -> Result<QueryResponse<T>> {
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| DossierError::fetch(context_url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DossierError::fetch(context_url, format!("HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_response_bytes {
                return Err(DossierError::fetch(
                    context_url,
                    format!("response too large ({len} bytes, max {})", self.max_response_bytes),
                ));
            }
        }

        let parsed: QueryResponse<T> = response
            .json()
            .await
            .map_err(|e| DossierError::fetch(context_url, format!("malformed response: {e}")))?;

        if let Some(err) = &parsed.error {
            return Err(DossierError::fetch(
                context_url,
                format!("{}: {}", err.code, err.info),
            ));
        }

        Ok(parsed)
    }

    /// Canonical article URL for a title.
    pub fn article_url(&self, title: &str) -> String {
        format!(
            "{}{}",
            self.config.article_base_url,
            urlencoding::encode(&title.replace(' ', "_"))
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the page title out of an article URL.
///
/// Handles `/wiki/Alan_Turing` style paths and `index.php?title=...` links.
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    let raw = match parsed.query_pairs().find(|(k, _)| k == "title") {
        Some((_, title)) => title.into_owned(),
        None => {
            let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
            urlencoding::decode(segment).ok()?.into_owned()
        }
    };

    let title = raw.replace('_', " ");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Collapse runs of blank lines and trim the article body.
fn clean_extract(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").trim().to_string()
}
