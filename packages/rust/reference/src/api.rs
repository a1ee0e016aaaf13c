//! MediaWiki action API response shapes (`formatversion=2`).

use serde::Deserialize;

/// Envelope shared by every `action=query` response.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse<T> {
    pub query: Option<T>,
    pub error: Option<ApiError>,
}

/// Error object returned in place of `query` on a bad request.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub code: String,
    pub info: String,
}

/// `list=search` payload.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchHit {
    pub title: String,
}

/// `prop=extracts|info` payload.
#[derive(Debug, Deserialize)]
pub(crate) struct PagesQuery {
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    pub title: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub fullurl: Option<String>,
}
