//! Batched page fetching over one shared HTTP client.
//!
//! A batch is fetched concurrently (bounded by a semaphore) so connection
//! setup is amortized, and results come back in input order.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};
use url::Url;

use dossier_shared::{DossierError, FetchConfig, Result};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("Dossier/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FetchedPage
// ---------------------------------------------------------------------------

/// Raw HTML retrieved for one URL.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL as requested.
    pub url: String,
    /// HTTP status code.
    pub status_code: u16,
    /// Response body.
    pub html: String,
    /// When the response was received.
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Concurrent batch fetcher with SSRF protection and size limits.
pub struct Fetcher {
    config: FetchConfig,
    client: Client,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DossierError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Fetch every URL, returning one result per input in input order.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<Result<FetchedPage>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let client = self.client.clone();
            let sem = Arc::clone(&semaphore);
            let url = url.clone();
            let max_bytes = self.config.max_response_bytes;
            let allow_private = self.config.allow_private_hosts;

            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| DossierError::fetch(&url, format!("fetch queue closed: {e}")))?;
                fetch_page(&client, &url, max_bytes, allow_private).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (url, handle) in urls.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(DossierError::fetch(url, format!("fetch task failed: {e}"))),
            };
            if let Err(e) = &result {
                debug!(%url, error = %e, "fetch failed");
            }
            results.push(result);
        }
        results
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch a single page body.
async fn fetch_page(
    client: &Client,
    url: &str,
    max_bytes: u64,
    allow_private: bool,
) -> Result<FetchedPage> {
    let parsed =
        Url::parse(url).map_err(|e| DossierError::fetch(url, format!("invalid URL: {e}")))?;

    if !allow_private && is_ssrf_target(&parsed) {
        warn!(%url, "SSRF protection: blocked");
        return Err(DossierError::fetch(url, "refused: private or non-HTTP target"));
    }

    debug!(%url, "fetching page");

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| DossierError::fetch(url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DossierError::fetch(url, format!("HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(DossierError::fetch(
                url,
                format!("response too large ({len} bytes, max {max_bytes})"),
            ));
        }
    }

    let html = response
        .text()
        .await
        .map_err(|e| DossierError::fetch(url, format!("body read failed: {e}")))?;

    if html.len() as u64 > max_bytes {
        return Err(DossierError::fetch(
            url,
            format!("response too large ({} bytes, max {max_bytes})", html.len()),
        ));
    }

    Ok(FetchedPage {
        url: url.to_string(),
        status_code: status.as_u16(),
        html,
        fetched_at: Utc::now(),
    })
}

/// Normalize a URL for deduplication (strip fragment and trailing slash).
///
/// Unparseable input is returned unchanged so it still fails at fetch time.
pub fn normalize_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    parsed.set_fragment(None);
    let mut s = parsed.to_string();
    // Remove trailing slash for consistency (except root path)
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn local_config() -> FetchConfig {
        FetchConfig {
            allow_private_hosts: true,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://example.com/bio/#early-life"),
            "https://example.com/bio"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn test_ssrf_protection_blocks_file() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_blocks_private_ip() {
        for raw in [
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://[::1]/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
    }

    #[test]
    fn test_ssrf_protection_allows_public() {
        let url = Url::parse("https://example.com/people/ada").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_blocks_localhost() {
        let url = Url::parse("http://localhost:3000/api").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_input_order() {
        let server = MockServer::start().await;
        for (p, body) in [("/one", "first"), ("/two", "second"), ("/three", "third")] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let urls: Vec<String> = ["/one", "/two", "/three"]
            .iter()
            .map(|p| format!("{}{p}", server.uri()))
            .collect();
        let fetcher = Fetcher::new(FetchConfig {
            concurrency: 2,
            ..local_config()
        })
        .unwrap();
        let results = fetcher.fetch_all(&urls).await;

        let bodies: Vec<String> = results.into_iter().map(|r| r.unwrap().html).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_fetch_reports_http_errors_per_url() {
        let server = MockServer::start().await;
        Mock::given(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
            .mount(&server)
            .await;
        Mock::given(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let urls = vec![format!("{}/gone", server.uri()), format!("{}/ok", server.uri())];
        let results = Fetcher::new(local_config()).unwrap().fetch_all(&urls).await;

        let err = results[0].as_ref().unwrap_err();
        assert!(err.is_source_failure());
        assert!(err.to_string().contains("404"));
        assert_eq!(results[1].as_ref().unwrap().status_code, 200);
    }

    #[tokio::test]
    async fn test_fetch_blocks_private_hosts_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let urls = vec![format!("{}/a", server.uri())];
        let results = Fetcher::new(FetchConfig::default()).unwrap().fetch_all(&urls).await;
        assert!(results[0].as_ref().unwrap_err().to_string().contains("refused"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(FetchConfig {
            max_response_bytes: 1024,
            ..local_config()
        })
        .unwrap();
        let results = fetcher.fetch_all(&[format!("{}/big", server.uri())]).await;
        assert!(results[0].as_ref().unwrap_err().to_string().contains("too large"));
    }
}
