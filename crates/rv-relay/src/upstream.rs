//! Server-side fetching of relayed targets.

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use rv_core::PreviewError;
use rv_core::PreviewResult;
use std::time::Duration;
use url::Url;

const RELAY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const RELAY_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const RELAY_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const MAX_REDIRECTS: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`.
    pub reason: String,
    pub content_type: Option<String>,
    pub body: String,
}

pub trait Upstream {
    fn fetch(&self, url: &Url) -> PreviewResult<UpstreamResponse>;
}

/// Fetches over HTTP(S) with fixed desktop browser headers, following redirects.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new() -> PreviewResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> PreviewResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(RELAY_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(RELAY_ACCEPT_LANGUAGE));

        let client = Client::builder()
            .user_agent(RELAY_USER_AGENT)
            .default_headers(headers)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|error| {
                PreviewError::new(
                    "relay.client_init",
                    format!("failed to build HTTP client: {error}"),
                )
            })?;
        Ok(Self { client })
    }
}

impl Upstream for HttpUpstream {
    fn fetch(&self, url: &Url) -> PreviewResult<UpstreamResponse> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|error| PreviewError::new("relay.upstream", error.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .text()
            .map_err(|error| PreviewError::new("relay.upstream_body", error.to_string()))?;

        Ok(UpstreamResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::HttpUpstream;

    #[test]
    fn client_builds_without_network_access() {
        assert!(HttpUpstream::new().is_ok());
    }
}
