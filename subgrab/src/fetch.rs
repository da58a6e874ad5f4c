//! The injected HTTP capability.
//!
//! The extraction pipeline never talks to a concrete HTTP client; it sends
//! GET requests through a [`Fetch`] implementation supplied by the caller.
//! [`ReqwestFetch`] is the default.

use crate::error::Result;
use bytes::Bytes;

/// A plain HTTP response: status, headers, and the full body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers. Name lookup is case-insensitive via
    /// [`FetchResponse::header`].
    pub headers: Vec<(String, String)>,
    /// The response body.
    pub body: Bytes,
}

impl FetchResponse {
    /// Look up a response header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP client capability.
///
/// Implementations issue a GET for `url` with the given request headers
/// and return the complete response. Timeouts, retries, proxies, and
/// authentication are the implementation's business.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Send a GET request.
    async fn send(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse>;
}

/// Default [`Fetch`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Create a fetcher with a fresh client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher around an existing client (connection pools,
    /// custom TLS, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetch for ReqwestFetch {
    async fn send(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
