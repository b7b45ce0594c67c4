//! HTTP client for forwarding requests to the upstream hosts.
//! One client is shared by every handler so connections to each host are
//! pooled. It never retries, never follows redirects and sets no timeouts.

use bytes::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use reqwest::redirect::Policy;
use url::Url;

use crate::errors::{ProxyError, ProxyResult};

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

/// Status and buffered body of an upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl UpstreamClient {
    pub fn new() -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(32)
            .redirect(Policy::none())
            .build()
            .map_err(ProxyError::Upstream)?;

        Ok(Self { client })
    }

    /// Sends the request with no body at all when `body` is `None`.
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> ProxyResult<UpstreamResponse> {
        let url = Url::parse(url).map_err(|source| ProxyError::InvalidUpstreamUri {
            uri: url.to_string(),
            source,
        })?;

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let resp = request.send().await.map_err(ProxyError::Upstream)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(ProxyError::UpstreamBody)?;

        Ok(UpstreamResponse { status, body })
    }
}
