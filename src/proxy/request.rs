//! Normalizes an inbound exchange into the request that is replayed upstream.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST};
use axum::http::{HeaderName, Method};

use crate::errors::{ProxyError, ProxyResult};
use crate::middleware::key_inject::AccessToken;
use crate::proxy::header::Header;

/// Connection-management headers that are never forwarded upstream.
pub const IGNORED_HEADERS: [HeaderName; 3] = [CONNECTION, HOST, CONTENT_LENGTH];

/// Default cap on a buffered request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// An inbound request with headers filtered and rewritten and the body fully
/// buffered. Built once per exchange.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub path: String,
    pub query: Option<String>,
    pub method: Method,
    pub headers: Vec<Header>,
    /// `None` when the client sent zero bytes.
    pub body: Option<Bytes>,
}

#[async_trait]
pub trait RequestProcessor: Send + Sync {
    async fn process(&self, request: Request) -> ProxyResult<ProxyRequest>;
}

/// Filters connection headers and swaps the sandbox credential.
#[derive(Debug, Clone)]
pub struct CredentialProcessor {
    access_token: AccessToken,
    max_body_bytes: usize,
}

impl CredentialProcessor {
    pub fn new(access_token: AccessToken) -> Self {
        Self {
            access_token,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn rewrite_headers(&self, headers: Vec<Header>) -> Vec<Header> {
        headers
            .into_iter()
            .filter(|header| !IGNORED_HEADERS.contains(&header.key))
            .map(|header| self.access_token.rewrite_header(header))
            .collect()
    }
}

#[async_trait]
impl RequestProcessor for CredentialProcessor {
    async fn process(&self, request: Request) -> ProxyResult<ProxyRequest> {
        let (parts, body) = request.into_parts();

        let headers = self.rewrite_headers(Header::from_header_map(&parts.headers));
        let body = read_body(body, self.max_body_bytes).await?;

        Ok(ProxyRequest {
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            method: parts.method,
            headers,
            body,
        })
    }
}

async fn read_body(body: Body, limit: usize) -> ProxyResult<Option<Bytes>> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(ProxyError::RequestBody)?;

    if bytes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{AUTHORIZATION, USER_AGENT};

    const REAL: &str = "real-token";
    const SANDBOX: &str = "sandbox-token";

    fn processor() -> CredentialProcessor {
        CredentialProcessor::new(AccessToken::new(REAL, SANDBOX).unwrap())
    }

    #[tokio::test]
    async fn test_process_filters_and_rewrites() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/test2?unsigned=false")
            .header(HOST, "localhost:8080")
            .header(CONNECTION, "keep-alive")
            .header(CONTENT_LENGTH, "11")
            .header(USER_AGENT, "Java/17")
            .header(AUTHORIZATION, format!("Bearer {}", SANDBOX))
            .body(Body::from("hello world"))
            .unwrap();

        let processed = processor().process(request).await.unwrap();

        assert_eq!(processed.path, "/api/test2");
        assert_eq!(processed.query.as_deref(), Some("unsigned=false"));
        assert_eq!(processed.method, Method::POST);
        assert_eq!(processed.body.as_deref(), Some(&b"hello world"[..]));

        for ignored in &IGNORED_HEADERS {
            assert!(processed.headers.iter().all(|h| h.key != *ignored));
        }
        let keys: Vec<_> = processed.headers.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["user-agent", "authorization"]);
        assert_eq!(processed.headers[1].value, "Bearer real-token");
    }

    #[tokio::test]
    async fn test_empty_body_is_absent() {
        let request = axum::http::Request::builder()
            .uri("/session/test1")
            .body(Body::empty())
            .unwrap();

        let processed = processor().process(request).await.unwrap();
        assert!(processed.body.is_none());
        assert!(processed.query.is_none());
        assert_eq!(processed.method, Method::GET);
    }

    #[tokio::test]
    async fn test_oversized_body_is_an_error() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/upload")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();

        let err = processor()
            .with_max_body_bytes(16)
            .process(request)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::RequestBody(_)));
    }
}
