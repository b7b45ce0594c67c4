use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream host: {0}")]
    InvalidUpstreamHost(String),

    #[error("route prefix must start with '/': {0}")]
    InvalidPrefix(String),

    #[error("access token cannot be sent in a header value")]
    InvalidCredential,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("path '{path}' is outside prefix '{prefix}'")]
    OutsidePrefix { path: String, prefix: String },

    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("invalid upstream uri '{uri}': {source}")]
    InvalidUpstreamUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    #[error("failed to read upstream body: {0}")]
    UpstreamBody(#[source] reqwest::Error),

    #[error("response build failed: {0}")]
    Response(#[from] axum::http::Error),
}

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::OutsidePrefix { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The single place where a failed exchange becomes a status code. Both
/// outcomes carry an empty body.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ProxyError::OutsidePrefix { .. } => tracing::debug!("Rejected: {}", self),
            _ => tracing::warn!("Proxy exchange failed: {}", self),
        }

        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, header::HeaderValue::from_static("0"));
        response
    }
}
