use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::errors::{ProxyError, ProxyResult};
use crate::models::route::Route;
use crate::proxy::header::Header;
use crate::proxy::request::RequestProcessor;
use crate::proxy::transform;
use crate::proxy::upstream::UpstreamClient;

/// Forwards every request under one prefix to one upstream host.
#[derive(Clone)]
pub struct ProxyHandler {
    processor: Arc<dyn RequestProcessor>,
    route: Route,
    client: UpstreamClient,
    log_exchanges: bool,
}

/// An upstream answer ready to be copied back to the client.
#[derive(Debug)]
pub struct Relayed {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyHandler {
    pub fn new(processor: Arc<dyn RequestProcessor>, route: Route, client: UpstreamClient) -> Self {
        Self {
            processor,
            route,
            client,
            log_exchanges: false,
        }
    }

    pub fn with_exchange_logging(mut self, enabled: bool) -> Self {
        self.log_exchanges = enabled;
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Handles one exchange. Failures become a 400 or 500 with an empty body
    /// here and nowhere else.
    #[tracing::instrument(
        name = "proxy",
        skip_all,
        fields(
            req_id = %uuid::Uuid::new_v4(),
            prefix = %self.route.prefix,
            method = %request.method(),
            path = %request.uri().path(),
        )
    )]
    pub async fn handle(&self, request: Request) -> Response {
        match self.forward(request).await {
            Ok(relayed) => relayed.into_response(),
            Err(e) => e.into_response(),
        }
    }

    async fn forward(&self, request: Request) -> ProxyResult<Relayed> {
        let request = self.processor.process(request).await?;

        let path_without_prefix = transform::strip_prefix(&request.path, &self.route.prefix)
            .ok_or_else(|| ProxyError::OutsidePrefix {
                path: request.path.clone(),
                prefix: self.route.prefix.clone(),
            })?;

        let upstream_url = transform::rewrite_url(
            &self.route.upstream_host,
            path_without_prefix,
            request.query.as_deref(),
        );
        let request_bytes = request.body.as_ref().map_or(0, Bytes::len);

        let response = self
            .client
            .forward(
                request.method.clone(),
                &upstream_url,
                Header::to_header_map(&request.headers),
                request.body,
            )
            .await?;

        if self.log_exchanges {
            tracing::info!(
                method = %request.method,
                path = %request.path,
                upstream = %upstream_url,
                status = response.status.as_u16(),
                request_bytes,
                response_bytes = response.body.len(),
                "Relayed exchange"
            );
        } else {
            tracing::debug!(status = response.status.as_u16(), "Relayed upstream response");
        }

        Ok(Relayed {
            status: response.status,
            body: response.body,
        })
    }
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let length = HeaderValue::from(self.body.len());
        let body = if self.body.is_empty() {
            Body::empty()
        } else {
            Body::from(self.body)
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        response.headers_mut().insert(header::CONTENT_LENGTH, length);
        response
    }
}
