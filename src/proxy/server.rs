use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::errors::{ProxyError, ProxyResult};
use crate::proxy::handler::ProxyHandler;
use crate::proxy::transform;

/// Pending connections queued by the kernel before `accept`.
pub const BACKLOG: u32 = 8;

/// Handlers keyed by path prefix, longest prefix first.
struct RouteTable {
    entries: Vec<(String, ProxyHandler)>,
}

impl RouteTable {
    fn new(mut entries: Vec<(String, ProxyHandler)>) -> Self {
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { entries }
    }

    fn find(&self, path: &str) -> Option<&ProxyHandler> {
        self.entries
            .iter()
            .find(|(prefix, _)| transform::strip_prefix(path, prefix).is_some())
            .map(|(_, handler)| handler)
    }
}

/// The local listener. Bound on creation, serving only after [`start`].
///
/// [`start`]: ProxyServer::start
pub struct ProxyServer {
    local_addr: SocketAddr,
    listener: Option<TcpListener>,
    router: Router,
    task: Option<JoinHandle<()>>,
}

impl ProxyServer {
    /// Binds `addr` and registers each handler under its prefix. Must be
    /// called from within a Tokio runtime.
    pub fn bind(addr: SocketAddr, handlers: Vec<(String, ProxyHandler)>) -> ProxyResult<Self> {
        let bind_err = |source: std::io::Error| ProxyError::Bind { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        // Windows lets SO_REUSEADDR bind a port that is already in use.
        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let listener = socket.listen(BACKLOG).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        for (prefix, handler) in &handlers {
            tracing::debug!(
                "Registered {} -> {}",
                prefix,
                handler.route().upstream_host
            );
        }

        Ok(Self {
            local_addr,
            listener: Some(listener),
            router: router(handlers),
            task: None,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections. Calling it again has no effect.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let router = self.router.clone();
        let addr = self.local_addr;

        self.task = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Proxy listener on {} stopped: {}", addr, e);
            }
        }));
        tracing::info!("Auth proxy listening on {}", addr);
    }

    /// Stops accepting and releases the socket. In-flight requests are not
    /// drained.
    pub async fn close(&mut self) {
        self.listener.take();
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            tracing::info!("Auth proxy on {} closed", self.local_addr);
        }
    }
}

impl Drop for ProxyServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn router(handlers: Vec<(String, ProxyHandler)>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(Arc::new(RouteTable::new(handlers)))
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(table): State<Arc<RouteTable>>, request: Request) -> Response {
    match table.find(request.uri().path()) {
        Some(handler) => handler.handle(request).await,
        None => ProxyError::OutsidePrefix {
            path: request.uri().path().to_string(),
            prefix: table
                .entries
                .iter()
                .map(|(prefix, _)| prefix.as_str())
                .collect::<Vec<_>>()
                .join("|"),
        }
        .into_response(),
    }
}
