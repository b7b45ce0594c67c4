//! The auth proxy as a whole: one credential pair, one shared upstream
//! client, one handler per route, all behind a single local listener.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use serde::Serialize;

use crate::errors::ProxyResult;
use crate::middleware::key_inject::AccessToken;
use crate::models::route::{
    Route, SERVICES_HOST, SERVICES_SYSTEM_PROPERTY, SESSION_HOST, SESSION_SYSTEM_PROPERTY,
};
use crate::proxy::handler::ProxyHandler;
use crate::proxy::request::{CredentialProcessor, DEFAULT_MAX_BODY_BYTES};
use crate::proxy::server::ProxyServer;
use crate::proxy::upstream::UpstreamClient;

/// Listener and pipeline knobs that are not part of the route table.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub bind: IpAddr,
    pub port: u16,
    pub max_body_bytes: usize,
    pub log_exchanges: bool,
}

impl ProxySettings {
    pub fn new(port: u16) -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_exchanges: false,
        }
    }
}

pub struct AuthProxy {
    port: u16,
    routes: Vec<Route>,
    server: ProxyServer,
    // Shared by every handler; dropped with the proxy.
    _client: UpstreamClient,
}

impl AuthProxy {
    /// Starts a proxy on `port` in front of the public session and services
    /// hosts.
    pub fn start(port: u16, access_token: AccessToken) -> ProxyResult<Self> {
        Self::start_with_hosts(port, access_token, SESSION_HOST, SERVICES_HOST)
    }

    pub fn start_with_hosts(
        port: u16,
        access_token: AccessToken,
        session_host: &str,
        services_host: &str,
    ) -> ProxyResult<Self> {
        let routes = vec![Route::session(session_host)?, Route::services(services_host)?];
        Self::start_with_routes(ProxySettings::new(port), access_token, routes)
    }

    /// Binds and starts the listener before returning. `port` 0 picks a free
    /// port; [`port`](Self::port) reports the one actually bound.
    pub fn start_with_routes(
        settings: ProxySettings,
        access_token: AccessToken,
        routes: Vec<Route>,
    ) -> ProxyResult<Self> {
        let client = UpstreamClient::new()?;
        let processor = Arc::new(
            CredentialProcessor::new(access_token).with_max_body_bytes(settings.max_body_bytes),
        );

        let handlers = routes
            .iter()
            .map(|route| {
                let handler = ProxyHandler::new(processor.clone(), route.clone(), client.clone())
                    .with_exchange_logging(settings.log_exchanges);
                (route.prefix.clone(), handler)
            })
            .collect();

        let mut server = ProxyServer::bind(SocketAddr::new(settings.bind, settings.port), handlers)?;
        server.start();

        Ok(Self {
            port: server.local_addr().port(),
            routes,
            server,
            _client: client,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Local address of the route advertised under `redirect_key`, if one is
    /// registered.
    pub fn address_for(&self, redirect_key: &str) -> Option<String> {
        self.routes
            .iter()
            .find(|route| route.redirect_key.as_deref() == Some(redirect_key))
            .map(|route| proxy_address(self.port, &route.prefix))
    }

    pub fn session_proxy_address(&self) -> Option<String> {
        self.address_for(SESSION_SYSTEM_PROPERTY)
    }

    pub fn api_proxy_address(&self) -> Option<String> {
        self.address_for(SERVICES_SYSTEM_PROPERTY)
    }

    /// Property overrides pointing the game at this proxy, one per route
    /// with a redirect key.
    pub fn system_properties(&self) -> BTreeMap<String, String> {
        system_properties(self.port, &self.routes)
    }

    /// The same overrides as `-Dkey=value` JVM arguments.
    pub fn arguments(&self) -> Vec<String> {
        arguments(&self.system_properties())
    }

    pub async fn close(mut self) {
        self.server.close().await;
    }
}

pub fn proxy_address(port: u16, prefix: &str) -> String {
    format!("http://localhost:{}{}", port, prefix)
}

pub fn system_properties(port: u16, routes: &[Route]) -> BTreeMap<String, String> {
    routes
        .iter()
        .filter_map(|route| {
            route
                .redirect_key
                .as_ref()
                .map(|key| (key.clone(), proxy_address(port, &route.prefix)))
        })
        .collect()
}

/// Route table plus the property overrides derived from it, as printed by
/// `authproxy properties --json`.
#[derive(Debug, Serialize)]
pub struct RedirectSurface<'a> {
    pub routes: &'a [Route],
    pub properties: BTreeMap<String, String>,
}

pub fn redirect_surface(port: u16, routes: &[Route]) -> RedirectSurface<'_> {
    RedirectSurface {
        routes,
        properties: system_properties(port, routes),
    }
}

pub fn arguments(properties: &BTreeMap<String, String>) -> Vec<String> {
    properties
        .iter()
        .map(|(key, value)| format!("-D{}={}", key, value))
        .collect()
}
