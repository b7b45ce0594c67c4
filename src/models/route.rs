use serde::Serialize;
use url::Url;

use crate::errors::{ProxyError, ProxyResult};

pub const SESSION_HOST: &str = "https://sessionserver.mojang.com";
pub const SESSION_PATH: &str = "/session";
pub const SESSION_SYSTEM_PROPERTY: &str = "minecraft.api.session.host";

pub const SERVICES_HOST: &str = "https://api.minecraftservices.com";
pub const SERVICES_PATH: &str = "/api";
pub const SERVICES_SYSTEM_PROPERTY: &str = "minecraft.api.services.host";

/// A local path prefix and the upstream host it forwards to.
///
/// `redirect_key` names the property a launcher sets to point the game at
/// this route; routes without one are reachable but not advertised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub prefix: String,
    pub upstream_host: String,
    pub redirect_key: Option<String>,
}

impl Route {
    /// Fails unless `upstream_host` is an absolute `http://` or `https://`
    /// URL. A trailing slash is dropped so the remainder of the path can be
    /// appended directly.
    pub fn new(prefix: impl Into<String>, upstream_host: impl Into<String>) -> ProxyResult<Self> {
        let prefix = prefix.into();
        let upstream_host = upstream_host.into();

        if !upstream_host.starts_with("http://") && !upstream_host.starts_with("https://") {
            return Err(ProxyError::InvalidUpstreamHost(upstream_host));
        }
        if Url::parse(&upstream_host).is_err() {
            return Err(ProxyError::InvalidUpstreamHost(upstream_host));
        }
        if !prefix.starts_with('/') {
            return Err(ProxyError::InvalidPrefix(prefix));
        }

        Ok(Self {
            prefix,
            upstream_host: upstream_host.trim_end_matches('/').to_string(),
            redirect_key: None,
        })
    }

    pub fn with_redirect_key(mut self, key: impl Into<String>) -> Self {
        self.redirect_key = Some(key.into());
        self
    }

    pub fn session(upstream_host: impl Into<String>) -> ProxyResult<Self> {
        Ok(Self::new(SESSION_PATH, upstream_host)?.with_redirect_key(SESSION_SYSTEM_PROPERTY))
    }

    pub fn services(upstream_host: impl Into<String>) -> ProxyResult<Self> {
        Ok(Self::new(SERVICES_PATH, upstream_host)?.with_redirect_key(SERVICES_SYSTEM_PROPERTY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_is_required() {
        for host in ["sessionserver.mojang.com", "ftp://example.com", "localhost:8081", ""] {
            assert!(
                matches!(Route::new("/session", host), Err(ProxyError::InvalidUpstreamHost(_))),
                "{} should be rejected",
                host
            );
        }
    }

    #[test]
    fn test_default_routes() {
        let session = Route::session(SESSION_HOST).unwrap();
        assert_eq!(session.prefix, "/session");
        assert_eq!(session.upstream_host, "https://sessionserver.mojang.com");
        assert_eq!(session.redirect_key.as_deref(), Some("minecraft.api.session.host"));

        let services = Route::services(SERVICES_HOST).unwrap();
        assert_eq!(services.prefix, "/api");
        assert_eq!(services.redirect_key.as_deref(), Some("minecraft.api.services.host"));
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        assert!(matches!(
            Route::new("session", SESSION_HOST),
            Err(ProxyError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_trailing_slash_is_dropped() {
        let route = Route::new("/api", "http://localhost:8081/").unwrap();
        assert_eq!(route.upstream_host, "http://localhost:8081");
    }
}
