use std::net::{IpAddr, Ipv4Addr};

use crate::auth_proxy::ProxySettings;
use crate::models::route::{SERVICES_HOST, SESSION_HOST};
use crate::proxy::request::DEFAULT_MAX_BODY_BYTES;

/// Placeholder handed to the sandboxed game instead of the real token.
pub const DEFAULT_SANDBOX_TOKEN: &str = "00000000-0000-0000-0000-000000000000";

pub struct Config {
    pub port: u16,
    pub bind: IpAddr,
    pub session_host: String,
    pub services_host: String,
    /// Required to serve. Never printed.
    pub real_token: Option<String>,
    pub sandbox_token: String,
    /// Largest request body buffered before forwarding.
    /// Set via AUTHPROXY_MAX_BODY_BYTES. Default: 25 MiB.
    pub max_body_bytes: usize,
    /// Log one line per relayed exchange. Headers are never logged.
    pub log_exchanges: bool,
    pub log_json: bool,
}

impl Config {
    pub fn settings(&self, port: u16) -> ProxySettings {
        ProxySettings {
            bind: self.bind,
            port,
            max_body_bytes: self.max_body_bytes,
            log_exchanges: self.log_exchanges,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup. Unparseable numbers fall back to
/// their defaults.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let bind = match lookup("AUTHPROXY_BIND") {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("AUTHPROXY_BIND is not an IP address: {}", raw))?,
        None => IpAddr::V4(Ipv4Addr::LOCALHOST),
    };

    Ok(Config {
        port: lookup("AUTHPROXY_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080),
        bind,
        session_host: lookup("AUTHPROXY_SESSION_HOST").unwrap_or_else(|| SESSION_HOST.into()),
        services_host: lookup("AUTHPROXY_SERVICES_HOST").unwrap_or_else(|| SERVICES_HOST.into()),
        real_token: lookup("AUTHPROXY_REAL_TOKEN").filter(|t| !t.is_empty()),
        sandbox_token: lookup("AUTHPROXY_SANDBOX_TOKEN")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_SANDBOX_TOKEN.into()),
        max_body_bytes: lookup("AUTHPROXY_MAX_BODY_BYTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        log_exchanges: flag(lookup("AUTHPROXY_LOG_EXCHANGES")),
        log_json: flag(lookup("AUTHPROXY_LOG_JSON")),
    })
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("TRUE") | Some("yes")
    )
}
