//! URL rewriting for upstream requests.
//! Removes the route prefix once from the start of the path and appends the
//! remainder (and the original query, if any) to the upstream host.

/// Unlike a plain `starts_with`, the prefix only matches whole path segments,
/// so `/sessionx` is not under `/session`. This is a security boundary: with
/// a string match, `/session.evil.example/x` would become
/// `https://sessionserver.mojang.com.evil.example/x` and the real token would
/// be sent to a host the proxy was never configured for.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

pub fn rewrite_url(upstream_host: &str, path_without_prefix: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}{}?{}", upstream_host, path_without_prefix, query),
        None => format!("{}{}", upstream_host, path_without_prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_removed_once_from_start() {
        assert_eq!(strip_prefix("/session/session/x", "/session"), Some("/session/x"));
        assert_eq!(strip_prefix("/session", "/session"), Some(""));
        assert_eq!(strip_prefix("/api/session", "/session"), None);
    }

    #[test]
    fn test_prefix_must_end_on_segment_boundary() {
        assert_eq!(strip_prefix("/sessionx", "/session"), None);
        assert_eq!(strip_prefix("/session.evil.example/x", "/session"), None);
        assert_eq!(strip_prefix("/session/", "/session"), Some("/"));
    }

    #[test]
    fn test_rewrite_url() {
        assert_eq!(
            rewrite_url("https://sessionserver.mojang.com", "/session/minecraft/join", None),
            "https://sessionserver.mojang.com/session/minecraft/join"
        );
        assert_eq!(
            rewrite_url("http://127.0.0.1:9000", "/profile/abc", Some("unsigned=false")),
            "http://127.0.0.1:9000/profile/abc?unsigned=false"
        );
    }
}
