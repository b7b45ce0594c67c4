//! Swaps the sandbox placeholder for the real access token.
//!
//! The sandboxed client only ever holds the placeholder. When it sends
//! `Authorization: Bearer <placeholder>`, the outbound request carries
//! `Authorization: Bearer <real token>` instead. Any other header, including
//! bearer tokens the proxy does not recognise, is forwarded untouched.

use std::fmt;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::errors::{ProxyError, ProxyResult};
use crate::proxy::header::Header;

const BEARER_PREFIX: &str = "Bearer ";

/// The real/sandbox credential pair. Immutable for the life of the proxy and
/// safe to share between concurrent requests.
#[derive(Clone)]
pub struct AccessToken {
    real_access_token: Zeroizing<String>,
    sandbox_token: Zeroizing<String>,
    bearer: HeaderValue,
}

impl AccessToken {
    pub fn new(
        real_access_token: impl Into<String>,
        sandbox_token: impl Into<String>,
    ) -> ProxyResult<Self> {
        let real_access_token = Zeroizing::new(real_access_token.into());
        let sandbox_token = Zeroizing::new(sandbox_token.into());

        let mut bearer = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, *real_access_token))
            .map_err(|_| ProxyError::InvalidCredential)?;
        bearer.set_sensitive(true);

        Ok(Self {
            real_access_token,
            sandbox_token,
            bearer,
        })
    }

    /// Returns the header unchanged unless it is exactly
    /// `Authorization: Bearer <sandbox token>`.
    pub fn rewrite_header(&self, header: Header) -> Header {
        if header.key != AUTHORIZATION {
            return header;
        }

        let token = match header.value.to_str().ok().and_then(|v| v.strip_prefix(BEARER_PREFIX)) {
            Some(token) => token,
            None => return header,
        };

        if bool::from(token.as_bytes().ct_eq(self.sandbox_token.as_bytes())) {
            Header::new(AUTHORIZATION, self.bearer.clone())
        } else {
            header
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("real_access_token", &"[REDACTED]")
            .field("sandbox_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{CONTENT_TYPE, PROXY_AUTHORIZATION};

    const REAL: &str = "6e5fc4e4-efa7-48e8-8837-ee658dad7f27";
    const SANDBOX: &str = "00000000-0000-0000-0000-000000000000";

    fn token() -> AccessToken {
        AccessToken::new(REAL, SANDBOX).unwrap()
    }

    fn auth(value: &str) -> Header {
        Header::new(AUTHORIZATION, HeaderValue::from_str(value).unwrap())
    }

    #[test]
    fn test_sandbox_bearer_is_replaced() {
        let rewritten = token().rewrite_header(auth(&format!("Bearer {}", SANDBOX)));
        assert_eq!(rewritten.key, AUTHORIZATION);
        assert_eq!(rewritten.value, format!("Bearer {}", REAL).as_str());
        assert!(rewritten.value.is_sensitive());
    }

    #[test]
    fn test_unknown_bearer_passes_through() {
        let header = auth("Bearer unknown");
        assert_eq!(token().rewrite_header(header.clone()), header);
    }

    #[test]
    fn test_sandbox_prefix_or_suffix_is_not_a_match() {
        let t = token();
        for value in [
            format!("Bearer {}0", SANDBOX),
            format!("Bearer {}", &SANDBOX[1..]),
            format!("Bearer  {}", SANDBOX),
            format!("Bearer {} ", SANDBOX),
        ] {
            let header = auth(&value);
            assert_eq!(t.rewrite_header(header.clone()), header, "{}", value);
        }
    }

    #[test]
    fn test_other_schemes_pass_through() {
        let t = token();
        for value in [
            format!("Basic {}", SANDBOX),
            format!("bearer {}", SANDBOX),
            SANDBOX.to_string(),
        ] {
            let header = auth(&value);
            assert_eq!(t.rewrite_header(header.clone()), header, "{}", value);
        }
    }

    #[test]
    fn test_other_keys_pass_through() {
        let t = token();
        let value = HeaderValue::from_str(&format!("Bearer {}", SANDBOX)).unwrap();
        for key in [PROXY_AUTHORIZATION, CONTENT_TYPE] {
            let header = Header::new(key, value.clone());
            assert_eq!(t.rewrite_header(header.clone()), header);
        }
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let rendered = format!("{:?}", token());
        assert!(!rendered.contains(REAL));
        assert!(!rendered.contains(SANDBOX));
    }

    #[test]
    fn test_real_token_only_leaves_as_sensitive_header() {
        let rewritten = token().rewrite_header(auth(&format!("Bearer {}", SANDBOX)));
        assert!(!format!("{:?}", rewritten).contains(REAL));
    }

    #[test]
    fn test_real_token_must_be_header_safe() {
        assert!(matches!(
            AccessToken::new("line\nbreak", SANDBOX),
            Err(ProxyError::InvalidCredential)
        ));
    }
}
