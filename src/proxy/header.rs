use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// One header occurrence. Multi-valued headers are kept as repeated pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: HeaderName,
    pub value: HeaderValue,
}

impl Header {
    pub fn new(key: HeaderName, value: HeaderValue) -> Self {
        Self { key, value }
    }

    /// Flattens a header map into pairs. Values for one key keep their
    /// order and follow each other.
    pub fn from_header_map(headers: &HeaderMap) -> Vec<Header> {
        headers
            .iter()
            .map(|(key, value)| Header::new(key.clone(), value.clone()))
            .collect()
    }

    /// Rebuilds a header map, appending so repeated keys are never merged.
    pub fn to_header_map(headers: &[Header]) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(headers.len());
        for header in headers {
            map.append(header.key.clone(), header.value.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCEPT, USER_AGENT};

    #[test]
    fn test_repeated_keys_are_kept_as_pairs() {
        let mut map = HeaderMap::new();
        map.append(ACCEPT, HeaderValue::from_static("text/plain"));
        map.append(ACCEPT, HeaderValue::from_static("application/json"));
        map.append(USER_AGENT, HeaderValue::from_static("Minecraft"));

        let headers = Header::from_header_map(&map);
        assert_eq!(headers.len(), 3);

        let accepts: Vec<_> = headers.iter().filter(|h| h.key == ACCEPT).collect();
        assert_eq!(accepts[0].value, "text/plain");
        assert_eq!(accepts[1].value, "application/json");

        let rebuilt = Header::to_header_map(&headers);
        let values: Vec<_> = rebuilt.get_all(ACCEPT).iter().collect();
        assert_eq!(values, vec!["text/plain", "application/json"]);
        assert_eq!(rebuilt[USER_AGENT], "Minecraft");
    }
}
