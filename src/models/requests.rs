//! Request DTOs for the proxy API
//!
//! Defines the structure of incoming query strings.

use url::form_urlencoded;

use crate::error::{AppError, Result};

/// Query string of `GET /proxy?url=<percent-encoded upstream URL>`.
///
/// Parsed leniently from the raw query so that a malformed query still
/// yields the standard validation error body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyQuery {
    /// Target URL, percent-decoded once
    pub url: Option<String>,
}

impl ProxyQuery {
    /// Parses the raw query string. The first `url` parameter wins.
    ///
    /// Form decoding turns a literal `+` into a space, so the value must be
    /// fully percent-encoded for a `+` to reach upstream.
    pub fn parse(raw: Option<&str>) -> Self {
        let url = raw.and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
        });

        Self { url }
    }

    /// Returns the target URL, or a validation error when absent.
    pub fn target(&self) -> Result<&str> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(AppError::Validation(
                "Missing required 'url' query parameter".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plus_becomes_space() {
        let query = ProxyQuery::parse(Some("url=https://www.whitehouse.gov/wp-json/?s=a+b"));
        assert_eq!(query.target().unwrap(), "https://www.whitehouse.gov/wp-json/?s=a b");

        let query = ProxyQuery::parse(Some("url=https%3A%2F%2Fwww.whitehouse.gov%2Fwp-json%2F%3Fs%3Da%2Bb"));
        assert_eq!(query.target().unwrap(), "https://www.whitehouse.gov/wp-json/?s=a+b");
    }

    #[test]
    fn test_parse_decodes_once() {
        let query = ProxyQuery::parse(Some("url=https%3A%2F%2Fwww.whitehouse.gov%2Ffeed%2F"));
        assert_eq!(query.target().unwrap(), "https://www.whitehouse.gov/feed/");
    }

    #[test]
    fn test_parse_keeps_second_layer_encoded() {
        let query = ProxyQuery::parse(Some("url=https%3A%2F%2Fwww.whitehouse.gov%2Ffeed%2F%252e%252e"));
        assert_eq!(
            query.target().unwrap(),
            "https://www.whitehouse.gov/feed/%2e%2e"
        );
    }

    #[test]
    fn test_missing_url() {
        assert!(ProxyQuery::parse(None).target().is_err());
        assert!(ProxyQuery::parse(Some("other=1")).target().is_err());
        assert!(ProxyQuery::parse(Some("url=")).target().is_err());
    }

    #[test]
    fn test_first_url_wins() {
        let query = ProxyQuery::parse(Some("url=a&url=b"));
        assert_eq!(query.url.as_deref(), Some("a"));
    }
}
