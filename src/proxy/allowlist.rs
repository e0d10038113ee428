//! URL allow-list
//!
//! Only absolute HTTPS URLs on the upstream host, under a fixed set of path
//! prefixes, may be proxied. Everything else is rejected before any
//! network work happens.

use url::Url;

use crate::error::{AppError, Result};

// == Allow-list Constants ==
/// The single host the proxy may fetch from.
pub const UPSTREAM_HOST: &str = "www.whitehouse.gov";

/// Path prefixes that may be fetched, matched at a segment boundary.
pub const ALLOWED_PATH_PREFIXES: [&str; 3] = ["/feed", "/briefing-room", "/wp-json"];

/// Encoded sequences that are never accepted: `%`, `.`, `/` and `\`.
const FORBIDDEN_ENCODINGS: [&str; 4] = ["%25", "%2e", "%2f", "%5c"];

// == Is Allowed ==
/// Returns true if `raw` may be fetched from upstream.
pub fn is_allowed(raw: &str) -> bool {
    if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c.is_control() || c == '\\') {
        return false;
    }

    let lowered = raw.to_ascii_lowercase();
    if FORBIDDEN_ENCODINGS.iter().any(|seq| lowered.contains(seq)) {
        return false;
    }
    if has_dot_segment(&lowered) {
        return false;
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return false,
    };

    url.scheme() == "https"
        && url.username().is_empty()
        && url.password().is_none()
        && url.port().is_none()
        && url.host_str() == Some(UPSTREAM_HOST)
        && has_allowed_prefix(url.path())
}

// == Canonicalize ==
/// Validates the `url` query value and returns the canonical upstream URL.
///
/// The value has already been percent-decoded once by query parsing. A
/// further decoding layer is only tolerated when it does not change the
/// allow-list verdict. The returned URL has no fragment.
pub fn canonicalize(target: &str) -> Result<Url> {
    let target = target.trim();
    if target.is_empty() {
        return Err(AppError::Validation(
            "Missing required 'url' query parameter".to_string(),
        ));
    }

    let verdict = is_allowed(target);

    if let Ok(decoded) = urlencoding::decode(target) {
        if decoded != target && is_allowed(&decoded) != verdict {
            return Err(AppError::Validation(
                "URL contains an ambiguous encoding layer".to_string(),
            ));
        }
    }

    if !verdict && target.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "URL not allowed: it contains whitespace; the url parameter must be fully \
             percent-encoded (a bare '+' decodes to a space)"
                .to_string(),
        ));
    }

    if !verdict {
        return Err(AppError::Validation(format!(
            "URL not allowed: only https://{} under {} may be proxied",
            UPSTREAM_HOST,
            ALLOWED_PATH_PREFIXES.join(", ")
        )));
    }

    let mut url = Url::parse(target)
        .map_err(|e| AppError::Validation(format!("Malformed URL: {}", e)))?;
    url.set_fragment(None);
    Ok(url)
}

fn has_allowed_prefix(path: &str) -> bool {
    ALLOWED_PATH_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn has_dot_segment(raw: &str) -> bool {
    let path = raw
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    path.split('/').any(|segment| segment == "." || segment == "..")
}
