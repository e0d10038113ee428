//! Action Item Module
//!
//! A single presidential action extracted from the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Action Item ==
/// A feed item tagged "Presidential Actions".
///
/// `title` and `description` are HTML-escaped at extraction time and are
/// safe to embed in markup as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub title: String,
    pub link: String,
    /// `pubDate` as published
    pub pub_date: String,
    /// Parsed `pubDate`, when it is valid RFC 2822
    pub publication_date: Option<DateTime<Utc>>,
    pub description: String,
}

impl ActionItem {
    /// Builds an item from raw feed text, escaping title and description.
    pub fn from_raw(title: &str, link: &str, pub_date: &str, description: &str) -> Self {
        Self {
            title: escape_html(title),
            link: link.to_string(),
            pub_date: pub_date.to_string(),
            publication_date: parse_pub_date(pub_date),
            description: escape_html(description),
        }
    }
}

// == Field Helpers ==
/// Parses an RSS `pubDate` (RFC 2822).
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Escapes `&`, `<`, `>`, `"` and `'` for safe embedding in HTML.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
