//! Search over a loaded item list.

use super::item::{escape_html, ActionItem};

/// Items whose title or description contains `query`, ignoring case.
///
/// Titles and descriptions are stored escaped, so the query is escaped the
/// same way before matching. A blank query keeps every item.
pub fn filter<'a>(items: &'a [ActionItem], query: &str) -> Vec<&'a ActionItem> {
    let query = query.trim();
    if query.is_empty() {
        return items.iter().collect();
    }

    let needle = escape_html(query).to_lowercase();
    items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
        })
        .collect()
}
