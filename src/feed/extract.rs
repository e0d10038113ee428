//! Feed extraction
//!
//! Streams the RSS document and keeps the `<item>` elements carrying the
//! exact category "Presidential Actions", in document order.

use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;

use super::item::ActionItem;
use super::FeedError;

// == Public Constants ==
/// Category an item must carry to be kept. Compared exactly.
pub const PRESIDENTIAL_ACTIONS_CATEGORY: &str = "Presidential Actions";

// == Item Fields ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    PubDate,
    Description,
    Category,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            b"description" => Some(Field::Description),
            b"category" => Some(Field::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PendingItem {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    description: Option<String>,
    categories: Vec<String>,
}

impl PendingItem {
    fn set(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::Description => &mut self.description,
            Field::Category => {
                self.categories.push(text.to_string());
                return;
            }
        };
        // First occurrence wins
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }

    fn into_action(self) -> Option<ActionItem> {
        if !self
            .categories
            .iter()
            .any(|c| c == PRESIDENTIAL_ACTIONS_CATEGORY)
        {
            return None;
        }

        Some(ActionItem::from_raw(
            self.title.as_deref().unwrap_or_default(),
            self.link.as_deref().unwrap_or_default(),
            self.pub_date.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
        ))
    }
}

// == Extract ==
/// Extracts presidential actions from an RSS document.
///
/// An empty result is not an error.
pub fn extract(xml: &str) -> Result<Vec<ActionItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut pending: Option<PendingItem> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if name.as_ref() == b"item" {
                    pending = Some(PendingItem::default());
                    field = None;
                } else if pending.is_some() && field.is_none() {
                    field = Field::from_tag(name.as_ref());
                    text.clear();
                }
            }
            Ok(Event::Text(t)) if field.is_some() => text.push_str(&unescape_text(&t)),
            Ok(Event::CData(c)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()))
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == b"item" {
                    if let Some(item) = pending.take().and_then(PendingItem::into_action) {
                        items.push(item);
                    }
                    field = None;
                } else if let (Some(item), Some(current)) = (pending.as_mut(), field) {
                    if Field::from_tag(name.as_ref()) == Some(current) {
                        item.set(current, text.trim());
                        field = None;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(items)
}

/// Resolves XML entities, keeping the raw text when an entity is unknown.
fn unescape_text(t: &BytesText<'_>) -> String {
    match t.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(t).into_owned(),
    }
}
