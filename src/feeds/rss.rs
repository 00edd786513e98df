//! Minimal RSS 2.0 / Atom reader.
//!
//! Only the fields the pipeline needs are kept: the channel title and, per
//! entry, title, link, publication date and summary. Entry order follows the
//! document. HTML inside summaries is reduced to plain text.

use crate::error::FeedError;
use crate::utils::{collapse_whitespace, html_to_text};
use quick_xml::Reader;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity};
use quick_xml::events::{BytesRef, BytesStart, Event};

/// One `<item>` (RSS) or `<entry>` (Atom).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FeedTitle,
    Title,
    Link,
    Published,
    Summary,
}

impl Field {
    fn for_entry_element(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "link" => Some(Self::Link),
            "pubDate" | "published" | "updated" | "date" => Some(Self::Published),
            "description" | "summary" | "content" | "encoded" => Some(Self::Summary),
            _ => None,
        }
    }
}

/// Parse an RSS or Atom document.
///
/// # Errors
///
/// [`FeedError::Parse`] when the XML is malformed or the document is neither
/// RSS nor Atom.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, FeedError> {
    let mut reader = Reader::from_str(xml);

    let mut feed = ParsedFeed::default();
    let mut saw_root = false;
    let mut entry: Option<FeedEntry> = None;
    let mut field: Option<(Field, String)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "rss" | "feed" | "RDF" => saw_root = true,
                    "item" | "entry" => {
                        entry = Some(FeedEntry::default());
                        field = None;
                    }
                    _ => {}
                }

                if field.is_none() {
                    let wanted = if entry.is_some() {
                        Field::for_entry_element(&name)
                    } else if name == "title" && saw_root && feed.title.is_none() {
                        Some(Field::FeedTitle)
                    } else {
                        None
                    };
                    if let Some(wanted) = wanted {
                        if wanted == Field::Link
                            && let Some(entry) = entry.as_mut()
                        {
                            set_atom_link(entry, &e);
                        }
                        text.clear();
                        field = Some((wanted, name));
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = entry.as_mut()
                    && local_name(&e) == "link"
                {
                    set_atom_link(entry, &e);
                }
            }
            Event::Text(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(r) => {
                if field.is_some() {
                    push_reference(&mut text, &r)?;
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if let Some((current, open)) = &field
                    && *open == name
                {
                    let value = collapse_whitespace(&text);
                    match current {
                        Field::FeedTitle if !value.is_empty() => feed.title = Some(value),
                        Field::FeedTitle => {}
                        _ => {
                            if let Some(entry) = entry.as_mut() {
                                assign(entry, *current, value);
                            }
                        }
                    }
                    field = None;
                }

                if (name == "item" || name == "entry")
                    && let Some(done) = entry.take()
                    && !done.link.is_empty()
                {
                    feed.entries.push(done);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedError::Parse("document is not an RSS or Atom feed".into()));
    }
    Ok(feed)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn assign(entry: &mut FeedEntry, field: Field, value: String) {
    if value.is_empty() {
        return;
    }
    match field {
        Field::Title if entry.title.is_empty() => entry.title = value,
        Field::Link if entry.link.is_empty() => entry.link = value,
        Field::Published if entry.published.is_none() => entry.published = Some(value),
        Field::Summary if entry.summary.is_none() => {
            let plain = html_to_text(&value);
            if !plain.is_empty() {
                entry.summary = Some(plain);
            }
        }
        _ => {}
    }
}

/// Atom links carry the target in `href`; only `rel="alternate"` (or no rel) counts.
fn set_atom_link(entry: &mut FeedEntry, e: &BytesStart<'_>) {
    if !entry.link.is_empty() {
        return;
    }
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    if let Some(href) = href
        && rel.as_deref().is_none_or(|r| r == "alternate")
    {
        entry.link = href.trim().to_string();
    }
}

/// Append the text an `&...;` reference stands for. Unknown names are kept verbatim.
fn push_reference(text: &mut String, r: &BytesRef<'_>) -> Result<(), FeedError> {
    if let Some(ch) = r.resolve_char_ref()? {
        text.push(ch);
        return Ok(());
    }
    let name = String::from_utf8_lossy(r);
    match resolve_predefined_entity(&name).or_else(|| resolve_html5_entity(&name)) {
        Some(value) => text.push_str(value),
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
    Ok(())
}
