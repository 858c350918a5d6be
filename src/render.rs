use chrono::SecondsFormat;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::RenderError;
use crate::model::{Channel, Feed, FeedItem};

pub const CONTENT_TYPE: &str = "application/xml";

/// Serialize a feed as an RSS 2.0 document.
///
/// Items are written in feed order. Output depends only on the arguments, so
/// repeated calls produce identical bytes.
pub fn render(channel: &Channel, feed: &Feed) -> Result<String, RenderError> {
    let mut rss = RssWriter::new();

    rss.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    rss.emit(Event::Start(
        BytesStart::new("rss").with_attributes([("version", "2.0")]),
    ))?;
    rss.emit(Event::Start(BytesStart::new("channel")))?;

    let link = channel.link.as_str();
    rss.text_element("title", &channel.title, link)?;
    rss.text_element("link", &channel.link, link)?;
    rss.text_element("description", &channel.description, link)?;

    for item in feed.items() {
        rss.item(item)?;
    }

    rss.emit(Event::End(BytesEnd::new("channel")))?;
    rss.emit(Event::End(BytesEnd::new("rss")))?;

    rss.finish()
}

struct RssWriter {
    writer: Writer<Vec<u8>>,
}

impl RssWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        self.writer
            .write_event(event)
            .map_err(|e| RenderError::Xml(e.to_string()))
    }

    fn item(&mut self, item: &FeedItem) -> Result<(), RenderError> {
        let event = &item.event;
        let link = event.detail_url.as_str();

        self.emit(Event::Start(BytesStart::new("item")))?;
        self.text_element("title", &event.title, link)?;
        self.text_element("link", link, link)?;
        self.text_element("description", &event.description, link)?;

        check_chars("guid", link, link)?;
        self.emit(Event::Start(
            BytesStart::new("guid").with_attributes([("isPermaLink", "true")]),
        ))?;
        self.emit(Event::Text(BytesText::new(link)))?;
        self.emit(Event::End(BytesEnd::new("guid")))?;

        let started_at = event.starts_at.to_rfc3339_opts(SecondsFormat::AutoSi, false);
        let ended_at = event.ends_at.to_rfc3339_opts(SecondsFormat::AutoSi, false);
        self.text_element("started_at", &started_at, link)?;
        self.text_element("ended_at", &ended_at, link)?;

        if !event.hash_tag.is_empty() {
            self.text_element("category", &event.hash_tag, link)?;
        }

        if let Some(cover) = &item.cover_url {
            self.text_element("cover", cover, link)?;
        }

        self.emit(Event::End(BytesEnd::new("item")))
    }

    fn text_element(
        &mut self,
        name: &'static str,
        text: &str,
        link: &str,
    ) -> Result<(), RenderError> {
        check_chars(name, text, link)?;
        self.emit(Event::Start(BytesStart::new(name)))?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> Result<String, RenderError> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8(bytes)?)
    }
}

/// Escaping cannot represent these; XML 1.0 forbids them outright.
fn is_xml_char(ch: char) -> bool {
    matches!(ch,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_chars(field: &'static str, text: &str, link: &str) -> Result<(), RenderError> {
    match text.chars().find(|ch| !is_xml_char(*ch)) {
        Some(ch) => Err(RenderError::InvalidCharacter {
            field,
            link: link.to_string(),
            ch,
        }),
        None => Ok(()),
    }
}
