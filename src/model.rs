use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;

/// A normalized event from one source, before thumbnail enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCandidate {
    /// Upstream identifier. Not unique across sources.
    pub source_key: String,
    pub title: String,
    /// Canonical public URL; the dedup key.
    pub detail_url: String,
    pub description: String,
    /// Event hashtag without the leading `#`; may be empty.
    pub hash_tag: String,
    pub starts_at: DateTime<FixedOffset>,
    pub ends_at: DateTime<FixedOffset>,
}

impl EventCandidate {
    pub fn with_cover(self, cover_url: Option<String>) -> FeedItem {
        FeedItem {
            event: self,
            cover_url,
        }
    }
}

/// An event candidate plus its optional cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub event: EventCandidate,
    pub cover_url: Option<String>,
}

impl FeedItem {
    pub fn detail_url(&self) -> &str {
        &self.event.detail_url
    }

    pub fn starts_at(&self) -> DateTime<FixedOffset> {
        self.event.starts_at
    }
}

/// The final deduplicated, sorted, capped sequence of items for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    items: Vec<FeedItem>,
}

impl Feed {
    /// Callers are expected to uphold ordering and uniqueness; see `aggregate`.
    pub(crate) fn from_sorted(items: Vec<FeedItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Static channel metadata for the rendered document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Channel {
    #[serde(default = "default_channel_title")]
    pub title: String,
    #[serde(default = "default_channel_link")]
    pub link: String,
    #[serde(default = "default_channel_description")]
    pub description: String,
}

fn default_channel_title() -> String {
    "札幌開催イベント RSS Feed | Sapporo Engineer Base".to_string()
}

fn default_channel_link() -> String {
    "https://rss.sapporo-engineer-base.dev/".to_string()
}

fn default_channel_description() -> String {
    "札幌で開催されるイベントのRSSフィードです。新着10件を表示しています。".to_string()
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            title: default_channel_title(),
            link: default_channel_link(),
            description: default_channel_description(),
        }
    }
}

/// Parse an upstream timestamp.
///
/// RFC 3339 is expected; an offset-less `YYYY-MM-DDTHH:MM:SS` (optionally with
/// fractional seconds) is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}
