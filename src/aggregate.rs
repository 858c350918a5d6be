use std::collections::HashSet;

use crate::model::{Feed, FeedItem};

/// Merge item groups into the published feed.
///
/// Groups are flattened in order. Items sharing a detail URL are collapsed to
/// the first one seen; the rest are dropped along with their enrichment. The
/// survivors are sorted by start time, most recent first (a stable sort, so
/// equal start times keep their input order), and capped at `max_items`.
pub fn aggregate<I>(groups: I, max_items: usize) -> Feed
where
    I: IntoIterator<Item = Vec<FeedItem>>,
{
    let mut seen = HashSet::new();
    let mut items: Vec<FeedItem> = groups
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.detail_url().to_string()))
        .collect();

    items.sort_by(|a, b| b.starts_at().cmp(&a.starts_at()));
    items.truncate(max_items);

    Feed::from_sorted(items)
}
