use tracing::{info, warn};

use crate::connpass::{ConnpassClient, EventQuery};
use crate::error::SourceUnavailable;
use crate::model::EventCandidate;
use crate::params::RunParameters;

/// One upstream query type, normalized into event candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceAdapter {
    /// Most recent events across a set of group series.
    Series(Vec<String>),
    /// Explicitly pinned events, one lookup per identifier.
    Pinned(Vec<String>),
    /// Free-text keyword search, e.g. a city name.
    Keywords(Vec<String>),
}

impl SourceAdapter {
    /// Adapters for a run, in iteration (dedup priority) order. Adapters with
    /// no criteria are left out.
    pub fn from_params(params: &RunParameters) -> Vec<SourceAdapter> {
        [
            SourceAdapter::Series(params.group_ids.clone()),
            SourceAdapter::Pinned(params.event_ids.clone()),
            SourceAdapter::Keywords(params.keywords.clone()),
        ]
        .into_iter()
        .filter(|adapter| !adapter.criteria().is_empty())
        .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceAdapter::Series(_) => "series",
            SourceAdapter::Pinned(_) => "pinned",
            SourceAdapter::Keywords(_) => "keywords",
        }
    }

    pub fn criteria(&self) -> &[String] {
        match self {
            SourceAdapter::Series(ids) => ids,
            SourceAdapter::Pinned(ids) => ids,
            SourceAdapter::Keywords(keywords) => keywords,
        }
    }

    pub async fn fetch(
        &self,
        client: &ConnpassClient,
    ) -> Result<Vec<EventCandidate>, SourceUnavailable> {
        let candidates = match self {
            SourceAdapter::Series(ids) => self.fetch_listing(client, EventQuery::Series(ids)).await?,
            SourceAdapter::Keywords(keywords) => {
                self.fetch_listing(client, EventQuery::Keywords(keywords)).await?
            }
            SourceAdapter::Pinned(ids) => fetch_pinned(client, ids).await,
        };

        info!(
            "Source '{}' returned {} candidates",
            self.name(),
            candidates.len()
        );
        Ok(candidates)
    }

    async fn fetch_listing(
        &self,
        client: &ConnpassClient,
        query: EventQuery<'_>,
    ) -> Result<Vec<EventCandidate>, SourceUnavailable> {
        let response = client
            .search(query)
            .await
            .map_err(|error| SourceUnavailable {
                adapter: self.name().to_string(),
                error,
            })?;

        Ok(response
            .events
            .into_iter()
            .filter_map(|event| event.into_candidate(None))
            .collect())
    }
}

/// Look up each pinned identifier on its own; a failed lookup skips only that
/// identifier.
async fn fetch_pinned(client: &ConnpassClient, ids: &[String]) -> Vec<EventCandidate> {
    let lookups = ids.iter().map(|id| async move {
        match client.search(EventQuery::Event(id)).await {
            Ok(response) => {
                if response.events.len() > 1 {
                    warn!(
                        "Event {} matched {} events, using the first",
                        id,
                        response.events.len()
                    );
                }
                match response.events.into_iter().next() {
                    Some(event) => event.into_candidate(Some(client.event_page_url(id))),
                    None => {
                        warn!("Pinned event {} not found", id);
                        None
                    }
                }
            }
            Err(error) => {
                let unavailable = SourceUnavailable {
                    adapter: format!("pinned event {}", id),
                    error,
                };
                warn!("{}", unavailable);
                None
            }
        }
    });

    futures::future::join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .collect()
}
