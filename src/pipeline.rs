use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::connpass::ConnpassClient;
use crate::error::RunError;
use crate::model::{Channel, EventCandidate, Feed, FeedItem};
use crate::params::{ParameterSource, RunParameters};
use crate::publish::Publisher;
use crate::render::{render, CONTENT_TYPE};
use crate::sources::SourceAdapter;
use crate::thumbnail::ThumbnailEnricher;

/// Counters for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub candidates: usize,
    pub covers_found: usize,
    pub items_published: usize,
    pub bytes_written: usize,
}

/// Feed assembly without the parameter read or the publish step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembled {
    pub feed: Feed,
    pub report: RunReport,
}

/// Collaborators for one run.
pub struct Pipeline {
    connpass: ConnpassClient,
    enricher: ThumbnailEnricher,
    channel: Channel,
    configured_keywords: Vec<String>,
    max_items: usize,
    concurrency: usize,
    object_key: String,
    run_timeout: Duration,
}

impl Pipeline {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            connpass: ConnpassClient::new(client.clone(), config.api.clone()),
            enricher: ThumbnailEnricher::new(client),
            channel: config.channel.clone(),
            configured_keywords: config.sources.keywords.clone(),
            max_items: config.max_items,
            concurrency: config.concurrency.max(1),
            object_key: config.publish.key.clone(),
            run_timeout: config.run_timeout(),
        }
    }

    /// One full run. Everything up to and including rendering runs under the
    /// overall timeout; a run that times out publishes nothing. Publishing
    /// begins inside the deadline and is never cancelled once started.
    pub async fn run<S, P>(&self, params: &S, publisher: &P) -> Result<RunReport, RunError>
    where
        S: ParameterSource,
        P: Publisher,
    {
        let (document, mut report) =
            match tokio::time::timeout(self.run_timeout, self.prepare(params)).await {
                Ok(result) => result?,
                Err(_) => return Err(RunError::Timeout(self.run_timeout)),
            };

        publisher
            .publish(&self.object_key, &document, CONTENT_TYPE)
            .await?;

        report.bytes_written = document.len();
        info!(
            "Published {} items ({} bytes) to {}",
            report.items_published, report.bytes_written, self.object_key
        );
        Ok(report)
    }

    /// Parameter read through rendering.
    async fn prepare<S>(&self, params: &S) -> Result<(String, RunReport), RunError>
    where
        S: ParameterSource,
    {
        let params = RunParameters::read(params)
            .map_err(RunError::Parameters)?
            .with_keywords(&self.configured_keywords);
        info!(
            "Run parameters: {} series, {} pinned events, {} keywords",
            params.group_ids.len(),
            params.event_ids.len(),
            params.keywords.len()
        );

        let sources = SourceAdapter::from_params(&params);
        let Assembled { feed, report } = self.build_feed(&sources).await;

        let document = render(&self.channel, &feed)?;
        Ok((document, report))
    }

    /// Fetch, enrich and aggregate. Source and enrichment failures are
    /// absorbed here.
    pub async fn build_feed(&self, sources: &[SourceAdapter]) -> Assembled {
        let mut report = RunReport {
            sources_attempted: sources.len(),
            ..RunReport::default()
        };

        let results =
            futures::future::join_all(sources.iter().map(|source| source.fetch(&self.connpass)))
                .await;

        let mut candidate_groups = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(candidates) => candidate_groups.push(candidates),
                Err(unavailable) => {
                    warn!("{}", unavailable);
                    report.sources_failed += 1;
                }
            }
        }
        report.candidates = candidate_groups.iter().map(Vec::len).sum();

        // Flattened in adapter order so first-seen dedup still follows it.
        let candidates: Vec<EventCandidate> = candidate_groups.into_iter().flatten().collect();
        let items = self.enrich_all(candidates).await;
        report.covers_found = items.iter().filter(|item| item.cover_url.is_some()).count();

        let feed = aggregate([items], self.max_items);
        report.items_published = feed.len();
        info!(
            "Aggregated {} candidates into {} items",
            report.candidates, report.items_published
        );

        Assembled { feed, report }
    }

    /// Enrich with bounded concurrency, keeping input order.
    async fn enrich_all(&self, candidates: Vec<EventCandidate>) -> Vec<FeedItem> {
        stream::iter(candidates)
            .map(|candidate| async move {
                let cover = self.enricher.enrich(&candidate.detail_url).await;
                candidate.with_cover(cover)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
