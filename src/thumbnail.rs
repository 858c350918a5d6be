use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::EnrichError;

/// Meta tags consulted for a cover image, in order of preference.
const COVER_SELECTORS: [&str; 2] = [
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
];

pub struct ThumbnailEnricher {
    client: Client,
}

impl ThumbnailEnricher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Best-effort cover image for an event page. Failures yield `None`.
    pub async fn enrich(&self, detail_url: &str) -> Option<String> {
        match self.fetch_cover(detail_url).await {
            Ok(Some(cover)) => Some(cover),
            Ok(None) => {
                debug!("No cover image on {}", detail_url);
                None
            }
            Err(e) => {
                warn!("Enrichment unavailable for {}: {}", detail_url, e);
                None
            }
        }
    }

    async fn fetch_cover(&self, detail_url: &str) -> Result<Option<String>, EnrichError> {
        let response = self.client.get(detail_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Status(status));
        }
        let html = response.text().await?;
        Self::extract_cover(&html, detail_url)
    }

    /// Pull the cover image URL out of a detail page, resolving relative URLs
    /// against the page address.
    pub fn extract_cover(html: &str, page_url: &str) -> Result<Option<String>, EnrichError> {
        let document = Html::parse_document(html);

        for raw in COVER_SELECTORS {
            let selector = Selector::parse(raw).map_err(|e| EnrichError::Parse(e.to_string()))?;
            let content = document
                .select(&selector)
                .filter_map(|meta| meta.value().attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty());

            if let Some(content) = content {
                return Ok(Some(Self::resolve(content, page_url)));
            }
        }

        Ok(None)
    }

    fn resolve(content: &str, page_url: &str) -> String {
        Url::parse(page_url)
            .and_then(|base| base.join(content))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| content.to_string())
    }
}
