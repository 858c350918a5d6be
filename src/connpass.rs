use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{ApiConfig, Config};
use crate::error::SourceError;
use crate::model::{parse_timestamp, EventCandidate};

/// Build the shared HTTP client for one run.
pub fn build_http_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.as_str())
        .build()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub results_returned: u32,
    #[serde(default)]
    pub results_available: u32,
    #[serde(default)]
    pub results_start: u32,
    #[serde(default)]
    pub events: Vec<ApiEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEvent {
    pub event_id: u64,
    pub title: String,
    pub catch: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub event_url: String,
    pub hash_tag: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

impl ApiEvent {
    /// Normalize into a candidate.
    ///
    /// Returns `None` when `started_at` cannot be parsed; an unparseable
    /// `ended_at` falls back to the start. An empty description is replaced by
    /// the catchphrase. `fallback_url` is used only when the upstream
    /// `event_url` is blank; with neither the event is skipped.
    pub fn into_candidate(self, fallback_url: Option<String>) -> Option<EventCandidate> {
        let Some(starts_at) = parse_timestamp(&self.started_at) else {
            warn!(
                "Skipping event {} with unparseable start time {:?}",
                self.event_id, self.started_at
            );
            return None;
        };
        let ends_at = self
            .ended_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(starts_at);

        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .or(self.catch)
            .unwrap_or_default();

        let detail_url = match fallback_url {
            Some(fallback) if self.event_url.trim().is_empty() => fallback,
            _ => self.event_url,
        };
        if detail_url.trim().is_empty() {
            warn!("Skipping event {} without a public URL", self.event_id);
            return None;
        }

        Some(EventCandidate {
            source_key: self.event_id.to_string(),
            title: self.title,
            detail_url,
            description,
            hash_tag: self
                .hash_tag
                .map(|tag| tag.trim_start_matches('#').to_string())
                .unwrap_or_default(),
            starts_at,
            ends_at,
        })
    }
}

/// One lookup against the events API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventQuery<'a> {
    Series(&'a [String]),
    Event(&'a str),
    Keywords(&'a [String]),
}

impl EventQuery<'_> {
    fn params(&self, api: &ApiConfig) -> Vec<(&'static str, String)> {
        match self {
            EventQuery::Series(ids) => vec![
                ("series_id", ids.join(",")),
                ("count", api.count.to_string()),
                ("order", api.order.to_string()),
            ],
            EventQuery::Event(id) => vec![("event_id", id.to_string())],
            EventQuery::Keywords(keywords) => vec![
                ("keyword", keywords.join(",")),
                ("count", api.count.to_string()),
                ("order", api.order.to_string()),
            ],
        }
    }
}

pub struct ConnpassClient {
    client: Client,
    api: ApiConfig,
}

impl ConnpassClient {
    pub fn new(client: Client, api: ApiConfig) -> Self {
        Self { client, api }
    }

    /// Public page URL for an event identifier, for events the API returns
    /// without one.
    pub fn event_page_url(&self, event_id: &str) -> String {
        format!(
            "{}/{}/",
            self.api.event_page_base_url.trim_end_matches('/'),
            event_id
        )
    }

    pub async fn search(&self, query: EventQuery<'_>) -> Result<EventsResponse, SourceError> {
        let params = query.params(&self.api);
        debug!("Events API request: {} {:?}", self.api.base_url, params);

        let response = self
            .client
            .get(&self.api.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let body = response.text().await?;
        let parsed: EventsResponse = serde_json::from_str(&body)?;
        debug!(
            "Events API returned {} of {} results",
            parsed.results_returned, parsed.results_available
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = r#"{
        "results_returned": 1,
        "results_available": 91,
        "results_start": 1,
        "events": [{
            "event_id": 364,
            "title": "BPStudy#56",
            "catch": "株式会社ビープラウドが主催するWeb系技術討論の会",
            "description": "<p>今回は「Python」について</p>",
            "event_url": "https://bpstudy.connpass.com/event/364/",
            "hash_tag": "bpstudy",
            "started_at": "2012-04-17T18:30:00+09:00",
            "ended_at": "2012-04-17T20:30:00+09:00",
            "limit": 80,
            "event_type": "participation",
            "accepted": 80
        }]
    }"#;

    fn api_event(started_at: &str, ended_at: Option<&str>) -> ApiEvent {
        ApiEvent {
            event_id: 1,
            title: "Meetup".to_string(),
            catch: None,
            description: None,
            event_url: "https://x.connpass.com/event/1/".to_string(),
            hash_tag: None,
            started_at: started_at.to_string(),
            ended_at: ended_at.map(str::to_string),
        }
    }

    fn client_for(server: &MockServer) -> ConnpassClient {
        let api = ApiConfig {
            base_url: format!("{}/api/v1/event/", server.uri()),
            event_page_base_url: format!("{}/event", server.uri()),
            ..ApiConfig::default()
        };
        ConnpassClient::new(Client::new(), api)
    }

    mod normalization_tests {
        use super::*;

        #[test]
        fn test_decode_sample_response() {
            let response: EventsResponse = serde_json::from_str(SAMPLE).unwrap();
            assert_eq!(response.results_available, 91);
            assert_eq!(response.events.len(), 1);

            let candidate = response.events[0].clone().into_candidate(None).unwrap();
            assert_eq!(candidate.source_key, "364");
            assert_eq!(candidate.detail_url, "https://bpstudy.connpass.com/event/364/");
            assert_eq!(candidate.hash_tag, "bpstudy");
            assert_eq!(candidate.description, "<p>今回は「Python」について</p>");
            assert_eq!(candidate.starts_at.to_rfc3339(), "2012-04-17T18:30:00+09:00");
        }

        #[test]
        fn test_null_fields_become_empty() {
            let json = r#"{"events": [{
                "event_id": 7, "title": "T", "catch": null, "description": null,
                "event_url": "https://e/7/", "hash_tag": null,
                "started_at": "2024-01-01T10:00:00+09:00", "ended_at": null, "limit": null
            }]}"#;
            let response: EventsResponse = serde_json::from_str(json).unwrap();
            let candidate = response.events[0].clone().into_candidate(None).unwrap();

            assert_eq!(candidate.description, "");
            assert_eq!(candidate.hash_tag, "");
            assert_eq!(candidate.ends_at, candidate.starts_at);
        }

        #[test]
        fn test_catch_fills_empty_description() {
            let mut event = api_event("2024-01-01T10:00:00Z", None);
            event.description = Some("  ".to_string());
            event.catch = Some("Monthly Rust meetup".to_string());
            event.hash_tag = Some("#rust_sapporo".to_string());

            let candidate = event.into_candidate(None).unwrap();
            assert_eq!(candidate.description, "Monthly Rust meetup");
            assert_eq!(candidate.hash_tag, "rust_sapporo");
        }

        #[test]
        fn test_upstream_url_is_kept_over_fallback() {
            let candidate = api_event("2024-01-01T10:00:00Z", None)
                .into_candidate(Some("https://connpass.com/event/1/".to_string()))
                .unwrap();
            assert_eq!(candidate.detail_url, "https://x.connpass.com/event/1/");
        }

        #[test]
        fn test_fallback_url_when_upstream_url_blank() {
            let mut event = api_event("2024-01-01T10:00:00Z", None);
            event.event_url = String::new();

            let candidate = event
                .into_candidate(Some("https://connpass.com/event/1/".to_string()))
                .unwrap();
            assert_eq!(candidate.detail_url, "https://connpass.com/event/1/");
        }

        #[test]
        fn test_missing_url_without_fallback_is_skipped() {
            let mut event = api_event("2024-01-01T10:00:00Z", None);
            event.event_url = " ".to_string();
            assert!(event.into_candidate(None).is_none());
        }

        #[test]
        fn test_unparseable_start_is_skipped() {
            assert!(api_event("soon", None).into_candidate(None).is_none());
        }

        #[test]
        fn test_unparseable_end_falls_back_to_start() {
            let candidate = api_event("2024-01-01T10:00:00Z", Some("later"))
                .into_candidate(None)
                .unwrap();
            assert_eq!(candidate.ends_at, candidate.starts_at);
        }

        #[test]
        fn test_query_params() {
            let api = ApiConfig::default();
            let ids = vec!["1".to_string(), "2".to_string()];

            let params = EventQuery::Series(&ids).params(&api);
            assert!(params.contains(&("series_id", "1,2".to_string())));
            assert!(params.contains(&("count", "10".to_string())));
            assert!(params.contains(&("order", "2".to_string())));

            let params = EventQuery::Event("42").params(&api);
            assert_eq!(params, vec![("event_id", "42".to_string())]);
        }

        #[test]
        fn test_event_page_url() {
            let client = ConnpassClient::new(Client::new(), ApiConfig::default());
            assert_eq!(client.event_page_url("42"), "https://connpass.com/event/42/");
        }
    }

    mod http_tests {
        use super::*;

        #[tokio::test]
        async fn test_search_series() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/v1/event/"))
                .and(query_param("series_id", "10,20"))
                .and(query_param("order", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server);
            let ids = vec!["10".to_string(), "20".to_string()];
            let response = client.search(EventQuery::Series(&ids)).await.unwrap();

            assert_eq!(response.events.len(), 1);
            assert_eq!(response.events[0].title, "BPStudy#56");
        }

        #[tokio::test]
        async fn test_search_status_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let client = client_for(&server);
            let err = client.search(EventQuery::Event("1")).await.unwrap_err();
            assert!(matches!(err, SourceError::Status(s) if s.as_u16() == 503));
        }

        #[tokio::test]
        async fn test_search_malformed_body() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .mount(&server)
                .await;

            let client = client_for(&server);
            let err = client.search(EventQuery::Event("1")).await.unwrap_err();
            assert!(matches!(err, SourceError::Malformed(_)));
        }
    }
}
