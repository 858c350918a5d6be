use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::Channel;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Published feed size
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Detail pages fetched at once during enrichment
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Whole-run deadline in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Fallback values for the parameter source
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub publish: PublishConfig,
}

fn default_max_items() -> usize {
    10
}

fn default_concurrency() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_run_timeout() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("connpass-rss/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_event_page_base_url")]
    pub event_page_base_url: String,
    /// Results requested per series/keyword query
    #[serde(default = "default_count")]
    pub count: u32,
    /// Upstream ordering: 1 = updated, 2 = start date, 3 = newest
    #[serde(default = "default_order")]
    pub order: u8,
}

fn default_api_base_url() -> String {
    "https://connpass.com/api/v1/event/".to_string()
}

fn default_event_page_base_url() -> String {
    "https://connpass.com/event/".to_string()
}

fn default_count() -> u32 {
    10
}

fn default_order() -> u8 {
    2
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            event_page_base_url: default_event_page_base_url(),
            count: default_count(),
            order: default_order(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SourcesConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishKind {
    #[default]
    File,
    Http,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    #[serde(default)]
    pub kind: PublishKind,
    /// Target directory for `kind = "file"`
    #[serde(default = "default_publish_dir")]
    pub dir: PathBuf,
    /// Upload endpoint for `kind = "http"`; the key is appended
    pub url: Option<String>,
    #[serde(default = "default_object_key")]
    pub key: String,
}

fn default_publish_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_object_key() -> String {
    "rss.xml".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            kind: PublishKind::default(),
            dir: default_publish_dir(),
            url: None,
            key: default_object_key(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.publish.kind == PublishKind::Http && self.publish.url.is_none() {
            anyhow::bail!("publish.url is required when publish.kind = \"http\"");
        }
        if self.publish.key.trim().is_empty() {
            anyhow::bail!("publish.key must not be empty");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout(),
            run_timeout_secs: default_run_timeout(),
            user_agent: default_user_agent(),
            channel: Channel::default(),
            api: ApiConfig::default(),
            sources: SourcesConfig::default(),
            parameters: HashMap::new(),
            publish: PublishConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.max_items, 10);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.run_timeout(), Duration::from_secs(300));
        assert_eq!(config.api.base_url, "https://connpass.com/api/v1/event/");
        assert_eq!(config.api.count, 10);
        assert_eq!(config.api.order, 2);
        assert_eq!(config.publish.kind, PublishKind::File);
        assert_eq!(config.publish.key, "rss.xml");
        assert!(config.sources.keywords.is_empty());
        assert!(config.parameters.is_empty());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            max_items = 20
            run_timeout_secs = 60

            [channel]
            title = "Events"
            link = "https://feeds.example.com/"
            description = "Upcoming events"

            [api]
            base_url = "http://localhost:9000/api/v1/event/"
            count = 5

            [sources]
            keywords = ["札幌", "Sapporo"]

            [parameters]
            group_ids = "1234,5678"
            event_ids = "42"

            [publish]
            dir = "/srv/www"
            key = "feed.xml"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.max_items, 20);
        assert_eq!(config.run_timeout_secs, 60);
        assert_eq!(config.channel.title, "Events");
        assert_eq!(config.api.base_url, "http://localhost:9000/api/v1/event/");
        assert_eq!(config.api.count, 5);
        assert_eq!(config.api.order, 2);
        assert_eq!(config.sources.keywords, vec!["札幌", "Sapporo"]);
        assert_eq!(config.parameters["group_ids"], "1234,5678");
        assert_eq!(config.publish.dir, PathBuf::from("/srv/www"));
        assert_eq!(config.publish.key, "feed.xml");
    }

    #[test]
    fn test_partial_channel_uses_defaults() {
        let config = Config::from_str("[channel]\ntitle = \"Only a title\"").unwrap();
        assert_eq!(config.channel.title, "Only a title");
        assert_eq!(config.channel.link, Channel::default().link);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/connpass-rss.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let result = Config::from_str("this is not valid toml {{{");
        assert!(result.is_err());
    }

    #[test]
    fn test_http_publish_requires_url() {
        let result = Config::from_str("[publish]\nkind = \"http\"");
        assert!(result.is_err());

        let config =
            Config::from_str("[publish]\nkind = \"http\"\nurl = \"https://storage.example.com/bucket\"")
                .unwrap();
        assert_eq!(config.publish.kind, PublishKind::Http);
    }

    #[test]
    fn test_unknown_publish_kind() {
        assert!(Config::from_str("[publish]\nkind = \"ftp\"").is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Config::from_str("concurrency = 0").is_err());
    }
}
