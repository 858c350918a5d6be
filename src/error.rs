use std::time::Duration;

/// One source adapter's upstream call failed; the adapter contributes nothing.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to events API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("events API returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed events API response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Thumbnail lookup failed. Never surfaced past the enricher.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("detail page request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("detail page returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to parse HTML: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write XML: {0}")]
    Xml(String),

    #[error("{field} of {link} contains a character not allowed in XML: {ch:?}")]
    InvalidCharacter {
        field: &'static str,
        link: String,
        ch: char,
    },

    #[error("rendered document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected with status {0}")]
    Status(reqwest::StatusCode),
}

/// A failure that aborts the whole run. Nothing is published.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to read parameters: {0}")]
    Parameters(#[source] anyhow::Error),

    #[error("failed to render feed: {0}")]
    Render(#[from] RenderError),

    #[error("failed to publish feed: {0}")]
    Publish(#[from] PublishError),

    #[error("run exceeded timeout of {0:?}")]
    Timeout(Duration),
}

/// A source adapter could not contribute; logged and treated as zero candidates.
#[derive(Debug, thiserror::Error)]
#[error("{adapter} unavailable: {error}")]
pub struct SourceUnavailable {
    pub adapter: String,
    #[source]
    pub error: SourceError,
}
