use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::{PublishConfig, PublishKind};
use crate::error::PublishError;

/// Durable storage for the rendered document. Each call fully replaces the
/// object under `key`.
pub trait Publisher {
    fn publish(
        &self,
        key: &str,
        body: &str,
        content_type: &str,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Publisher selected by configuration.
pub enum AnyPublisher {
    File(FilePublisher),
    Http(HttpPublisher),
}

impl AnyPublisher {
    pub fn from_config(config: &PublishConfig, client: Client) -> Self {
        match (config.kind, &config.url) {
            (PublishKind::Http, Some(url)) => {
                AnyPublisher::Http(HttpPublisher::new(client, url.clone()))
            }
            _ => AnyPublisher::File(FilePublisher::new(config.dir.clone())),
        }
    }
}

impl Publisher for AnyPublisher {
    async fn publish(&self, key: &str, body: &str, content_type: &str) -> Result<(), PublishError> {
        match self {
            AnyPublisher::File(publisher) => publisher.publish(key, body, content_type).await,
            AnyPublisher::Http(publisher) => publisher.publish(key, body, content_type).await,
        }
    }
}

/// Writes `<dir>/<key>` through a temp file and an atomic rename, so readers
/// never see a partial document.
pub struct FilePublisher {
    dir: PathBuf,
}

impl FilePublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<(), PublishError> {
    let io_err = |source: std::io::Error| PublishError::Io {
        path: path.display().to_string(),
        source,
    };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(body).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

impl Publisher for FilePublisher {
    async fn publish(&self, key: &str, body: &str, _content_type: &str) -> Result<(), PublishError> {
        let path = self.path_for(key);
        let bytes = body.as_bytes().to_vec();
        let target = path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|e| PublishError::Io {
                path: path.display().to_string(),
                source: std::io::Error::other(e),
            })??;

        info!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }
}

/// Uploads with `PUT <base_url>/<key>`.
pub struct HttpPublisher {
    client: Client,
    base_url: String,
}

impl HttpPublisher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

impl Publisher for HttpPublisher {
    async fn publish(&self, key: &str, body: &str, content_type: &str) -> Result<(), PublishError> {
        let url = self.url_for(key);
        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status));
        }

        info!("Uploaded {} bytes to {}", body.len(), url);
        Ok(())
    }
}
