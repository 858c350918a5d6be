use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connpass_rss::config::Config;
use connpass_rss::connpass::build_http_client;
use connpass_rss::params::{EnvParameterSource, LayeredParameters};
use connpass_rss::pipeline::Pipeline;
use connpass_rss::publish::AnyPublisher;

const DEFAULT_CONFIG_PATH: &str = "connpass-rss.toml";
const ENV_PREFIX: &str = "CONNPASS_RSS_";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connpass_rss=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(format!("{}CONFIG", ENV_PREFIX)).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    info!("Loaded configuration from {}", config_path);

    // Collaborators live for this run only
    let client = build_http_client(&config)?;
    let parameters = LayeredParameters::new()
        .with_layer(EnvParameterSource::new(ENV_PREFIX))
        .with_layer(config.parameters.clone());
    let publisher = AnyPublisher::from_config(&config.publish, client.clone());
    let pipeline = Pipeline::new(&config, client);

    match pipeline.run(&parameters, &publisher).await {
        Ok(report) => {
            info!(
                "Run complete: {} of {} sources ok, {} candidates, {} covers, {} items published",
                report.sources_attempted - report.sources_failed,
                report.sources_attempted,
                report.candidates,
                report.covers_found,
                report.items_published
            );
            Ok(())
        }
        Err(e) => {
            error!("Run failed, previous feed left in place: {}", e);
            Err(e.into())
        }
    }
}
