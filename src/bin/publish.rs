use anyhow::Context;
use kasnova::config::PublishConfig;
use kasnova::publish::hub::HubClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kasnova::init_tracing();

    let config = PublishConfig::from_env()?;
    let hub = HubClient::new(&config)?;

    let report = kasnova::publish::run_publish(&config, &hub)
        .await
        .with_context(|| format!("publishing to {} failed", config.repo_id))?;

    tracing::info!(
        "Published {} examples ({} captioned) to {}",
        report.examples,
        report.captioned,
        report.repo_id
    );
    Ok(())
}
