use anyhow::Context;
use kasnova::config::IngestConfig;

fn main() -> anyhow::Result<()> {
    kasnova::init_tracing();

    let config = IngestConfig::from_env()?;
    tracing::info!(
        "Ingesting {} into {}",
        config.input_dir.display(),
        config.output_dir.display()
    );

    let report = kasnova::dataset::run_ingest(&config)
        .with_context(|| format!("ingest from {} failed", config.input_dir.display()))?;

    if !report.failed.is_empty() {
        tracing::warn!("{} images will be retried on the next run", report.failed.len());
    }
    Ok(())
}
