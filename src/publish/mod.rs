pub mod hub;
pub mod image_folder;
pub mod join;
pub mod table;

use crate::config::PublishConfig;
use crate::error::Result;
use crate::publish::hub::Publisher;
use crate::publish::image_folder::load_image_folder;
use crate::publish::join::{join_captions, DatasetBundle};
use crate::publish::table::CaptionTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub repo_id: String,
    pub examples: usize,
    pub captioned: usize,
}

/// Load the image folder and caption table, join them, and hand the result
/// to `publisher`. Any publish failure is returned as-is.
pub async fn run_publish<P: Publisher>(
    config: &PublishConfig,
    publisher: &P,
) -> Result<PublishReport> {
    let images = load_image_folder(&config.output_dir, config.decode_images)?;
    let table = CaptionTable::load(&config.metadata_table)?;

    let joined = join_captions(images, &table);
    let captioned = joined.iter().filter(|j| !j.text.is_empty()).count();
    if captioned < joined.len() {
        tracing::warn!("{} of {} images have no caption", joined.len() - captioned, joined.len());
    }

    let bundle = DatasetBundle::from_examples(&joined)?;
    publisher.publish(&config.repo_id, &bundle).await?;

    tracing::info!("Dataset pushed to the hub as {}", config.repo_id);
    Ok(PublishReport {
        repo_id: config.repo_id.clone(),
        examples: bundle.examples,
        captioned,
    })
}
