use crate::config::IngestConfig;
use crate::dataset::log::MetadataLog;
use crate::dataset::naming;
use crate::error::{DatasetError, Result};
use crate::models::MetadataRecord;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Image files found in the input directory.
    pub discovered: usize,
    /// Inputs skipped because the log already names them as a source.
    pub already_processed: usize,
    /// `(source, canonical)` pairs copied this run.
    pub copied: Vec<(String, String)>,
    /// `(source, error)` pairs left for the next run.
    pub failed: Vec<(String, String)>,
    /// Whether the metadata log was rewritten.
    pub log_written: bool,
}

impl IngestReport {
    pub fn new_images(&self) -> usize {
        self.discovered - self.already_processed
    }
}

/// Copy every not-yet-recorded input image into the output directory under
/// its canonical name and record it in the metadata log.
pub fn run_ingest(config: &IngestConfig) -> Result<IngestReport> {
    std::fs::create_dir_all(&config.output_dir)?;

    let mut log = MetadataLog::load(&config.metadata_log);

    let inputs = list_input_images(&config.input_dir)?;
    let mut report = IngestReport {
        discovered: inputs.len(),
        ..Default::default()
    };

    let fresh: Vec<String> = {
        let seen = log.processed_sources();
        inputs
            .into_iter()
            .filter(|name| !seen.contains(name.as_str()))
            .collect()
    };
    report.already_processed = report.discovered - fresh.len();
    tracing::info!("Found {} new images to process", fresh.len());

    if !fresh.is_empty() {
        let start = log.next_index()?;
        tracing::info!("Last design index found: {}", start - 1);

        // every new file needs a name before anything is copied
        let last_needed = start.checked_add(fresh.len() as u64 - 1);
        if last_needed.is_none() {
            return Err(DatasetError::IndexExhausted {
                file_name: naming::canonical_name(u64::MAX),
            });
        }

        for (source, index) in fresh.into_iter().zip(start..=u64::MAX) {
            let canonical = naming::canonical_name(index);
            let from = config.input_dir.join(&source);
            let to = config.output_dir.join(&canonical);
            match copy_image(&from, &to, config.preserve_mtime) {
                Ok(()) => {
                    tracing::info!("Copied {} as {}", source, canonical);
                    log.push(MetadataRecord::new(
                        &canonical,
                        &config.default_caption,
                        &source,
                    ));
                    report.copied.push((source, canonical));
                }
                Err(e) => {
                    tracing::warn!("Error processing {}: {}", source, e);
                    report.failed.push((source, e.to_string()));
                }
            }
        }
    }

    if !report.copied.is_empty() {
        log.save()?;
        report.log_written = true;
    }

    tracing::info!(
        "Processed {} new images, copied {} to {} (caption {:?})",
        report.new_images(),
        report.copied.len(),
        config.output_dir.display(),
        config.default_caption
    );
    Ok(report)
}

/// Files in `dir` (symlinks followed) with an ingestable extension, sorted by name.
fn list_input_images(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if naming::is_input_image(&name) => names.push(name),
            Ok(_) => {}
            Err(raw) => tracing::warn!("Skipping non UTF-8 file name {:?}", raw),
        }
    }
    names.sort();
    Ok(names)
}

/// Byte-for-byte copy; the canonical `.jpeg` name does not re-encode anything.
fn copy_image(from: &Path, to: &Path, preserve_mtime: bool) -> std::io::Result<()> {
    std::fs::copy(from, to)?;
    if preserve_mtime {
        let meta = std::fs::metadata(from)?;
        let mtime = filetime::FileTime::from_last_modification_time(&meta);
        filetime::set_file_mtime(to, mtime)?;
    }
    Ok(())
}
