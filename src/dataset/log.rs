use crate::error::Result;
use crate::models::MetadataRecord;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Newline-delimited JSON log of every image ingested so far.
///
/// The whole log is held in memory; `save` rewrites the file in full.
#[derive(Debug)]
pub struct MetadataLog {
    path: PathBuf,
    records: Vec<MetadataRecord>,
}

impl MetadataLog {
    /// Load the log at `path`. A missing or unreadable file is an empty log,
    /// and lines that aren't JSON objects are dropped with a warning.
    pub fn load(path: &Path) -> Self {
        match Self::open(path) {
            Ok(log) => log,
            Err(e) => {
                tracing::info!(
                    "No existing metadata at {} ({}), starting empty",
                    path.display(),
                    e
                );
                Self {
                    path: path.to_path_buf(),
                    records: Vec::new(),
                }
            }
        }
    }

    /// Like `load`, but a file that can't be read is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)?;
        let records = parse_lines(path, &contents);
        tracing::info!("Loaded {} existing metadata entries", records.len());
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Input file names that already have a record.
    pub fn processed_sources(&self) -> HashSet<&str> {
        self.records
            .iter()
            .filter_map(|r| r.source_file.as_deref())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn next_index(&self) -> Result<u64> {
        super::naming::next_index(&self.records)
    }

    pub fn push(&mut self, record: MetadataRecord) {
        self.records.push(record);
    }

    /// Rewrite the whole file, one compact JSON object per line.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        for record in &self.records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Lines are parsed independently, so one bad line (invalid UTF-8 included)
/// costs only that line.
fn parse_lines(path: &Path, contents: &[u8]) -> Vec<MetadataRecord> {
    contents
        .split(|&b| b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .filter_map(|(i, line)| match serde_json::from_slice::<MetadataRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed line {} of {}: {}", i + 1, path.display(), e);
                None
            }
        })
        .collect()
}
