use crate::error::Result;
use std::path::{Path, PathBuf};

/// Anything the join can caption: it needs a file name and the raw bytes.
pub trait ImageEntry {
    /// The bare file name the caption table is keyed on.
    fn file_name(&self) -> Option<&str>;
    fn bytes(&self) -> &[u8];
}

/// An image known by where it is stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl ImageEntry for StoredImage {
    fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An image that was decoded on load and carries its own filename.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl ImageEntry for DecodedImage {
    fn file_name(&self) -> Option<&str> {
        // filename may still be a full path
        Path::new(&self.filename).file_name().and_then(|n| n.to_str())
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One item of a loaded image folder, in whichever shape the loader produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FolderImage {
    Stored(StoredImage),
    Decoded(DecodedImage),
}

impl ImageEntry for FolderImage {
    fn file_name(&self) -> Option<&str> {
        match self {
            FolderImage::Stored(img) => img.file_name(),
            FolderImage::Decoded(img) => img.file_name(),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            FolderImage::Stored(img) => img.bytes(),
            FolderImage::Decoded(img) => img.bytes(),
        }
    }
}

/// Load every image file directly under `dir`, ordered by file name.
///
/// With `decode` set each file is fully decoded and ones that fail are
/// dropped with a warning; otherwise files are taken as-is.
pub fn load_image_folder(dir: &Path, decode: bool) -> Result<Vec<FolderImage>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && image::ImageFormat::from_path(&path).is_ok() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(&path)?;
        if !decode {
            images.push(FolderImage::Stored(StoredImage { path, bytes }));
            continue;
        }

        match image::load_from_memory(&bytes) {
            Ok(decoded) => images.push(FolderImage::Decoded(DecodedImage {
                filename: path.to_string_lossy().into_owned(),
                width: decoded.width(),
                height: decoded.height(),
                bytes,
            })),
            Err(e) => tracing::warn!("Skipping undecodable image {}: {}", path.display(), e),
        }
    }

    tracing::info!("Loaded {} images from {}", images.len(), dir.display());
    Ok(images)
}
