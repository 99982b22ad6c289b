use crate::models::CaptionRow;
use crate::publish::image_folder::ImageEntry;
use crate::publish::table::CaptionTable;

/// Directory inside the dataset repo that holds images and `metadata.jsonl`.
pub const DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedExample<I> {
    pub image: I,
    pub text: String,
}

/// Attach a caption to every image. Images without a matching row, or whose
/// file name can't be derived, get an empty caption.
pub fn join_captions<I: ImageEntry>(
    images: Vec<I>,
    table: &CaptionTable,
) -> Vec<JoinedExample<I>> {
    images
        .into_iter()
        .map(|image| {
            let text = match image.file_name() {
                Some(name) => table.caption_for(name).unwrap_or_default().to_string(),
                None => {
                    tracing::warn!("Image without a usable file name, leaving caption empty");
                    String::new()
                }
            };
            JoinedExample { image, text }
        })
        .collect()
}

/// A file to place in the dataset repo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    pub path_in_repo: String,
    pub bytes: Vec<u8>,
}

/// Everything one publish uploads: the images plus an ImageFolder
/// `metadata.jsonl` describing them.
#[derive(Debug, Clone, Default)]
pub struct DatasetBundle {
    pub files: Vec<BundleFile>,
    pub examples: usize,
}

impl DatasetBundle {
    pub fn from_examples<I: ImageEntry>(examples: &[JoinedExample<I>]) -> serde_json::Result<Self> {
        let mut files = Vec::with_capacity(examples.len() + 1);
        let mut metadata = Vec::new();

        for example in examples {
            let Some(name) = example.image.file_name() else {
                tracing::warn!("Leaving out an image without a file name");
                continue;
            };
            files.push(BundleFile {
                path_in_repo: format!("{}/{}", DATA_DIR, name),
                bytes: example.image.bytes().to_vec(),
            });
            serde_json::to_writer(
                &mut metadata,
                &CaptionRow {
                    file_name: name.to_string(),
                    text: example.text.clone(),
                },
            )?;
            metadata.push(b'\n');
        }

        let examples = files.len();
        files.push(BundleFile {
            path_in_repo: format!("{}/metadata.jsonl", DATA_DIR),
            bytes: metadata,
        });
        Ok(Self { files, examples })
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::image_folder::StoredImage;
    use std::path::PathBuf;

    fn stored(name: &str) -> StoredImage {
        StoredImage {
            path: PathBuf::from("data_back").join(name),
            bytes: name.as_bytes().to_vec(),
        }
    }

    fn table(rows: &[(&str, &str)]) -> CaptionTable {
        CaptionTable::from_rows(
            rows.iter()
                .map(|(f, t)| CaptionRow {
                    file_name: f.to_string(),
                    text: t.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn single_match_yields_its_caption() {
        let joined = join_captions(
            vec![stored("design_1.jpeg")],
            &table(&[("design_1.jpeg", "X")]),
        );
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].text, "X");
    }

    #[test]
    fn misses_get_empty_captions_and_cardinality_is_kept() {
        let images = vec![
            stored("design_1.jpeg"),
            stored("design_9.jpeg"),
            stored("design_1.jpeg"),
        ];
        let joined = join_captions(
            images,
            &table(&[("design_1.jpeg", "X"), ("design_1.jpeg", "Y")]),
        );
        let texts: Vec<_> = joined.iter().map(|j| j.text.as_str()).collect();
        assert_eq!(texts, vec!["X", "", "X"]);
    }

    #[test]
    fn match_is_exact() {
        let joined = join_captions(
            vec![stored("Design_1.jpeg")],
            &table(&[("design_1.jpeg", "X")]),
        );
        assert_eq!(joined[0].text, "");
    }

    #[test]
    fn bundle_lays_out_an_image_folder() {
        let joined = join_captions(
            vec![stored("design_1.jpeg"), stored("design_2.jpeg")],
            &table(&[("design_2.jpeg", "two")]),
        );
        let bundle = DatasetBundle::from_examples(&joined).expect("bundle");

        assert_eq!(bundle.examples, 2);
        let paths: Vec<_> = bundle.files.iter().map(|f| f.path_in_repo.as_str()).collect();
        assert_eq!(paths, vec!["data/design_1.jpeg", "data/design_2.jpeg", "data/metadata.jsonl"]);
        assert_eq!(
            String::from_utf8(bundle.files[2].bytes.clone()).unwrap(),
            concat!(
                "{\"file_name\":\"design_1.jpeg\",\"text\":\"\"}\n",
                "{\"file_name\":\"design_2.jpeg\",\"text\":\"two\"}\n",
            )
        );
        assert_eq!(bundle.files[0].bytes, b"design_1.jpeg");
    }
}
