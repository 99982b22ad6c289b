use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_CAPTION: &str = "Rajasthani design on male kurta";
pub const DEFAULT_REPO_ID: &str = "yashh123/kasanova";
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub metadata_log: PathBuf,
    pub default_caption: String,
    pub preserve_mtime: bool,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let output_dir = PathBuf::from(env_or("KASNOVA_OUTPUT_DIR", "data_back"));
        Ok(IngestConfig {
            input_dir: PathBuf::from(env_or("KASNOVA_INPUT_DIR", "data")),
            metadata_log: std::env::var("KASNOVA_METADATA_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| output_dir.join("metadata.json")),
            output_dir,
            default_caption: env_or("KASNOVA_DEFAULT_CAPTION", DEFAULT_CAPTION),
            preserve_mtime: env_bool("KASNOVA_PRESERVE_MTIME", true)?,
        })
    }

    /// Config rooted at explicit directories, everything else defaulted.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            input_dir: input_dir.into(),
            metadata_log: output_dir.join("metadata.json"),
            output_dir,
            default_caption: DEFAULT_CAPTION.to_string(),
            preserve_mtime: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub output_dir: PathBuf,
    pub metadata_table: PathBuf,
    pub repo_id: String,
    pub hf_token: String,
    pub hub_endpoint: String,
    pub revision: String,
    pub private: bool,
    pub decode_images: bool,
}

impl PublishConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let output_dir = PathBuf::from(env_or("KASNOVA_OUTPUT_DIR", "data_back"));
        Ok(PublishConfig {
            metadata_table: std::env::var("KASNOVA_METADATA_TABLE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| output_dir.join("metadata.csv")),
            output_dir,
            repo_id: env_or("KASNOVA_REPO_ID", DEFAULT_REPO_ID),
            hf_token: std::env::var("HF_TOKEN").context("HF_TOKEN must be set to publish")?,
            hub_endpoint: env_or("KASNOVA_HUB_ENDPOINT", DEFAULT_HUB_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            revision: env_or("KASNOVA_HUB_REVISION", "main"),
            private: env_bool("KASNOVA_PRIVATE", false)?,
            decode_images: env_bool("KASNOVA_DECODE_IMAGES", false)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw).with_context(|| format!("{} must be true or false", key)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised boolean {:?}", other),
    }
}
