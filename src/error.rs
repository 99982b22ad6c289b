use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata table {} has no {column:?} column", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("Hub request {action} failed {status}: {body}")]
    Hub {
        action: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("No canonical index left after {file_name}")]
    IndexExhausted { file_name: String },

    #[error("{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
