pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod publish;

pub use error::{DatasetError, Result};

/// Install the global tracing subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kasnova=info".into()),
        )
        .init();
}
