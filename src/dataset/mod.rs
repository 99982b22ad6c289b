pub mod ingest;
pub mod log;
pub mod naming;

pub use ingest::{run_ingest, IngestReport};
pub use log::MetadataLog;
