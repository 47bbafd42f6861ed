use polars::prelude::PolarsError;
use thiserror::Error;
pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),
    #[cfg(feature = "download_data")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[cfg(feature = "download_data")]
    #[error("Join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("Source contains no valid records ({skipped} malformed rows skipped)")]
    NoValidRecords { skipped: usize },
    #[error("Record snapshot format {found} is not supported (expected {expected})")]
    IncompatibleSnapshot { found: u32, expected: u32 },
    #[error("Record snapshot holds {found} records, manifest expects {expected}")]
    SnapshotMismatch { expected: usize, found: usize },
    #[error("Zip archive contains no data file")]
    EmptyArchive,
}

/// A record id that is not present in the store.
///
/// Ids only ever come from the search index, so hitting this means the index and
/// the store were built from different sources.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Record {id} not found in store")]
pub struct NotFound {
    pub id: u64,
}
