use thiserror::Error;

#[derive(Error, Debug)]
pub enum GazetteerError {
    #[error("Load error: {0}")]
    Load(#[from] toponym_data::LoadError),
    #[error("Build error: {0}")]
    Build(#[from] crate::build::BuildError),
    #[error("Index error: {0}")]
    Index(#[from] crate::index::IndexError),
    #[error("Index refers to a missing record: {0}")]
    NotFound(#[from] toponym_data::NotFound),
    #[error("Gazetteer has no index loaded yet")]
    NotReady,
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GazetteerError {
    /// Whether retrying the same call later can succeed without changing the input.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}

pub type Result<T> = std::result::Result<T, GazetteerError>;
