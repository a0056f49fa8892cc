use thiserror::Error;

pub type Result<T> = std::result::Result<T, CarSearchError>;

#[derive(Error, Debug)]
pub enum CarSearchError {
    /// The completion service returned nothing, or output that failed validation.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The search index could not be reached or rejected the query.
    #[error("Search error: {0}")]
    Search(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CarSearchError {
    /// Whether the user can usefully re-submit the same query.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CarSearchError::Generation(_) | CarSearchError::Search(_))
    }

    /// Short machine-readable kind for API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CarSearchError::Generation(_) => "generation",
            CarSearchError::Search(_) => "search",
            CarSearchError::Config(_) => "config",
            CarSearchError::Validation(_) => "validation",
            CarSearchError::Anyhow(_) => "internal",
        }
    }
}
