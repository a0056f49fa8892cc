use thiserror::Error;

pub type Result<T> = std::result::Result<T, TypesenseError>;

#[derive(Debug, Error)]
pub enum TypesenseError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TypesenseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TypesenseError::NotFound(_))
    }
}

impl From<reqwest::Error> for TypesenseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TypesenseError::Parse(err.to_string())
        } else {
            TypesenseError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TypesenseError {
    fn from(err: serde_json::Error) -> Self {
        TypesenseError::Parse(err.to_string())
    }
}
