use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("data_template must resolve to a JSON object")]
    NotAnObject,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DataError {
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        DataError::InvalidIdentifier(name.into())
    }
}
