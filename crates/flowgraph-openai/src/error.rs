use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenAiError>;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("OpenAI request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OpenAI API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected OpenAI response shape: {0}")]
    Shape(String),
}
