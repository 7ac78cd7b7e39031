use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnthropicError>;

#[derive(Debug, Error)]
pub enum AnthropicError {
    #[error("ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Anthropic request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Anthropic API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected Anthropic response shape: {0}")]
    Shape(String),
}
