pub mod error;
pub mod provider;

pub use error::AnthropicError;
pub use provider::AnthropicProvider;
