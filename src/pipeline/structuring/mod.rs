pub mod types;
pub mod prompt;
pub mod parser;
pub mod anthropic;
pub mod generator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use anthropic::*;
pub use generator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Anthropic API key is not configured (set ANTHROPIC_API_KEY)")]
    MissingApiKey,

    #[error("Cannot reach the language model API at {0}")]
    ApiConnection(String),

    #[error("Language model API returned error (status {status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model output is not a candidate record: {0}")]
    InvalidCandidateFormat(String),

    #[error("Input text is empty")]
    EmptyInput,
}
