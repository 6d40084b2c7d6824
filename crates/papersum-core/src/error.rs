use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaperSumError {
    #[error("Only PDF files are supported: {0}")]
    NotPdf(String),

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

impl PaperSumError {
    /// Server-provided message for API errors, otherwise the display string
    pub fn user_message(&self) -> String {
        match self {
            PaperSumError::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PaperSumError>;
