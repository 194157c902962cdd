use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model service returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("model returned no text (finish reason: {0})")]
    EmptyResponse(String),
}
