use thiserror::Error;

#[derive(Debug, Error)]
pub enum SraixError {
    #[error("unknown sraix service: {0}")]
    UnknownService(String),
    #[error("sraix request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("sraix response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sraix response JSON had no value at path `{0}`")]
    MissingPath(String),
    #[error("sraix request to `{0}` timed out")]
    Timeout(String),
    #[error("sraix service responded with HTTP {0}")]
    HttpStatus(u16),
}
