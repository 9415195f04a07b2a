use thiserror::Error;

/// Reasons an extraction strategy declines to produce a record.
///
/// Only [`ExtractionError::NoInput`] is ever observable at the pipeline
/// boundary, and even then as an absent result rather than an error.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("email content and subject are both empty")]
    NoInput,

    #[error("completion service credential is not configured")]
    NotConfigured,

    #[error("AI extraction is disabled in config")]
    Disabled,

    #[error("completion service request failed: {0}")]
    Transport(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion response contained no JSON object")]
    NoPayload,

    #[error("failed to decode completion payload: {0}")]
    Decode(String),
}

impl ExtractionError {
    /// True for every failure that maps to "service unavailable, fall back".
    pub fn is_service_unavailable(&self) -> bool {
        !matches!(self, ExtractionError::NoInput)
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        ExtractionError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ExtractionError {
    fn from(e: serde_json::Error) -> Self {
        ExtractionError::Decode(e.to_string())
    }
}
