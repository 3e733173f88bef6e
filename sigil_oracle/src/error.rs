use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    /// No API key was configured; every request fails immediately.
    #[error("oracle is offline (no API key configured)")]
    Offline,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("service answered HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The response carried no candidate text.
    #[error("service returned no text")]
    EmptyResponse,

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("chat history is empty")]
    EmptyHistory,
}
