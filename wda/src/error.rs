use thiserror::Error;

pub type Result<T> = std::result::Result<T, WdaError>;

/// Failures surfaced by the protocol client.
#[derive(Debug, Error)]
pub enum WdaError {
    /// Network-layer failure: unreachable endpoint, timeout, broken stream.
    #[error("transport error talking to WebDriverAgent: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("WebDriverAgent returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered 2xx but the payload did not have the
    /// expected shape.
    #[error("unexpected WebDriverAgent response: {0}")]
    Decode(String),
}

impl WdaError {
    /// True for the one protocol status that element lookup treats as a
    /// normal empty result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WdaError::Status { status: 404, .. })
    }
}
