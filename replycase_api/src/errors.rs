//! Error types for the reply-case client.

/// Errors that can occur when talking to the reply-case endpoints.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be sent or the body could not be read.
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// The request did not complete within the client timeout.
    #[error("Request timed out")]
    Timeout,
    /// The server returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// A listing response did not match the expected JSON shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
    /// The base URL and path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl Error {
    /// Whether a later attempt at the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RequestFailed(_) | Error::Timeout => true,
            Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Error::Decode(_) | Error::InvalidUrl(_) | Error::Build(_) => false,
        }
    }
}
