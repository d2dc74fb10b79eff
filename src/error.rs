use thiserror::Error;

/// Failures surfaced by calls to the assistant backend.
///
/// `Application` is the backend answering `success: false`; everything else
/// means no usable body came back.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Application(String),
}

impl ApiError {
    /// True when the failure happened below the application protocol
    /// (network, HTTP status, unparseable body).
    pub fn is_transport(&self) -> bool {
        !matches!(self, ApiError::Application(_))
    }
}
