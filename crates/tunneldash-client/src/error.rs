use thiserror::Error;

/// Errors from the control-plane client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, TLS, decode)
    #[error("control plane request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with its error envelope
    #[error("{0}")]
    Api(String),
}

impl ClientError {
    /// Build an API error from an optional provider message
    pub(crate) fn api(message: Option<&str>) -> Self {
        Self::Api(
            message
                .unwrap_or("control plane request failed")
                .to_string(),
        )
    }
}
