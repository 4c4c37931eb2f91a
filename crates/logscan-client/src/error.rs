//! Errors surfaced by [`LogService`](crate::LogService) implementations.

/// Anything that can go wrong talking to the processing service.
///
/// `Http` and `Rejected` carry a message fit for showing to the user: the
/// service's own wording when it sent one, a generic fallback otherwise.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid service url: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("invalid request uri: {0}")]
    Uri(#[from] hyper::http::uri::InvalidUri),

    #[error("could not build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("service unreachable: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response: {0}")]
    Body(#[from] hyper::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Well-formed response with `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("could not encode upload: {0}")]
    Multipart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True for failures where the service never produced a usable answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Body(_) | ClientError::Decode(_)
        )
    }
}
