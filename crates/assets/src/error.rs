use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("image exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("asset io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failure: {0}")]
    Encode(String),
}

impl AssetError {
    /// True when the failure was caused by the submitted payload rather than
    /// by the storage backend. Callers map these to 422 and the rest to 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AssetError::InvalidPayload(_)
                | AssetError::UnsupportedMedia(_)
                | AssetError::TooLarge { .. }
        )
    }
}
