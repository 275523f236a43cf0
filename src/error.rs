use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record has no usable id")]
    MissingIdentifier,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to decode upstream record: {0}")]
    Decode(#[from] DecodeError),

    #[error("material with id {id} not found (examples: {examples:?})")]
    NotFound { id: String, examples: Vec<String> },

    #[error("upstream request failed: {0:#}")]
    Upstream(anyhow::Error),

    #[error("upstream request timed out")]
    Timeout,
}

impl CatalogError {
    /// Failures a caller may reasonably retry; the catalog never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Upstream(_) | CatalogError::Timeout)
    }
}
