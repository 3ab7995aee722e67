//! Error taxonomy for catalog synchronization.

use oasync_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A required scope parameter is missing; nothing was sent.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The remote resource already exists.
    #[error("{resource} already exists")]
    Conflict { resource: String },

    #[error("{resource} rejected with {status} {reason}: {body}")]
    RemoteRejection {
        resource: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("local catalog error: {0}")]
    LocalIo(#[from] StoreError),

    /// A success response whose body is not the expected JSON.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl SyncError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, SyncError::Precondition(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
