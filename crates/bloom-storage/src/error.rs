use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("document not found: {key}")]
    NotFound { key: String },

    #[error("precondition failed for key: {key}")]
    PreconditionFailed { key: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document {id} could not be read: {reason}")]
    Decode { id: String, reason: String },

    #[error("document is not a JSON object: {0}")]
    NotAnObject(String),

    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("change stream disrupted: {0}")]
    StreamDisrupted(String),

    #[error("S3 GetObject error: {0}")]
    GetObject(String),

    #[error("S3 PutObject error: {0}")]
    PutObject(String),

    #[error("S3 ListObjects error: {0}")]
    ListObjects(String),
}
