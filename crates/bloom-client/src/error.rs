use bloom_core::error::ValidationError;
use bloom_storage::error::StorageError;
use thiserror::Error;

/// Why a goal or recipe was not saved. Displayed next to the form.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("You must be logged in to add a {0}.")]
    Unauthenticated(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    RemoteWriteFailed(#[from] StorageError),
}
