use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The live subscription failed; the last good data is still shown.
    #[error("live updates interrupted: {0}")]
    StreamDisrupted(String),
}
