use thiserror::Error;

/// Sign-in failures. The message is shown to the user as-is.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("session expired, please sign in again")]
    SessionExpired,

    #[error("{0}")]
    Unsupported(String),

    #[error("identity provider did not return {0}")]
    MissingAttribute(String),

    #[error("Cognito error: {0}")]
    Cognito(String),
}
