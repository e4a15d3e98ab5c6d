use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bloom_core::ids::OwnerId;

use crate::error::AuthError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An authenticated user.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub owner: OwnerId,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("owner", &self.owner)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// How the user proves who they are.
#[derive(Clone)]
pub enum Credentials {
    Password { email: String, password: String },
    /// A token issued by a federated provider (e.g. "google").
    Federated { provider: String, token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Credentials::Federated { provider, .. } => f
                .debug_struct("Federated")
                .field("provider", provider)
                .finish_non_exhaustive(),
        }
    }
}

/// The external service that authenticates users.
///
/// Methods return boxed futures for dyn compatibility.
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, credentials: &Credentials) -> BoxFuture<'_, Result<Session, AuthError>>;

    /// Exchange the session's refresh token for fresh tokens.
    fn refresh(&self, session: &Session) -> BoxFuture<'_, Result<Session, AuthError>>;

    fn sign_out(&self, session: &Session) -> BoxFuture<'_, Result<(), AuthError>>;
}
