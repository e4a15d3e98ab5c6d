use std::sync::Arc;

use bloom_core::ids::OwnerId;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::AuthError;
use crate::provider::{Credentials, IdentityProvider, Session};

/// Holds the current session and broadcasts sign-in/out transitions.
///
/// Anything that depends on who is signed in subscribes here instead of
/// reading global state.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    current: watch::Sender<Option<Session>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (current, _) = watch::channel(None);
        Self { provider, current }
    }

    /// Observe the current session and every later transition.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn current_owner(&self) -> Option<OwnerId> {
        self.current.borrow().as_ref().map(|s| s.owner.clone())
    }

    /// Sign in. On failure the current session is left untouched.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let session = self.provider.sign_in(credentials).await.inspect_err(|e| {
            warn!(error = %e, "sign-in failed");
        })?;
        info!(owner = %session.owner, "signed in");
        self.current.send_replace(Some(session.clone()));
        Ok(session)
    }

    /// Swap in fresh tokens. An expired session is signed out.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let Some(session) = self.current() else {
            return Err(AuthError::SessionExpired);
        };
        match self.provider.refresh(&session).await {
            Ok(fresh) => {
                self.current.send_replace(Some(fresh.clone()));
                Ok(fresh)
            }
            Err(AuthError::SessionExpired) => {
                info!(owner = %session.owner, "session expired");
                self.current.send_replace(None);
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(e),
        }
    }

    /// Sign out. The local session is always cleared; a provider failure is
    /// only logged.
    pub async fn sign_out(&self) {
        let Some(session) = self.current.send_replace(None) else {
            return;
        };
        if let Err(e) = self.provider.sign_out(&session).await {
            warn!(owner = %session.owner, error = %e, "provider sign-out failed");
        }
        info!(owner = %session.owner, "signed out");
    }
}
