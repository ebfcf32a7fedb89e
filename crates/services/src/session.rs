//! Explicit credential holder shared by every authenticated request.
//!
//! One `Session` lives for the whole application. It is created signed out,
//! filled by `sign_in`, rotated by `refresh_after` and emptied by `clear`.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ApiError, AuthError};

/// Short-lived bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Long-lived credential used to obtain a new access token.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access: AccessToken,
    pub refresh: RefreshToken,
}

impl Credentials {
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: AccessToken::new(access),
            refresh: RefreshToken::new(refresh),
        }
    }
}

/// Exchanges a refresh token for a new credential pair.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` when the backend rejects the refresh token or is unreachable.
    async fn refresh(&self, refresh: &RefreshToken) -> Result<Credentials, ApiError>;
}

pub struct Session {
    credentials: RwLock<Option<Credentials>>,
    refresh_gate: Mutex<()>,
    refresher: Arc<dyn CredentialRefresher>,
}

impl Session {
    /// Creates a signed-out session.
    #[must_use]
    pub fn new(refresher: Arc<dyn CredentialRefresher>) -> Self {
        Self {
            credentials: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            refresher,
        }
    }

    pub fn sign_in(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        info!("session signed in");
    }

    /// Drops both credentials.
    pub fn clear(&self) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        info!("session cleared");
    }

    #[must_use]
    pub fn current_access(&self) -> Option<AccessToken> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.access.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Refreshes the current access token unconditionally.
    ///
    /// # Errors
    ///
    /// See `refresh_after`.
    pub async fn refresh(&self) -> Result<AccessToken, AuthError> {
        let current = self.current_access().ok_or(AuthError::SignedOut)?;
        self.refresh_after(&current).await
    }

    /// Replaces `stale` with a fresh access token.
    ///
    /// Refreshes are serialized. A caller whose stale token was already
    /// replaced while it waited gets the new token without a second refresh.
    /// A failed refresh clears the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SignedOut` if there is no session, or
    /// `AuthError::RefreshFailed` if the backend refused the refresh.
    pub async fn refresh_after(&self, stale: &AccessToken) -> Result<AccessToken, AuthError> {
        let _gate = self.refresh_gate.lock().await;

        let refresh_token = {
            let guard = self
                .credentials
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                None => return Err(AuthError::SignedOut),
                Some(current) if &current.access != stale => {
                    debug!("access token already refreshed by another request");
                    return Ok(current.access.clone());
                }
                Some(current) => current.refresh.clone(),
            }
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(fresh) => {
                let access = fresh.access.clone();
                *self
                    .credentials
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(fresh);
                debug!("access token refreshed");
                Ok(access)
            }
            Err(err) => {
                warn!(error = %err, "credential refresh failed");
                self.clear();
                Err(AuthError::RefreshFailed(err))
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
