use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ApiError, SendError};
use crate::session::{AccessToken, Session};

/// Runs authenticated requests with a single refresh-and-retry on auth expiry.
///
/// The policy per call:
/// - no credential: `SendError::Unauthenticated`, nothing is sent;
/// - `ApiError::AuthExpired`: one refresh, then exactly one retry;
/// - refresh failure: the session is cleared and the request is abandoned;
/// - any failure of the retry is returned as is.
#[derive(Clone, Debug)]
pub struct AuthorizedClient {
    session: Arc<Session>,
}

impl AuthorizedClient {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Sends `request` with the current access token.
    ///
    /// # Errors
    ///
    /// Returns `SendError::Unauthenticated` when there is no session or the
    /// refresh failed, and `SendError::Api` for any other request failure.
    pub async fn send<T, F, Fut>(&self, mut request: F) -> Result<T, SendError>
    where
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let Some(token) = self.session.current_access() else {
            return Err(SendError::Unauthenticated);
        };

        match request(token.clone()).await {
            Err(ApiError::AuthExpired) => {}
            other => return other.map_err(SendError::Api),
        }

        debug!("access token rejected, refreshing once");
        let fresh = match self.session.refresh_after(&token).await {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!(error = %err, "abandoning request after failed refresh");
                return Err(SendError::Unauthenticated);
            }
        };

        request(fresh).await.map_err(SendError::Api)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::session::Credentials;
    use crate::session::testing::ScriptedRefresher;

    fn client(refresher: &Arc<ScriptedRefresher>) -> AuthorizedClient {
        let session = Arc::new(Session::new(refresher.clone()));
        session.sign_in(Credentials::new("a1", "r1"));
        AuthorizedClient::new(session)
    }

    #[tokio::test]
    async fn success_needs_no_refresh() {
        let refresher = Arc::new(ScriptedRefresher::default());
        let client = client(&refresher);

        let seen = client
            .send(|token| async move { Ok::<_, ApiError>(token.as_str().to_owned()) })
            .await
            .unwrap();

        assert_eq!(seen, "a1");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn auth_expiry_refreshes_and_retries_once() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(Credentials::new("a2", "r2"))]));
        let client = client(&refresher);
        let attempts = AtomicUsize::new(0);

        let result = client
            .send(|token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if token.as_str() == "a1" {
                        Err(ApiError::AuthExpired)
                    } else {
                        Ok(token.as_str().to_owned())
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "a2");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_clears_session_and_never_retries() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Err(ApiError::HttpStatus(
            reqwest::StatusCode::UNAUTHORIZED,
        ))]));
        let client = client(&refresher);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), SendError> = client
            .send(|_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::AuthExpired) }
            })
            .await;

        assert_eq!(result.unwrap_err(), SendError::Unauthenticated);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn retry_failure_is_terminal() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(Credentials::new("a2", "r2"))]));
        let client = client(&refresher);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), SendError> = client
            .send(|token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if token.as_str() == "a1" {
                        Err(ApiError::AuthExpired)
                    } else {
                        Err(ApiError::Network("connection reset".into()))
                    }
                }
            })
            .await;

        assert_eq!(
            result.unwrap_err(),
            SendError::Api(ApiError::Network("connection reset".into()))
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn non_auth_failure_is_not_retried() {
        let refresher = Arc::new(ScriptedRefresher::default());
        let client = client(&refresher);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), SendError> = client
            .send(|_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY)) }
            })
            .await;

        assert!(matches!(result, Err(SendError::Api(ApiError::HttpStatus(_)))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn signed_out_session_sends_nothing() {
        let refresher = Arc::new(ScriptedRefresher::default());
        let client = AuthorizedClient::new(Arc::new(Session::new(refresher.clone())));
        let attempts = AtomicUsize::new(0);

        let result: Result<(), SendError> = client
            .send(|_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(result.unwrap_err(), SendError::Unauthenticated);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }
}
