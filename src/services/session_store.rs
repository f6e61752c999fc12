//! Single-owner cache of the current session with change subscriptions.

use crate::guard::AuthSessionSource;
use crate::models::Session;
use crate::services::supabase_auth::{AuthError, SupabaseAuth};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Holds the cached session and notifies subscribers on every change
/// (sign-in, sign-out, token renewal).
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the cached session.
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Replace the cached session and notify subscribers.
    pub fn set(&self, session: Option<Session>) {
        match (&session, self.tx.borrow().as_ref()) {
            (Some(s), Some(previous)) if s.is_renewal_of(previous) => {
                tracing::debug!(user_id = %s.user_id, "Session renewed")
            }
            (Some(s), _) => tracing::debug!(user_id = %s.user_id, "Session stored"),
            (None, _) => tracing::debug!("Session cleared"),
        }
        self.tx.send_replace(session);
    }

    /// Subscribe to future changes. The current value counts as seen.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Password sign-in; stores the session on success.
    pub async fn sign_in(
        &self,
        auth: &SupabaseAuth,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = auth.sign_in_with_password(email, password).await?;
        self.set(Some(session.clone()));
        Ok(session)
    }

    /// Sign out on the provider (best effort) and clear the cache.
    pub async fn sign_out(&self, auth: &SupabaseAuth) {
        if let Some(session) = self.current() {
            if let Err(e) = auth.sign_out(&session.access_token).await {
                tracing::warn!(error = %e, "Provider sign-out failed, clearing local session anyway");
            }
        }
        self.set(None);
    }

    /// Renew the cached session with its refresh token.
    ///
    /// A rejected refresh token ends the session; transport failures keep
    /// the stale copy so a later attempt can succeed.
    pub async fn refresh(&self, auth: &SupabaseAuth) -> Result<Option<Session>, AuthError> {
        let Some(refresh_token) = self.current().and_then(|s| s.refresh_token) else {
            return Ok(self.current());
        };

        match auth.refresh_session(&refresh_token).await {
            Ok(renewed) => {
                self.set(Some(renewed.clone()));
                Ok(Some(renewed))
            }
            Err(AuthError::InvalidToken) => {
                tracing::info!("Refresh token rejected, signing out");
                self.set(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthSessionSource for SessionStore {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.current())
    }
}

/// Stream of session changes. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    /// Wait for the next change. Returns false once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Latest session value.
    pub fn latest(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    /// Explicit form of dropping the subscription.
    pub fn unsubscribe(self) {}
}

/// Session already resolved for one request.
#[derive(Debug, Clone, Default)]
pub struct FixedSession(pub Option<Session>);

#[async_trait]
impl AuthSessionSource for FixedSession {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.0.clone())
    }
}
