use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::{IdentityProvider, Session};
use crate::error::AppError;

/// The provider session behind one signed-in student.
///
/// Access tokens are short-lived. Store calls go through [`SessionHandle::call`],
/// which renews the session with its refresh token once when the backend
/// reports the access token as expired, then retries.
pub struct SessionHandle {
    identity: Arc<dyn IdentityProvider>,
    user_id: Uuid,
    email: Option<String>,
    current: RwLock<Session>,
}

impl SessionHandle {
    pub fn new(identity: Arc<dyn IdentityProvider>, session: Session) -> Self {
        Self {
            identity,
            user_id: session.user_id,
            email: session.email.clone(),
            current: RwLock::new(session),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub async fn current(&self) -> Session {
        self.current.read().await.clone()
    }

    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, AppError>
    where
        F: Fn(Session) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let session = self.current().await;
        match op(session.clone()).await {
            Err(AppError::SessionExpired) => {
                let renewed = self.renew(&session).await?;
                op(renewed).await
            }
            other => other,
        }
    }

    async fn renew(&self, stale: &Session) -> Result<Session, AppError> {
        let mut current = self.current.write().await;
        // Another call already renewed it.
        if current.access_token != stale.access_token {
            return Ok(current.clone());
        }

        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            warn!("Session for {} expired with no refresh token", self.user_id);
            AppError::SessionExpired
        })?;

        let renewed = self
            .identity
            .refresh_session(&refresh_token)
            .await
            .map_err(|e| {
                warn!("Session renewal failed for {}: {}", self.user_id, e);
                AppError::SessionExpired
            })?;
        info!("Renewed session for {}", self.user_id);

        *current = renewed.clone();
        Ok(renewed)
    }
}
