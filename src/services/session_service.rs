use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::catalog::CatalogView;
use crate::error::AppError;
use crate::models::{NewStudent, SignUpRequest, Student};
use crate::services::EnrollmentService;
use crate::supabase::{DataStore, IdentityProvider, Session, SessionHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: Uuid, session_id: Uuid },
    SignedOut { user_id: Uuid, session_id: Uuid },
}

/// Everything tied to one signed-in session. Built on sign-in, dropped on sign-out.
pub struct StudentContext {
    /// Opaque key the client presents to reach this context.
    pub session_id: Uuid,
    pub session: Arc<SessionHandle>,
    /// Cached profile row; `None` if it could not be loaded.
    pub student: Option<Student>,
    pub catalog: Arc<CatalogView>,
    pub enrollment: EnrollmentService,
}

impl StudentContext {
    pub fn student_id(&self) -> Uuid {
        self.session.user_id()
    }
}

/// Registry of signed-in sessions, keyed by session id.
pub struct SessionService {
    store: Arc<dyn DataStore>,
    identity: Arc<dyn IdentityProvider>,
    sessions: RwLock<HashMap<Uuid, Arc<StudentContext>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionService {
    pub fn new(store: Arc<dyn DataStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            identity,
            sessions: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn context(&self, session_id: Uuid) -> Result<Arc<StudentContext>, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(AppError::NotAuthenticated)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Creates the identity and its Student profile row. The context is
    /// present when the provider signs the user straight in.
    pub async fn sign_up(
        &self,
        req: &SignUpRequest,
    ) -> Result<(Uuid, Option<Arc<StudentContext>>), AppError> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::BadRequest("email and password are required".to_string()));
        }
        if req.full_name.trim().is_empty() {
            return Err(AppError::BadRequest("full_name is required".to_string()));
        }

        let outcome = self.identity.sign_up(&req.email, &req.password).await?;

        let profile = NewStudent {
            id: outcome.user_id,
            email: outcome.email.clone().unwrap_or_else(|| req.email.clone()),
            full_name: req.full_name.trim().to_string(),
        };
        self.store
            .insert_student(outcome.session.as_ref(), &profile)
            .await?;
        info!("Registered student {}", outcome.user_id);

        let context = match outcome.session {
            Some(session) => Some(self.start(session).await),
            None => None,
        };
        Ok((outcome.user_id, context))
    }

    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Arc<StudentContext>, AppError> {
        let session = self.identity.sign_in(email, password).await?;
        Ok(self.start(session).await)
    }

    /// Drops one session's context. Other sessions, including other sessions
    /// of the same student, are untouched. A failed remote logout is logged,
    /// not returned.
    pub async fn sign_out(&self, session_id: Uuid) -> Result<(), AppError> {
        let context = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(AppError::NotAuthenticated)?;

        let user_id = context.student_id();
        let session = context.session.current().await;
        if let Err(e) = self.identity.sign_out(&session).await {
            warn!("Remote sign-out failed for {}: {}", user_id, e);
        }
        self.publish(SessionEvent::SignedOut {
            user_id,
            session_id,
        });
        Ok(())
    }

    async fn start(&self, session: Session) -> Arc<StudentContext> {
        let handle = Arc::new(SessionHandle::new(self.identity.clone(), session));
        let user_id = handle.user_id();

        let store = &self.store;
        let student = match handle
            .call(|s| async move { store.fetch_student(&s, user_id).await })
            .await
        {
            Ok(student) => student,
            Err(e) => {
                error!("Error loading student {}: {}", user_id, e);
                None
            }
        };

        let catalog = Arc::new(CatalogView::new(self.store.clone(), handle.clone()));
        let enrollment =
            EnrollmentService::new(self.store.clone(), catalog.clone(), handle.clone());

        if let Err(e) = catalog.refresh().await {
            warn!("Initial catalog load failed: {}", e);
        }

        let session_id = Uuid::new_v4();
        let context = Arc::new(StudentContext {
            session_id,
            session: handle,
            student,
            catalog,
            enrollment,
        });

        self.sessions
            .write()
            .await
            .insert(session_id, context.clone());
        self.publish(SessionEvent::SignedIn {
            user_id,
            session_id,
        });
        context
    }

    fn publish(&self, event: SessionEvent) {
        // Err only means nobody is subscribed.
        let _ = self.events.send(event);
    }
}
