use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::StudentContext;
use crate::state::AppState;

/// The caller's session, resolved from `Authorization: Bearer <session token>`.
pub struct CurrentStudent(pub Arc<StudentContext>);

impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::NotAuthenticated)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::NotAuthenticated)?;

        let session_id = Uuid::parse_str(token.trim()).map_err(|_| AppError::NotAuthenticated)?;
        let context = state.sessions.context(session_id).await?;
        Ok(CurrentStudent(context))
    }
}
