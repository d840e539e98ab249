use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EnrollmentStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

/// `/auth/v1/signup` answers with a full session when email confirmation is
/// off, and with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

#[derive(Debug, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthErrorBody {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PostgrestErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";

impl PostgrestErrorBody {
    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION)
    }
}

#[derive(Debug, Serialize)]
pub struct StatusPatch {
    pub status: EnrollmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_with_session_parses_as_session() {
        let body = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {"id": "6f1c1a52-3d0b-4d43-9f5e-2f4b7c1e9a10", "email": "a@b.test"}
        }"#;
        match serde_json::from_str::<SignUpResponse>(body).unwrap() {
            SignUpResponse::Session(token) => {
                assert_eq!(token.access_token, "jwt");
                assert_eq!(token.user.email.as_deref(), Some("a@b.test"));
            }
            SignUpResponse::User(_) => panic!("expected a session"),
        }
    }

    #[test]
    fn signup_pending_confirmation_parses_as_user() {
        let body = r#"{"id": "6f1c1a52-3d0b-4d43-9f5e-2f4b7c1e9a10", "email": "a@b.test", "confirmation_sent_at": "2024-01-01T00:00:00Z"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(body).unwrap(),
            SignUpResponse::User(_)
        ));
    }

    #[test]
    fn auth_error_prefers_description() {
        let body: AuthErrorBody = serde_json::from_str(
            r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));

        let body: AuthErrorBody =
            serde_json::from_str(r#"{"code": 422, "msg": "User already registered"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("User already registered"));
    }

    #[test]
    fn detects_unique_violation() {
        let body: PostgrestErrorBody = serde_json::from_str(
            r#"{"code": "23505", "message": "duplicate key value violates unique constraint", "details": null, "hint": null}"#,
        )
        .unwrap();
        assert!(body.is_unique_violation());
        assert!(!PostgrestErrorBody::default().is_unique_violation());
    }

    #[test]
    fn status_patch_uses_lowercase() {
        let json = serde_json::to_string(&StatusPatch {
            status: EnrollmentStatus::Dropped,
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"dropped"}"#);
    }
}
