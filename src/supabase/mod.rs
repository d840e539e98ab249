pub mod dto;
pub mod memory;
pub mod session;

use std::env;
use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    CourseWithSchedules, Enrollment, EnrollmentStatus, NewEnrollment, NewStudent, Student,
};

pub use memory::InMemoryBackend;
pub use session::SessionHandle;

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| AppError::Config("SUPABASE_URL is not set".to_string()))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| AppError::Config("SUPABASE_ANON_KEY is not set".to_string()))?;

        Ok(Self { url, anon_key })
    }
}

/// An authenticated identity as handed out by the identity provider.
#[derive(Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct SignUpOutcome {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Present when the provider signs the new user straight in.
    pub session: Option<Session>,
}

/// Tables behind the hosted data API. Capacity and the one-active-enrollment
/// rule are enforced on the other side of this trait, not by callers.
///
/// A call made with an expired access token fails with
/// [`AppError::SessionExpired`].
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn fetch_student(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Option<Student>, AppError>;
    async fn insert_student(
        &self,
        session: Option<&Session>,
        student: &NewStudent,
    ) -> Result<(), AppError>;
    /// Every course ordered by code, with schedules and all enrollment rows embedded.
    async fn fetch_catalog(&self, session: &Session) -> Result<Vec<CourseWithSchedules>, AppError>;
    async fn fetch_active_enrollments(
        &self,
        session: &Session,
        student_id: Uuid,
    ) -> Result<Vec<Enrollment>, AppError>;
    async fn insert_enrollment(
        &self,
        session: &Session,
        enrollment: &NewEnrollment,
    ) -> Result<Enrollment, AppError>;
    /// Flips the pair's `enrolled` rows to `dropped`; returns how many changed.
    async fn drop_enrollment(
        &self,
        session: &Session,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<usize, AppError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;
    /// Trades a refresh token for a new session. The old refresh token is spent.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError>;
    async fn sign_out(&self, session: &Session) -> Result<(), AppError>;
}

pub struct SupabaseHttpClient {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseHttpClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let base = format!("{}/{}", self.config.url.trim_end_matches('/'), path);
        let parsed = if params.is_empty() {
            Url::parse(&base)
        } else {
            Url::parse_with_params(&base, params)
        };
        parsed.map_err(|e| AppError::Config(format!("Invalid Supabase URL {}: {}", base, e)))
    }

    fn request(&self, method: Method, url: Url, session: Option<&Session>) -> RequestBuilder {
        let token = session
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.config.anon_key.as_str());

        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    async fn read_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
        session: &Session,
    ) -> Result<Vec<T>, AppError> {
        let url = self.endpoint(&format!("rest/v1/{}", table), params)?;

        let response = self
            .request(Method::GET, url, Some(session))
            .send()
            .await
            .map_err(|e| AppError::DataFetch(format!("{} request failed: {}", table, e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::SessionExpired);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::DataFetch(format!(
                "Supabase API error {} on {}: {}",
                status, table, body
            )));
        }

        response.json::<Vec<T>>().await.map_err(|e| {
            tracing::error!("Failed to parse {} rows: {}", table, e);
            AppError::DataFetch(format!("Failed to parse {} rows: {}", table, e))
        })
    }

    async fn auth_post<B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<Response, AppError> {
        let url = self.endpoint(&format!("auth/v1/{}", path), params)?;

        let response = self
            .request(Method::POST, url, None)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        Ok(response)
    }
}

async fn auth_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<dto::AuthErrorBody>(&body)
        .ok()
        .and_then(dto::AuthErrorBody::into_message)
        .unwrap_or(body);
    AppError::Auth(format!("{} {}", status, message))
}

/// Reads a failed write response; the flag is set for unique-constraint conflicts.
async fn write_failure(response: Response) -> (bool, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: dto::PostgrestErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let conflict = status == StatusCode::CONFLICT || parsed.is_unique_violation();
    let message = match (parsed.message, parsed.details) {
        (Some(message), Some(details)) => format!("{} ({})", message, details),
        (Some(message), None) => message,
        _ => body,
    };
    (conflict, format!("Supabase API error {}: {}", status, message))
}

fn eq(value: impl fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl DataStore for SupabaseHttpClient {
    async fn fetch_student(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Option<Student>, AppError> {
        let rows: Vec<Student> = self
            .read_rows(
                "students",
                &[("select", "*".to_string()), ("id", eq(user_id))],
                session,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_student(
        &self,
        session: Option<&Session>,
        student: &NewStudent,
    ) -> Result<(), AppError> {
        let url = self.endpoint("rest/v1/students", &[])?;

        let response = self
            .request(Method::POST, url, session)
            .header("Prefer", "return=minimal")
            .json(&[student])
            .send()
            .await
            .map_err(|e| AppError::Store(format!("students insert failed: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::SessionExpired);
        }
        if !response.status().is_success() {
            let (_, message) = write_failure(response).await;
            return Err(AppError::Store(message));
        }
        Ok(())
    }

    async fn fetch_catalog(&self, session: &Session) -> Result<Vec<CourseWithSchedules>, AppError> {
        self.read_rows(
            "courses",
            &[
                (
                    "select",
                    "*,course_schedules(*),enrollments(*)".to_string(),
                ),
                ("order", "code.asc".to_string()),
            ],
            session,
        )
        .await
    }

    async fn fetch_active_enrollments(
        &self,
        session: &Session,
        student_id: Uuid,
    ) -> Result<Vec<Enrollment>, AppError> {
        self.read_rows(
            "enrollments",
            &[
                ("select", "*".to_string()),
                ("student_id", eq(student_id)),
                ("status", eq(EnrollmentStatus::Enrolled.as_str())),
            ],
            session,
        )
        .await
    }

    async fn insert_enrollment(
        &self,
        session: &Session,
        enrollment: &NewEnrollment,
    ) -> Result<Enrollment, AppError> {
        let url = self.endpoint("rest/v1/enrollments", &[])?;

        let response = self
            .request(Method::POST, url, Some(session))
            .header("Prefer", "return=representation")
            .json(&[enrollment])
            .send()
            .await
            .map_err(|e| AppError::Store(format!("enrollments insert failed: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::SessionExpired);
        }
        if !response.status().is_success() {
            let (conflict, message) = write_failure(response).await;
            if conflict {
                tracing::warn!("Enrollment rejected as duplicate: {}", message);
                return Err(AppError::DuplicateEnrollment);
            }
            return Err(AppError::Store(message));
        }

        let rows: Vec<Enrollment> = response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("Failed to parse inserted enrollment: {}", e)))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Store("Insert returned no enrollment row".to_string()))
    }

    async fn drop_enrollment(
        &self,
        session: &Session,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<usize, AppError> {
        let url = self.endpoint(
            "rest/v1/enrollments",
            &[
                ("student_id", eq(student_id)),
                ("course_id", eq(course_id)),
                ("status", eq(EnrollmentStatus::Enrolled.as_str())),
            ],
        )?;

        let response = self
            .request(Method::PATCH, url, Some(session))
            .header("Prefer", "return=representation")
            .json(&dto::StatusPatch {
                status: EnrollmentStatus::Dropped,
            })
            .send()
            .await
            .map_err(|e| AppError::Store(format!("enrollments update failed: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::SessionExpired);
        }
        if !response.status().is_success() {
            let (_, message) = write_failure(response).await;
            return Err(AppError::Store(message));
        }

        let rows: Vec<Enrollment> = response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("Failed to parse updated enrollments: {}", e)))?;
        Ok(rows.len())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseHttpClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError> {
        let response = self
            .auth_post("signup", &[], &dto::PasswordCredentials { email, password })
            .await?;

        let parsed: dto::SignUpResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse sign-up response: {}", e)))?;

        Ok(match parsed {
            dto::SignUpResponse::Session(token) => {
                let session = session_from_token(token);
                SignUpOutcome {
                    user_id: session.user_id,
                    email: session.email.clone(),
                    session: Some(session),
                }
            }
            dto::SignUpResponse::User(user) => SignUpOutcome {
                user_id: user.id,
                email: user.email,
                session: None,
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let response = self
            .auth_post(
                "token",
                &[("grant_type", "password".to_string())],
                &dto::PasswordCredentials { email, password },
            )
            .await?;

        let token: dto::TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;

        Ok(session_from_token(token))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let response = self
            .auth_post(
                "token",
                &[("grant_type", "refresh_token".to_string())],
                &dto::RefreshTokenRequest { refresh_token },
            )
            .await?;

        let token: dto::TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse token response: {}", e)))?;

        Ok(session_from_token(token))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AppError> {
        let url = self.endpoint("auth/v1/logout", &[])?;

        let response = self
            .request(Method::POST, url, Some(session))
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("logout request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        Ok(())
    }
}

fn session_from_token(token: dto::TokenResponse) -> Session {
    Session {
        user_id: token.user.id,
        email: token.user.email,
        access_token: token.access_token,
        refresh_token: token.refresh_token,
    }
}
