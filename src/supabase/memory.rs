//! In-memory stand-in for the hosted backend.
//!
//! Implements both [`DataStore`] and [`IdentityProvider`] with the same
//! observable contract as the HTTP client: catalog ordered by code with all
//! enrollment rows embedded, a unique active enrollment per (student, course),
//! drops as status flips, access tokens that expire and renew through a
//! single-use refresh token. Nothing is durable.
//!
//! This is the test double for the service and HTTP tests; the binary always
//! talks to a real project. The hooks below (`set_read_failure`,
//! `hold_next_write`, `expire_access_tokens` and the counters) exist to drive
//! those tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify, RwLock};
use uuid::Uuid;

use super::{DataStore, IdentityProvider, Session, SignUpOutcome};
use crate::error::AppError;
use crate::models::{
    Course, CourseSchedule, CourseWithSchedules, Enrollment, EnrollmentStatus, NewEnrollment,
    NewStudent, Student,
};

#[derive(Debug)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: Vec<Account>,
    tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    students: Vec<Student>,
    courses: Vec<Course>,
    schedules: Vec<CourseSchedule>,
    enrollments: Vec<Enrollment>,
}

impl MemoryState {
    fn authorize(&self, session: &Session) -> Result<Uuid, AppError> {
        self.tokens
            .get(&session.access_token)
            .copied()
            .filter(|id| *id == session.user_id)
            .ok_or(AppError::SessionExpired)
    }

    fn issue_session(&mut self, user_id: Uuid, email: &str) -> Session {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        self.tokens.insert(access_token.clone(), user_id);
        self.refresh_tokens.insert(refresh_token.clone(), user_id);
        Session {
            user_id,
            email: Some(email.to_string()),
            access_token,
            refresh_token: Some(refresh_token),
        }
    }
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<MemoryState>,
    fail_reads: AtomicBool,
    write_gate: Mutex<Option<Arc<Notify>>>,
    enrollment_inserts: AtomicUsize,
    session_renewals: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_course(&self, course: Course, schedules: Vec<CourseSchedule>) {
        let mut state = self.state.write().await;
        state.courses.push(course);
        state.schedules.extend(schedules);
    }

    /// Inserts an enrollment row directly, bypassing the uniqueness check.
    pub async fn seed_enrollment(
        &self,
        student_id: Uuid,
        course_id: Uuid,
        status: EnrollmentStatus,
    ) -> Enrollment {
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            enrolled_at: Utc::now(),
            status,
        };
        self.state.write().await.enrollments.push(enrollment.clone());
        enrollment
    }

    /// Every enrollment row, dropped ones included.
    pub async fn enrollments(&self) -> Vec<Enrollment> {
        self.state.read().await.enrollments.clone()
    }

    pub fn enrollment_inserts(&self) -> usize {
        self.enrollment_inserts.load(Ordering::SeqCst)
    }

    pub fn session_renewals(&self) -> usize {
        self.session_renewals.load(Ordering::SeqCst)
    }

    /// Invalidates every access token handed out so far. Refresh tokens stay valid.
    pub async fn expire_access_tokens(&self) {
        self.state.write().await.tokens.clear();
    }

    /// While set, every read fails as if the backend were unreachable.
    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Holds the next write until the returned handle is notified.
    pub async fn hold_next_write(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().await = Some(gate.clone());
        gate
    }

    async fn pass_write_gate(&self) {
        let gate = self.write_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn check_reads(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::DataFetch("backend unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for InMemoryBackend {
    async fn fetch_student(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Option<Student>, AppError> {
        self.check_reads()?;
        let state = self.state.read().await;
        state.authorize(session)?;
        Ok(state.students.iter().find(|s| s.id == user_id).cloned())
    }

    async fn insert_student(
        &self,
        _session: Option<&Session>,
        student: &NewStudent,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if state.students.iter().any(|s| s.id == student.id) {
            return Err(AppError::Store(format!(
                "duplicate key value violates unique constraint \"students_pkey\" ({})",
                student.id
            )));
        }
        state.students.push(Student {
            id: student.id,
            email: student.email.clone(),
            full_name: student.full_name.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn fetch_catalog(&self, session: &Session) -> Result<Vec<CourseWithSchedules>, AppError> {
        self.check_reads()?;
        let state = self.state.read().await;
        state.authorize(session)?;

        let mut courses: Vec<CourseWithSchedules> = state
            .courses
            .iter()
            .map(|course| CourseWithSchedules {
                course: course.clone(),
                course_schedules: state
                    .schedules
                    .iter()
                    .filter(|s| s.course_id == course.id)
                    .cloned()
                    .collect(),
                enrollments: Some(
                    state
                        .enrollments
                        .iter()
                        .filter(|e| e.course_id == course.id)
                        .cloned()
                        .collect(),
                ),
            })
            .collect();
        courses.sort_by(|a, b| a.course.code.cmp(&b.course.code));
        Ok(courses)
    }

    async fn fetch_active_enrollments(
        &self,
        session: &Session,
        student_id: Uuid,
    ) -> Result<Vec<Enrollment>, AppError> {
        self.check_reads()?;
        let state = self.state.read().await;
        state.authorize(session)?;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.is_active())
            .cloned()
            .collect())
    }

    async fn insert_enrollment(
        &self,
        session: &Session,
        enrollment: &NewEnrollment,
    ) -> Result<Enrollment, AppError> {
        self.enrollment_inserts.fetch_add(1, Ordering::SeqCst);
        self.pass_write_gate().await;

        let mut state = self.state.write().await;
        state.authorize(session)?;

        let duplicate = enrollment.status == EnrollmentStatus::Enrolled
            && state.enrollments.iter().any(|e| {
                e.student_id == enrollment.student_id
                    && e.course_id == enrollment.course_id
                    && e.is_active()
            });
        if duplicate {
            return Err(AppError::DuplicateEnrollment);
        }

        let row = Enrollment {
            id: Uuid::new_v4(),
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            enrolled_at: Utc::now(),
            status: enrollment.status,
        };
        state.enrollments.push(row.clone());
        Ok(row)
    }

    async fn drop_enrollment(
        &self,
        session: &Session,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<usize, AppError> {
        self.pass_write_gate().await;

        let mut state = self.state.write().await;
        state.authorize(session)?;

        let mut changed = 0;
        for row in state
            .enrollments
            .iter_mut()
            .filter(|e| e.student_id == student_id && e.course_id == course_id && e.is_active())
        {
            row.status = EnrollmentStatus::Dropped;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AppError> {
        let mut state = self.state.write().await;
        if state.accounts.iter().any(|a| a.email == email) {
            return Err(AppError::Auth("User already registered".to_string()));
        }

        let id = Uuid::new_v4();
        state.accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });

        Ok(SignUpOutcome {
            user_id: id,
            email: Some(email.to_string()),
            session: Some(state.issue_session(id, email)),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let mut state = self.state.write().await;
        let id = state
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| a.id)
            .ok_or_else(|| AppError::Auth("Invalid login credentials".to_string()))?;

        Ok(state.issue_session(id, email))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let mut state = self.state.write().await;
        let id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| AppError::Auth("Invalid Refresh Token".to_string()))?;
        let email = state
            .accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.email.clone())
            .unwrap_or_default();

        self.session_renewals.fetch_add(1, Ordering::SeqCst);
        Ok(state.issue_session(id, &email))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.tokens.remove(&session.access_token);
        if let Some(refresh_token) = &session.refresh_token {
            state.refresh_tokens.remove(refresh_token);
        }
        Ok(())
    }
}
