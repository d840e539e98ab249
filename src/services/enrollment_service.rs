use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::CatalogView;
use crate::error::AppError;
use crate::models::NewEnrollment;
use crate::supabase::{DataStore, SessionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentAction {
    Enroll,
    Drop,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentOutcome {
    pub course_id: Uuid,
    pub action: EnrollmentAction,
    pub rows_changed: usize,
    /// False when the write went through but the follow-up refresh failed.
    pub refreshed: bool,
}

/// Enroll/drop workflow for the signed-in student.
///
/// Only one action runs at a time: while one is in flight, further calls
/// fail with [`AppError::ActionInFlight`] without reaching the store.
pub struct EnrollmentService {
    store: Arc<dyn DataStore>,
    catalog: Arc<CatalogView>,
    session: Arc<SessionHandle>,
    in_flight: AtomicBool,
}

/// Holds the in-flight flag for the lifetime of one action.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AppError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::ActionInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl EnrollmentService {
    pub fn new(
        store: Arc<dyn DataStore>,
        catalog: Arc<CatalogView>,
        session: Arc<SessionHandle>,
    ) -> Self {
        Self {
            store,
            catalog,
            session,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn action_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Enrolls the student in `course_id`.
    ///
    /// Capacity is checked against the last refreshed snapshot; a full course
    /// is rejected here without contacting the store. The store stays the
    /// authority on duplicates.
    pub async fn enroll(&self, course_id: Uuid) -> Result<EnrollmentOutcome, AppError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let snapshot = self.catalog.snapshot().await;
        let course = snapshot.course(course_id).ok_or(AppError::NotFound)?;
        if course.is_full() {
            info!(
                "Enrollment in {} rejected locally: {} spots left",
                course.course.code,
                course.spots_left()
            );
            return Err(AppError::CourseFull(course.course.code.clone()));
        }

        let student_id = self.session.user_id();
        let store = &self.store;
        let request = &NewEnrollment::enrolled(student_id, course_id);
        self.session
            .call(|s| async move { store.insert_enrollment(&s, request).await })
            .await
            .map_err(|e| {
                warn!("Error enrolling in {}: {}", course.course.code, e);
                into_write_error(e)
            })?;
        info!("Student {} enrolled in {}", student_id, course.course.code);

        let refreshed = self.resync().await;
        Ok(EnrollmentOutcome {
            course_id,
            action: EnrollmentAction::Enroll,
            rows_changed: 1,
            refreshed,
        })
    }

    /// Marks the student's active enrollment in `course_id` as dropped.
    pub async fn drop_course(&self, course_id: Uuid) -> Result<EnrollmentOutcome, AppError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let student_id = self.session.user_id();
        let store = &self.store;
        let rows_changed = self
            .session
            .call(|s| async move { store.drop_enrollment(&s, student_id, course_id).await })
            .await
            .map_err(|e| {
                warn!("Error dropping course {}: {}", course_id, e);
                into_write_error(e)
            })?;
        info!(
            "Student {} dropped course {} ({} rows)",
            student_id, course_id, rows_changed
        );

        let refreshed = self.resync().await;
        Ok(EnrollmentOutcome {
            course_id,
            action: EnrollmentAction::Drop,
            rows_changed,
            refreshed,
        })
    }

    async fn resync(&self) -> bool {
        let refreshed = match self.catalog.refresh().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Write succeeded but refresh failed: {}", e);
                false
            }
        };
        self.catalog.clear_selection().await;
        refreshed
    }
}

fn into_write_error(e: AppError) -> AppError {
    match e {
        AppError::DuplicateEnrollment | AppError::SessionExpired | AppError::Store(_) => e,
        other => AppError::Store(other.to_string()),
    }
}
