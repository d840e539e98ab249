//! What the signed-in student currently sees: the last catalog snapshot, the
//! student's active enrollments and the detail-panel selection.
//!
//! A snapshot is immutable once built. `refresh` replaces it wholesale after
//! both reads succeed, so readers never observe half of an update. On failure
//! the previous snapshot stays in place.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CourseWithSchedules, Enrollment};
use crate::supabase::{DataStore, SessionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Loading,
    Ready,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub courses: Vec<CourseWithSchedules>,
    pub enrollments: Vec<Enrollment>,
    enrolled_course_ids: HashSet<Uuid>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn new(courses: Vec<CourseWithSchedules>, enrollments: Vec<Enrollment>) -> Self {
        let enrolled_course_ids = enrollments
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.course_id)
            .collect();

        Self {
            courses,
            enrollments,
            enrolled_course_ids,
            refreshed_at: Some(Utc::now()),
        }
    }

    pub fn enrolled_course_ids(&self) -> &HashSet<Uuid> {
        &self.enrolled_course_ids
    }

    pub fn is_enrolled(&self, course_id: Uuid) -> bool {
        self.enrolled_course_ids.contains(&course_id)
    }

    pub fn total_credits(&self) -> i32 {
        self.courses
            .iter()
            .filter(|c| self.is_enrolled(c.id()))
            .map(|c| c.course.credits)
            .sum()
    }

    pub fn filtered_courses(&self, show_enrolled_only: bool) -> Vec<&CourseWithSchedules> {
        self.courses
            .iter()
            .filter(|c| !show_enrolled_only || self.is_enrolled(c.id()))
            .collect()
    }

    pub fn course(&self, course_id: Uuid) -> Option<&CourseWithSchedules> {
        self.courses.iter().find(|c| c.id() == course_id)
    }
}

struct ViewInner {
    status: ViewStatus,
    snapshot: Arc<CatalogSnapshot>,
}

pub struct CatalogView {
    store: Arc<dyn DataStore>,
    session: Arc<SessionHandle>,
    inner: RwLock<ViewInner>,
    selected: RwLock<Option<Uuid>>,
}

impl CatalogView {
    pub fn new(store: Arc<dyn DataStore>, session: Arc<SessionHandle>) -> Self {
        Self {
            store,
            session,
            inner: RwLock::new(ViewInner {
                status: ViewStatus::Loading,
                snapshot: Arc::new(CatalogSnapshot::default()),
            }),
            selected: RwLock::new(None),
        }
    }

    /// Fetches the catalog and the student's active enrollments together and
    /// swaps in the combined result.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, AppError> {
        let store = &self.store;
        let student_id = self.session.user_id();
        let fetched = tokio::try_join!(
            self.session.call(|s| async move { store.fetch_catalog(&s).await }),
            self.session.call(|s| async move {
                store.fetch_active_enrollments(&s, student_id).await
            }),
        );

        let (courses, enrollments) = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Refresh failed, keeping previous catalog: {}", e);
                return Err(match e {
                    AppError::DataFetch(_) | AppError::SessionExpired => e,
                    other => AppError::DataFetch(other.to_string()),
                });
            }
        };

        let snapshot = Arc::new(CatalogSnapshot::new(courses, enrollments));
        {
            let mut inner = self.inner.write().await;
            inner.snapshot = snapshot.clone();
            inner.status = ViewStatus::Ready;
        }

        debug!(
            "Catalog refreshed: {} courses, {} active enrollments",
            snapshot.courses.len(),
            snapshot.enrollments.len()
        );
        Ok(snapshot)
    }

    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn status(&self) -> ViewStatus {
        self.inner.read().await.status
    }

    pub async fn enrolled_course_ids(&self) -> HashSet<Uuid> {
        self.snapshot().await.enrolled_course_ids().clone()
    }

    pub async fn total_credits(&self) -> i32 {
        self.snapshot().await.total_credits()
    }

    pub async fn filtered_courses(&self, show_enrolled_only: bool) -> Vec<CourseWithSchedules> {
        self.snapshot()
            .await
            .filtered_courses(show_enrolled_only)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Opens the detail panel on a course from the current snapshot.
    pub async fn select(&self, course_id: Uuid) -> Result<(), AppError> {
        if self.snapshot().await.course(course_id).is_none() {
            return Err(AppError::NotFound);
        }
        *self.selected.write().await = Some(course_id);
        Ok(())
    }

    pub async fn clear_selection(&self) {
        *self.selected.write().await = None;
    }

    pub async fn selected(&self) -> Option<Uuid> {
        *self.selected.read().await
    }
}
