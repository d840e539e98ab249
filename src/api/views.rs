use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::{CatalogSnapshot, ViewStatus};
use crate::models::{CourseWithSchedules, Student};
use crate::schedule::{DaySchedule, group_by_day, schedule_summary};
use crate::services::StudentContext;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub signed_in: bool,
    /// Bearer token for later requests; absent until the account is confirmed.
    pub session_token: Option<Uuid>,
    pub student: Option<Student>,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub student: Option<Student>,
    pub email: Option<String>,
    pub status: ViewStatus,
    pub enrolled_courses: usize,
    pub total_credits: i32,
    pub available_courses: usize,
    pub action_in_flight: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    pub async fn build(context: &StudentContext) -> Self {
        let snapshot = context.catalog.snapshot().await;
        Self {
            student: context.student.clone(),
            email: context.session.email().map(str::to_string),
            status: context.catalog.status().await,
            enrolled_courses: snapshot.enrollments.len(),
            total_credits: snapshot.total_credits(),
            available_courses: snapshot.courses.len(),
            action_in_flight: context.enrollment.action_in_flight(),
            refreshed_at: snapshot.refreshed_at,
        }
    }
}

/// Catalog list entry.
#[derive(Debug, Serialize)]
pub struct CourseCard {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub credits: i32,
    pub spots_left: i32,
    pub is_enrolled: bool,
    pub schedule: String,
    pub location: Option<String>,
}

impl CourseCard {
    pub fn new(course: &CourseWithSchedules, snapshot: &CatalogSnapshot) -> Self {
        Self {
            id: course.id(),
            code: course.course.code.clone(),
            title: course.course.title.clone(),
            description: course.course.description.clone(),
            instructor: course.course.instructor.clone(),
            credits: course.course.credits,
            spots_left: course.spots_left(),
            is_enrolled: snapshot.is_enrolled(course.id()),
            schedule: schedule_summary(&course.course_schedules),
            location: course.course_schedules.first().map(|s| s.location.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub credits: i32,
    pub max_capacity: i32,
    pub enrollment_count: i32,
    pub spots_left: i32,
    pub is_enrolled: bool,
    /// Whether the enroll control should be active right now.
    pub can_enroll: bool,
    pub schedule_by_day: Vec<DaySchedule>,
}

impl CourseDetail {
    pub fn new(course: &CourseWithSchedules, snapshot: &CatalogSnapshot, action_in_flight: bool) -> Self {
        let is_enrolled = snapshot.is_enrolled(course.id());
        let spots_left = course.spots_left();
        Self {
            id: course.id(),
            code: course.course.code.clone(),
            title: course.course.title.clone(),
            description: course.course.description.clone(),
            instructor: course.course.instructor.clone(),
            credits: course.course.credits,
            max_capacity: course.course.max_capacity,
            enrollment_count: course.enrollment_count(),
            spots_left,
            is_enrolled,
            can_enroll: !is_enrolled && !course.is_full() && !action_in_flight,
            schedule_by_day: group_by_day(&course.course_schedules)
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}
