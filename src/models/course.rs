use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Enrollment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub credits: i32,
    pub max_capacity: i32,
    pub created_at: DateTime<Utc>,
}

/// One weekly meeting of a course. `day_of_week` is 0 = Sunday .. 6 = Saturday,
/// times are 24-hour `HH:MM` (the store may append `:SS`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSchedule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

/// A course as the catalog query returns it: the course row with its
/// embedded schedules and every enrollment row attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseWithSchedules {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub course_schedules: Vec<CourseSchedule>,
    #[serde(default)]
    pub enrollments: Option<Vec<Enrollment>>,
}

impl CourseWithSchedules {
    pub fn id(&self) -> Uuid {
        self.course.id
    }

    /// Headcount shown to the student. Counts every joined row, whatever its status.
    pub fn enrollment_count(&self) -> i32 {
        self.enrollments
            .as_ref()
            .map(|rows| rows.len() as i32)
            .unwrap_or(0)
    }

    pub fn spots_left(&self) -> i32 {
        self.course.max_capacity - self.enrollment_count()
    }

    pub fn is_full(&self) -> bool {
        self.spots_left() <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnrollmentStatus;

    fn course(max_capacity: i32, statuses: &[EnrollmentStatus]) -> CourseWithSchedules {
        let id = Uuid::new_v4();
        CourseWithSchedules {
            course: Course {
                id,
                code: "CS101".to_string(),
                title: "Intro".to_string(),
                description: String::new(),
                instructor: "Dr. Ada".to_string(),
                credits: 3,
                max_capacity,
                created_at: Utc::now(),
            },
            course_schedules: Vec::new(),
            enrollments: Some(
                statuses
                    .iter()
                    .map(|status| Enrollment {
                        id: Uuid::new_v4(),
                        student_id: Uuid::new_v4(),
                        course_id: id,
                        enrolled_at: Utc::now(),
                        status: *status,
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn spots_left_counts_every_joined_row() {
        let c = course(
            3,
            &[EnrollmentStatus::Enrolled, EnrollmentStatus::Dropped],
        );
        assert_eq!(c.enrollment_count(), 2);
        assert_eq!(c.spots_left(), 1);
        assert!(!c.is_full());
    }

    #[test]
    fn missing_enrollment_join_means_empty_course() {
        let mut c = course(2, &[]);
        c.enrollments = None;
        assert_eq!(c.enrollment_count(), 0);
        assert_eq!(c.spots_left(), 2);
    }

    #[test]
    fn over_capacity_is_full() {
        let c = course(1, &[EnrollmentStatus::Enrolled, EnrollmentStatus::Waitlist]);
        assert_eq!(c.spots_left(), -1);
        assert!(c.is_full());
    }

    #[test]
    fn deserializes_store_row_with_embedded_joins() {
        let json = serde_json::json!({
            "id": "6f1c1c1e-8b0a-4b8e-9a57-0b6d7f1f2a01",
            "code": "MATH201",
            "title": "Linear Algebra",
            "description": "Vectors",
            "instructor": "Prof. Noether",
            "credits": 4,
            "max_capacity": 30,
            "created_at": "2024-08-01T12:00:00+00:00",
            "course_schedules": [{
                "id": "6f1c1c1e-8b0a-4b8e-9a57-0b6d7f1f2a02",
                "course_id": "6f1c1c1e-8b0a-4b8e-9a57-0b6d7f1f2a01",
                "day_of_week": 1,
                "start_time": "09:00:00",
                "end_time": "10:30:00",
                "location": "Hall B",
                "created_at": "2024-08-01T12:00:00+00:00"
            }],
            "enrollments": []
        });

        let parsed: CourseWithSchedules = serde_json::from_value(json).expect("parse");
        assert_eq!(parsed.course.code, "MATH201");
        assert_eq!(parsed.course_schedules.len(), 1);
        assert_eq!(parsed.course_schedules[0].day_of_week, 1);
        assert_eq!(parsed.enrollment_count(), 0);
    }
}
