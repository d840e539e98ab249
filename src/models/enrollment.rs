use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Enrolled,
    Dropped,
    Waitlist,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Dropped => "dropped",
            EnrollmentStatus::Waitlist => "waitlist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Enrolled
    }
}

/// Row sent to the store when a student enrolls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
}

impl NewEnrollment {
    pub fn enrolled(student_id: Uuid, course_id: Uuid) -> Self {
        Self {
            student_id,
            course_id,
            status: EnrollmentStatus::Enrolled,
        }
    }
}
