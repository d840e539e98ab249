use std::sync::Arc;

use chrono::Utc;
use course_enrollment::models::{Course, CourseSchedule, SignUpRequest};
use course_enrollment::services::{SessionService, StudentContext};
use course_enrollment::supabase::InMemoryBackend;
use uuid::Uuid;

#[allow(dead_code)]
pub fn course(code: &str, credits: i32, max_capacity: i32) -> Course {
    Course {
        id: Uuid::new_v4(),
        code: code.to_string(),
        title: format!("{} lecture", code),
        description: format!("Catalog entry for {}", code),
        instructor: "Dr. Hopper".to_string(),
        credits,
        max_capacity,
        created_at: Utc::now(),
    }
}

#[allow(dead_code)]
pub fn meeting(course: &Course, day_of_week: u8, start: &str, end: &str) -> CourseSchedule {
    CourseSchedule {
        id: Uuid::new_v4(),
        course_id: course.id,
        day_of_week,
        start_time: start.to_string(),
        end_time: end.to_string(),
        location: "Engineering 101".to_string(),
        created_at: Utc::now(),
    }
}

#[allow(dead_code)]
pub fn session_service(backend: &Arc<InMemoryBackend>) -> SessionService {
    SessionService::new(backend.clone(), backend.clone())
}

/// Registers a fresh student and returns the signed-in context.
#[allow(dead_code)]
pub async fn signed_in_student(sessions: &SessionService) -> Arc<StudentContext> {
    let req = SignUpRequest {
        email: format!("{}@university.test", Uuid::new_v4()),
        password: "correct horse battery staple".to_string(),
        full_name: "Grace Student".to_string(),
    };
    let (_, context) = sessions.sign_up(&req).await.expect("sign up");
    context.expect("sign up should start a session")
}
