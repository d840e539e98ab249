pub mod course;
pub mod enrollment;
pub mod student;

pub use course::{Course, CourseSchedule, CourseWithSchedules};
pub use enrollment::{Enrollment, EnrollmentStatus, NewEnrollment};
pub use student::{NewStudent, SignInRequest, SignUpRequest, Student};
