pub mod enrollment_service;
pub mod session_service;

pub use enrollment_service::{EnrollmentAction, EnrollmentOutcome, EnrollmentService};
pub use session_service::{SessionEvent, SessionService, StudentContext};
