mod common;

use std::sync::Arc;

use course_enrollment::error::AppError;
use course_enrollment::models::SignUpRequest;
use course_enrollment::services::SessionEvent;
use course_enrollment::supabase::InMemoryBackend;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use common::{course, session_service, signed_in_student};

fn registration(email: &str) -> SignUpRequest {
    SignUpRequest {
        email: email.to_string(),
        password: "hunter22".to_string(),
        full_name: "  Ada Lovelace ".to_string(),
    }
}

#[tokio::test]
async fn nothing_is_available_before_sign_in() {
    let backend = Arc::new(InMemoryBackend::new());
    let sessions = session_service(&backend);
    let mut events = sessions.subscribe();

    let unknown = Uuid::new_v4();
    assert!(matches!(sessions.context(unknown).await, Err(AppError::NotAuthenticated)));
    assert!(matches!(sessions.sign_out(unknown).await, Err(AppError::NotAuthenticated)));
    assert_eq!(sessions.active_sessions().await, 0);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn sign_up_creates_profile_and_loads_catalog() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_course(course("ECON101", 3, 100), Vec::new()).await;
    let sessions = session_service(&backend);
    let mut events = sessions.subscribe();

    let (user_id, context) = sessions
        .sign_up(&registration("ada@university.test"))
        .await
        .expect("sign up");
    let context = context.expect("signed in after sign up");

    assert_eq!(context.student_id(), user_id);
    let student = context.student.as_ref().expect("profile row");
    assert_eq!(student.full_name, "Ada Lovelace");
    assert_eq!(student.email, "ada@university.test");
    assert_eq!(context.catalog.snapshot().await.courses.len(), 1);

    let found = sessions.context(context.session_id).await.expect("registered");
    assert!(Arc::ptr_eq(&found, &context));
    assert_eq!(
        events.try_recv().expect("sign-in event"),
        SessionEvent::SignedIn {
            user_id,
            session_id: context.session_id
        }
    );
}

#[tokio::test]
async fn sign_up_validates_input() {
    let backend = Arc::new(InMemoryBackend::new());
    let sessions = session_service(&backend);

    let mut req = registration("ada@university.test");
    req.full_name = "   ".to_string();
    assert!(matches!(sessions.sign_up(&req).await, Err(AppError::BadRequest(_))));

    let mut req = registration("");
    req.password = String::new();
    assert!(matches!(sessions.sign_up(&req).await, Err(AppError::BadRequest(_))));
    assert_eq!(sessions.active_sessions().await, 0);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let backend = Arc::new(InMemoryBackend::new());
    let sessions = session_service(&backend);

    sessions
        .sign_up(&registration("ada@university.test"))
        .await
        .expect("first sign up");
    let second = sessions.sign_up(&registration("ada@university.test")).await;
    assert!(matches!(second, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn sign_out_then_sign_in_again() {
    let backend = Arc::new(InMemoryBackend::new());
    let sessions = session_service(&backend);
    let (user_id, context) = sessions
        .sign_up(&registration("ada@university.test"))
        .await
        .expect("sign up");
    let first_session = context.expect("signed in").session_id;
    let mut events = sessions.subscribe();

    sessions.sign_out(first_session).await.expect("sign out");
    assert!(matches!(
        sessions.context(first_session).await,
        Err(AppError::NotAuthenticated)
    ));
    assert_eq!(
        events.try_recv().expect("sign-out event"),
        SessionEvent::SignedOut {
            user_id,
            session_id: first_session
        }
    );

    let wrong = sessions.sign_in("ada@university.test", "not-the-password").await;
    assert!(matches!(wrong, Err(AppError::Auth(_))));
    assert_eq!(sessions.active_sessions().await, 0);

    let context = sessions
        .sign_in("ada@university.test", "hunter22")
        .await
        .expect("sign in");
    assert_eq!(context.student_id(), user_id);
    assert_ne!(context.session_id, first_session);
    assert!(context.student.is_some());
}

#[tokio::test]
async fn concurrent_students_keep_separate_contexts() {
    let backend = Arc::new(InMemoryBackend::new());
    let genetics = course("BIO330", 4, 30);
    backend.seed_course(genetics.clone(), Vec::new()).await;
    let sessions = session_service(&backend);

    let alice = signed_in_student(&sessions).await;
    let bob = signed_in_student(&sessions).await;
    assert_ne!(alice.student_id(), bob.student_id());
    assert_eq!(sessions.active_sessions().await, 2);

    bob.enrollment.enroll(genetics.id).await.expect("bob enrolls");
    assert!(bob.catalog.enrolled_course_ids().await.contains(&genetics.id));
    alice.catalog.refresh().await.expect("alice refresh");
    assert!(alice.catalog.enrolled_course_ids().await.is_empty());

    let rows = backend.enrollments().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].student_id, bob.student_id());

    sessions.sign_out(bob.session_id).await.expect("bob signs out");
    let still_alice = sessions.context(alice.session_id).await.expect("alice stays");
    assert_eq!(still_alice.student_id(), alice.student_id());
    assert!(sessions.context(bob.session_id).await.is_err());
}

#[tokio::test]
async fn sign_in_survives_unavailable_catalog() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.seed_course(course("GEO150", 3, 40), Vec::new()).await;
    let sessions = session_service(&backend);
    let (_, context) = sessions
        .sign_up(&registration("ada@university.test"))
        .await
        .expect("sign up");
    sessions
        .sign_out(context.expect("signed in").session_id)
        .await
        .expect("sign out");

    backend.set_read_failure(true);
    let context = sessions
        .sign_in("ada@university.test", "hunter22")
        .await
        .expect("sign in");

    assert!(context.student.is_none());
    assert!(context.catalog.snapshot().await.courses.is_empty());
}
