use std::sync::Arc;

use course_enrollment::services::SessionService;
use course_enrollment::supabase::{SupabaseConfig, SupabaseHttpClient};

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_sign_in_and_load_catalog() {
    // Needs SUPABASE_URL, SUPABASE_ANON_KEY, TEST_STUDENT_EMAIL and TEST_STUDENT_PASSWORD
    dotenvy::dotenv().ok();

    let config = SupabaseConfig::new_from_env().expect("Failed to load Supabase config");
    let backend = Arc::new(SupabaseHttpClient::new(config).expect("Failed to create client"));
    let sessions = SessionService::new(backend.clone(), backend);

    let email = std::env::var("TEST_STUDENT_EMAIL").expect("TEST_STUDENT_EMAIL not set");
    let password = std::env::var("TEST_STUDENT_PASSWORD").expect("TEST_STUDENT_PASSWORD not set");

    let context = sessions
        .sign_in(&email, &password)
        .await
        .expect("Failed to sign in");
    println!("Signed in as {}", context.student_id());

    let snapshot = context
        .catalog
        .refresh()
        .await
        .expect("Failed to load catalog");
    println!(
        "Loaded {} courses, {} active enrollments, {} credits",
        snapshot.courses.len(),
        snapshot.enrollments.len(),
        snapshot.total_credits()
    );

    let codes: Vec<&str> = snapshot
        .courses
        .iter()
        .map(|c| c.course.code.as_str())
        .collect();
    let mut sorted = codes.clone();
    sorted.sort();
    assert_eq!(codes, sorted, "catalog should be ordered by code");

    for course in &snapshot.courses {
        assert!(
            course.enrollments.is_some(),
            "{} is missing embedded enrollments",
            course.course.code
        );
    }

    sessions
        .sign_out(context.session_id)
        .await
        .expect("Failed to sign out");
    assert!(sessions.context(context.session_id).await.is_err());
}
