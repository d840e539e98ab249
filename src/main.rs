use std::sync::Arc;

use course_enrollment::api::router;
use course_enrollment::config::AppConfig;
use course_enrollment::services::{SessionEvent, SessionService};
use course_enrollment::state::AppState;
use course_enrollment::supabase::SupabaseHttpClient;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "course_enrollment=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let backend = Arc::new(SupabaseHttpClient::new(config.supabase.clone())?);
    let sessions = Arc::new(SessionService::new(backend.clone(), backend));

    let mut session_events = sessions.subscribe();
    tokio::spawn(async move {
        loop {
            match session_events.recv().await {
                Ok(SessionEvent::SignedIn { user_id, .. }) => {
                    info!("session started for {}", user_id)
                }
                Ok(SessionEvent::SignedOut { user_id, .. }) => {
                    info!("session ended for {}", user_id)
                }
                Err(RecvError::Lagged(skipped)) => warn!("missed {} session events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let state = AppState {
        sessions,
        calendar: config.calendar,
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
