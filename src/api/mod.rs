pub mod auth;
pub mod views;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use uuid::Uuid;

use crate::calendar::WeekGrid;
use crate::error::AppError;
use crate::models::{SignInRequest, SignUpRequest};
use crate::services::EnrollmentOutcome;
use crate::state::AppState;
use auth::CurrentStudent;
use views::{AuthResponse, CourseCard, CourseDetail, DashboardView};

#[derive(Deserialize)]
struct CourseQueryParams {
    #[serde(default)]
    enrolled_only: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/dashboard", get(dashboard))
        .route("/refresh", post(refresh))
        .route("/courses", get(list_courses))
        .route("/courses/{id}", get(course_detail))
        .route("/courses/{id}/enroll", post(enroll))
        .route("/courses/{id}/drop", post(drop_course))
        .route("/calendar", get(calendar))
        .route("/selection", get(selected_course).delete(clear_selection))
        .route("/selection/{id}", put(select_course))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (user_id, context) = state.sessions.sign_up(&req).await?;
    let response = AuthResponse {
        user_id,
        signed_in: context.is_some(),
        session_token: context.as_ref().map(|c| c.session_id),
        student: context.and_then(|c| c.student.clone()),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let context = state.sessions.sign_in(&req.email, &req.password).await?;
    Ok(Json(AuthResponse {
        user_id: context.student_id(),
        signed_in: true,
        session_token: Some(context.session_id),
        student: context.student.clone(),
    }))
}

async fn sign_out(
    State(state): State<AppState>,
    CurrentStudent(context): CurrentStudent,
) -> Result<StatusCode, AppError> {
    state.sessions.sign_out(context.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(CurrentStudent(context): CurrentStudent) -> Result<Json<DashboardView>, AppError> {
    Ok(Json(DashboardView::build(&context).await))
}

async fn refresh(CurrentStudent(context): CurrentStudent) -> Result<Json<DashboardView>, AppError> {
    context.catalog.refresh().await?;
    Ok(Json(DashboardView::build(&context).await))
}

async fn list_courses(
    CurrentStudent(context): CurrentStudent,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<Vec<CourseCard>>, AppError> {
    let snapshot = context.catalog.snapshot().await;
    let cards = snapshot
        .filtered_courses(params.enrolled_only)
        .into_iter()
        .map(|course| CourseCard::new(course, &snapshot))
        .collect();
    Ok(Json(cards))
}

async fn course_detail(
    CurrentStudent(context): CurrentStudent,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseDetail>, AppError> {
    let snapshot = context.catalog.snapshot().await;
    let course = snapshot.course(id).ok_or(AppError::NotFound)?;
    Ok(Json(CourseDetail::new(
        course,
        &snapshot,
        context.enrollment.action_in_flight(),
    )))
}

async fn calendar(
    State(state): State<AppState>,
    CurrentStudent(context): CurrentStudent,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<WeekGrid>, AppError> {
    let courses = context.catalog.filtered_courses(params.enrolled_only).await;
    let enrolled = context.catalog.enrolled_course_ids().await;
    Ok(Json(state.calendar.render(&courses, &enrolled)))
}

async fn select_course(
    CurrentStudent(context): CurrentStudent,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseDetail>, AppError> {
    context.catalog.select(id).await?;
    let snapshot = context.catalog.snapshot().await;
    let course = snapshot.course(id).ok_or(AppError::NotFound)?;
    Ok(Json(CourseDetail::new(
        course,
        &snapshot,
        context.enrollment.action_in_flight(),
    )))
}

async fn selected_course(
    CurrentStudent(context): CurrentStudent,
) -> Result<Json<Option<CourseDetail>>, AppError> {
    let snapshot = context.catalog.snapshot().await;
    let detail = context
        .catalog
        .selected()
        .await
        .and_then(|id| snapshot.course(id))
        .map(|course| CourseDetail::new(course, &snapshot, context.enrollment.action_in_flight()));
    Ok(Json(detail))
}

async fn clear_selection(CurrentStudent(context): CurrentStudent) -> Result<StatusCode, AppError> {
    context.catalog.clear_selection().await;
    Ok(StatusCode::NO_CONTENT)
}

async fn enroll(
    CurrentStudent(context): CurrentStudent,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentOutcome>, AppError> {
    let outcome = context.enrollment.enroll(id).await?;
    Ok(Json(outcome))
}

async fn drop_course(
    CurrentStudent(context): CurrentStudent,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentOutcome>, AppError> {
    let outcome = context.enrollment.drop_course(id).await?;
    Ok(Json(outcome))
}
