use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::assignment::{Assignment, AssignmentKind, AssignmentStatus};
use crate::attendance::{AttendanceDetail, ManualAdjustment, MarkOutcome};
use crate::chat::{ChatClient, ChatError, ChatMessage};
use crate::config::SharedStore;
use crate::grades::{AssessmentType, CourseGradeSummary, GpaBreakdown, Grade};
use crate::persistence::PersistenceError;
use crate::schedule::{DashboardSnapshot, ScheduleItem};
use crate::state::Dashboard;
use crate::ticker::{StatusTicker, local_now};

pub type SharedDashboard = Arc<RwLock<Dashboard<SharedStore>>>;
type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct AppState<C> {
    dashboard: SharedDashboard,
    client: Arc<C>,
    clock: Clock,
    status: Option<watch::Receiver<DashboardSnapshot>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            dashboard: Arc::clone(&self.dashboard),
            client: Arc::clone(&self.client),
            clock: Arc::clone(&self.clock),
            status: self.status.clone(),
        }
    }
}

impl<C: ChatClient> AppState<C> {
    pub fn new(dashboard: Dashboard<SharedStore>, client: C) -> Self {
        Self::with_shared(Arc::new(RwLock::new(dashboard)), Arc::new(client))
    }

    pub fn with_shared(dashboard: SharedDashboard, client: Arc<C>) -> Self {
        Self {
            dashboard,
            client,
            clock: Arc::new(local_now),
            status: None,
        }
    }

    /// Serve `/status` from the ticker's latest snapshot instead of
    /// recomputing it per request.
    pub fn with_ticker(mut self, ticker: &StatusTicker) -> Self {
        self.status = Some(ticker.subscribe());
        self
    }

    /// Replace the wall clock used for status and default attendance dates.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn dashboard(&self) -> SharedDashboard {
        self.dashboard.clone()
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::InvalidData(_) | PersistenceError::InvalidKey(_) => {
                ApiError::Invalid(value.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(value: ChatError) -> Self {
        match value {
            ChatError::Busy => ApiError::Conflict(value.to_string()),
            err if err.is_rejected_input() => ApiError::Invalid(err.to_string()),
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub fn router<C>(state: AppState<C>) -> Router
where
    C: ChatClient + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status::<C>))
        .route("/schedule", get(schedule::<C>))
        .route("/gpa", get(gpa::<C>))
        .route("/attendance", get(attendance_overview::<C>).post(mark_attendance::<C>))
        .route("/attendance/:code", get(course_attendance::<C>))
        .route("/attendance/:code/manual", post(adjust_attendance::<C>))
        .route("/assignments", get(list_assignments::<C>).post(create_assignment::<C>))
        .route("/assignments/:id", delete(delete_assignment::<C>))
        .route("/assignments/:id/toggle", put(toggle_assignment::<C>))
        .route("/grades", get(list_grades::<C>).post(create_grade::<C>))
        .route("/grades/:id", delete(delete_grade::<C>))
        .route(
            "/chat",
            get(chat_history::<C>).post(send_chat::<C>).delete(clear_chat::<C>),
        )
        .route("/tips/:code", get(study_tips::<C>))
        .route("/preferences", get(get_preferences::<C>).put(update_preferences::<C>))
        .with_state(state)
}

pub async fn serve<C>(addr: SocketAddr, state: AppState<C>) -> std::io::Result<()>
where
    C: ChatClient + Send + Sync + 'static,
{
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn status<C: ChatClient>(State(state): State<AppState<C>>) -> Json<DashboardSnapshot> {
    if let Some(status) = &state.status {
        return Json(status.borrow().clone());
    }
    let now = state.now();
    let dashboard = state.dashboard();
    let snapshot = dashboard.read().snapshot(now);
    Json(snapshot)
}

async fn schedule<C: ChatClient>(State(state): State<AppState<C>>) -> Json<Vec<ScheduleItem>> {
    let dashboard = state.dashboard();
    let items = dashboard.read().timetable().items().cloned().collect();
    Json(items)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GpaReport {
    gpa: String,
    breakdown: GpaBreakdown,
    courses: Vec<CourseGradeSummary>,
}

async fn gpa<C: ChatClient>(State(state): State<AppState<C>>) -> Json<GpaReport> {
    let dashboard = state.dashboard();
    let guard = dashboard.read();
    Json(GpaReport {
        gpa: guard.gpa(),
        breakdown: guard.gpa_breakdown(),
        courses: guard.course_summaries(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseAttendance {
    code: String,
    title: String,
    #[serde(flatten)]
    detail: AttendanceDetail,
    safe_skips: u32,
}

#[derive(Debug, Serialize)]
struct AttendanceOverview {
    totals: AttendanceDetail,
    courses: Vec<CourseAttendance>,
}

fn course_attendance_for(dashboard: &Dashboard<SharedStore>, code: &str) -> CourseAttendance {
    CourseAttendance {
        code: code.to_string(),
        title: dashboard
            .timetable()
            .title_for(code)
            .unwrap_or_default()
            .to_string(),
        detail: dashboard.attendance_detail(code),
        safe_skips: dashboard.skip_margin(code),
    }
}

async fn attendance_overview<C: ChatClient>(
    State(state): State<AppState<C>>,
) -> Json<AttendanceOverview> {
    let dashboard = state.dashboard();
    let guard = dashboard.read();
    let courses = guard
        .timetable()
        .course_codes()
        .into_iter()
        .map(|code| course_attendance_for(&guard, code))
        .collect();
    Json(AttendanceOverview {
        totals: guard.attendance_totals(),
        courses,
    })
}

async fn course_attendance<C: ChatClient>(
    State(state): State<AppState<C>>,
    Path(code): Path<String>,
) -> Result<Json<CourseAttendance>, ApiError> {
    let dashboard = state.dashboard();
    let guard = dashboard.read();
    if !guard.timetable().contains_course(&code) {
        return Err(ApiError::not_found(format!("course {code} not found")));
    }
    Ok(Json(course_attendance_for(&guard, &code)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkPayload {
    course_code: String,
    present: bool,
    date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct MarkResponse {
    #[serde(flatten)]
    outcome: MarkOutcome,
    course: CourseAttendance,
}

async fn mark_attendance<C: ChatClient>(
    State(state): State<AppState<C>>,
    Json(payload): Json<MarkPayload>,
) -> Result<Json<MarkResponse>, ApiError> {
    let date = payload.date.unwrap_or_else(|| state.now().date());
    let dashboard = state.dashboard();
    let mut guard = dashboard.write();
    if !guard.timetable().contains_course(&payload.course_code) {
        return Err(ApiError::not_found(format!(
            "course {} not found",
            payload.course_code
        )));
    }
    let outcome = guard.mark_attendance(&payload.course_code, payload.present, date)?;
    Ok(Json(MarkResponse {
        outcome,
        course: course_attendance_for(&guard, &payload.course_code),
    }))
}

#[derive(Debug, Deserialize)]
struct ManualPayload {
    increment: bool,
    present: bool,
}

#[derive(Debug, Serialize)]
struct ManualResponse {
    #[serde(flatten)]
    adjustment: ManualAdjustment,
    course: CourseAttendance,
}

async fn adjust_attendance<C: ChatClient>(
    State(state): State<AppState<C>>,
    Path(code): Path<String>,
    Json(payload): Json<ManualPayload>,
) -> Result<Json<ManualResponse>, ApiError> {
    let dashboard = state.dashboard();
    let mut guard = dashboard.write();
    if !guard.timetable().contains_course(&code) {
        return Err(ApiError::not_found(format!("course {code} not found")));
    }
    let adjustment =
        guard.adjust_attendance(&code, payload.increment, payload.present, Utc::now())?;
    Ok(Json(ManualResponse {
        adjustment,
        course: course_attendance_for(&guard, &code),
    }))
}

async fn list_assignments<C: ChatClient>(
    State(state): State<AppState<C>>,
) -> Json<Vec<Assignment>> {
    let dashboard = state.dashboard();
    let sorted = dashboard
        .read()
        .assignments_by_due()
        .into_iter()
        .cloned()
        .collect();
    Json(sorted)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewAssignment {
    title: String,
    course_code: String,
    due_date: NaiveDate,
    #[serde(rename = "type", default = "default_assignment_kind")]
    kind: AssignmentKind,
}

fn default_assignment_kind() -> AssignmentKind {
    AssignmentKind::Assignment
}

async fn create_assignment<C: ChatClient>(
    State(state): State<AppState<C>>,
    Json(payload): Json<NewAssignment>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    let dashboard = state.dashboard();
    let created = dashboard.write().add_assignment(
        &payload.title,
        &payload.course_code,
        payload.due_date,
        payload.kind,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn toggle_assignment<C: ChatClient>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dashboard = state.dashboard();
    let status: Option<AssignmentStatus> = dashboard.write().toggle_assignment(&id)?;
    match status {
        Some(status) => Ok(Json(json!({ "id": id, "status": status }))),
        None => Err(ApiError::not_found(format!("assignment {id} not found"))),
    }
}

async fn delete_assignment<C: ChatClient>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let dashboard = state.dashboard();
    let removed = dashboard.write().remove_assignment(&id)?;
    if !removed {
        return Err(ApiError::not_found(format!("assignment {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_grades<C: ChatClient>(State(state): State<AppState<C>>) -> Json<Vec<Grade>> {
    let dashboard = state.dashboard();
    let grades = dashboard.read().grades().to_vec();
    Json(grades)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewGrade {
    course_code: String,
    #[serde(default)]
    title: String,
    score: f64,
    #[serde(rename = "type")]
    kind: String,
}

async fn create_grade<C: ChatClient>(
    State(state): State<AppState<C>>,
    Json(payload): Json<NewGrade>,
) -> Result<(StatusCode, Json<Grade>), ApiError> {
    let kind = AssessmentType::from_str(payload.kind.trim()).ok_or_else(|| {
        ApiError::invalid(format!("unknown assessment type '{}'", payload.kind))
    })?;
    let dashboard = state.dashboard();
    let created = dashboard.write().add_grade(
        &payload.course_code,
        &payload.title,
        payload.score,
        kind,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_grade<C: ChatClient>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let dashboard = state.dashboard();
    let removed = dashboard.write().remove_grade(&id)?;
    if !removed {
        return Err(ApiError::not_found(format!("grade {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn chat_history<C: ChatClient>(State(state): State<AppState<C>>) -> Json<Vec<ChatMessage>> {
    let dashboard = state.dashboard();
    let messages = dashboard.read().chat().messages().to_vec();
    Json(messages)
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    message: String,
    image: Option<String>,
}

async fn send_chat<C>(
    State(state): State<AppState<C>>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatMessage>, ApiError>
where
    C: ChatClient + Send + Sync + 'static,
{
    let dashboard = state.dashboard();
    let request = dashboard
        .write()
        .begin_chat(&payload.message, payload.image.as_deref(), Utc::now())?;
    // Finishes even if the caller disconnects. No lock is held while waiting.
    let client = Arc::clone(&state.client);
    let shared = Arc::clone(&dashboard);
    let reply = tokio::spawn(async move {
        let result = client.send(&request).await;
        shared.write().finish_chat(result, Utc::now())
    })
    .await
    .map_err(|err| {
        warn!(error = %err, "chat reply task failed");
        dashboard.write().abandon_chat();
        ApiError::internal("chat reply task failed")
    })??;
    Ok(Json(reply))
}

async fn clear_chat<C: ChatClient>(
    State(state): State<AppState<C>>,
) -> Result<StatusCode, ApiError> {
    let dashboard = state.dashboard();
    dashboard.write().clear_chat()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn study_tips<C: ChatClient>(
    State(state): State<AppState<C>>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let subject = {
        let dashboard = state.dashboard();
        let guard = dashboard.read();
        guard
            .timetable()
            .title_for(&code)
            .map(ToOwned::to_owned)
            .ok_or_else(|| ApiError::not_found(format!("course {code} not found")))?
    };
    let tips = crate::chat::study_tips(state.client.as_ref(), &subject).await;
    Ok(Json(json!({ "code": code, "subject": subject, "tips": tips })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Preferences {
    dark_mode: bool,
    personal_note: String,
    greeting: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesUpdate {
    dark_mode: Option<bool>,
    personal_note: Option<String>,
}

fn preferences_of(dashboard: &Dashboard<SharedStore>, now: NaiveDateTime) -> Preferences {
    Preferences {
        dark_mode: dashboard.dark_mode(),
        personal_note: dashboard.personal_note().to_string(),
        greeting: dashboard.greeting(now),
    }
}

async fn get_preferences<C: ChatClient>(State(state): State<AppState<C>>) -> Json<Preferences> {
    let now = state.now();
    let dashboard = state.dashboard();
    let preferences = preferences_of(&dashboard.read(), now);
    Json(preferences)
}

async fn update_preferences<C: ChatClient>(
    State(state): State<AppState<C>>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>, ApiError> {
    let now = state.now();
    let dashboard = state.dashboard();
    let mut guard = dashboard.write();
    if let Some(enabled) = update.dark_mode {
        guard.set_dark_mode(enabled)?;
    }
    if let Some(note) = update.personal_note {
        guard.set_personal_note(&note)?;
    }
    Ok(Json(preferences_of(&guard, now)))
}
