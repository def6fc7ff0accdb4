//! HTTP handlers. Thin JSON wrappers over breezi-core services; every
//! `CoreError` maps to a status here and nowhere else.

use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use breezi_core::{
    local_day_floor, CoreError, ModerationAction, ReportPeriod, TargetType,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

/// Gateway-level error that knows its HTTP status.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "forbidden",
            message: message.to_string(),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let (status, code) = match &err {
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            CoreError::NotYetEligible => (StatusCode::CONFLICT, "not_yet_eligible"),
            CoreError::AlreadyOpen => (StatusCode::CONFLICT, "already_open"),
            // Provider errors are absorbed inside core; one escaping here is a
            // wiring bug surfaced as a bad gateway.
            CoreError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider"),
            CoreError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(target: "breezi::gateway", code = self.code, message = %self.message, "request failed");
        }
        (
            self.status,
            Json(json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": breezi_core::version(),
        "llm_configured": state.llm.is_some(),
    }))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct SendMessageBody {
    pub user_id: String,
    pub message: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state.chat.send(&body.user_id, &room_id, &body.message).await?;
    Ok(Json(json!({
        "reply": outcome.reply,
        "persona_id": outcome.decision.persona_id,
        "routing_reason": outcome.decision.reason,
        "crisis": outcome.crisis,
    })))
}

pub async fn chat_history(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let messages = state.chat.history(&q.user_id, &room_id)?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rooms = state.chat.rooms(&q.user_id)?;
    Ok(Json(json!({ "rooms": rooms })))
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SubmitReportBody {
    pub target_user_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub reason: String,
    pub reporter_id: String,
    #[serde(default)]
    pub reporter_email: Option<String>,
    #[serde(default)]
    pub reporter_ip: Option<String>,
}

pub async fn submit_report(
    State(state): State<AppState>,
    Json(body): Json<SubmitReportBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.moderation.submit_report(
        &body.target_user_id,
        body.target_type,
        &body.target_id,
        &body.reason,
        &body.reporter_id,
        body.reporter_email.as_deref(),
        body.reporter_ip.as_deref(),
    )?;
    Ok(Json(json!({ "report": report })))
}

#[derive(Deserialize)]
pub struct AdminQuery {
    pub admin_id: String,
}

pub async fn list_reports(
    State(state): State<AppState>,
    Query(q): Query<AdminQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &q.admin_id)?;
    let reports = state.moderation.list_reports()?;
    Ok(Json(json!({ "reports": reports })))
}

#[derive(Deserialize)]
pub struct ProcessReportBody {
    pub admin_id: String,
    pub action: String,
}

pub async fn process_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Json(body): Json<ProcessReportBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &body.admin_id)?;
    let action = ModerationAction::parse(&body.action)?;
    let outcome = state
        .moderation
        .process_report(&report_id, action, &body.admin_id)?;
    Ok(Json(json!({
        "report": outcome.report,
        "record": outcome.record,
    })))
}

fn require_admin(state: &AppState, admin_id: &str) -> Result<(), ApiError> {
    if admin_id != state.admin_id {
        return Err(ApiError::forbidden("admin access required"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Diary & emotion reports
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SaveDiaryBody {
    pub user_id: String,
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    pub emotion: String,
    #[serde(default)]
    pub compliment: Option<String>,
    #[serde(default)]
    pub regrets: Option<String>,
    #[serde(default)]
    pub capsule_open_date: Option<NaiveDate>,
}

pub async fn save_diary(
    State(state): State<AppState>,
    Json(body): Json<SaveDiaryBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (entry, capsule) = state.diary.save_entry(
        &body.user_id,
        body.date,
        &body.title,
        &body.content,
        &body.emotion,
        body.compliment.as_deref(),
        body.regrets.as_deref(),
        body.capsule_open_date,
    )?;
    Ok(Json(json!({ "entry": entry, "capsule": capsule })))
}

pub async fn list_diary(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state.diary.list_entries(&q.user_id)?;
    Ok(Json(json!({ "entries": entries })))
}

#[derive(Deserialize)]
pub struct EmotionReportQuery {
    pub user_id: String,
    #[serde(default)]
    pub period: Option<String>,
}

pub async fn emotion_report(
    State(state): State<AppState>,
    Query(q): Query<EmotionReportQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (period, days) = match q.period.as_deref() {
        None | Some("week") => (ReportPeriod::Week, 7),
        Some("month") => (ReportPeriod::Month, 30),
        Some(other) => {
            return Err(ApiError::bad_request(&format!("unknown period '{}'", other)));
        }
    };
    let today = local_day_floor(Utc::now());
    let start = today - Duration::days(days);
    let report = state
        .emotion
        .report_with_llm(&q.user_id, start, today, period, state.llm.as_deref())
        .await?;
    Ok(Json(json!({
        "counts": report.counts,
        "total": report.total,
        "dominant": report.dominant,
        "positive_ratio": report.positive_ratio,
        "insight": report.insight,
    })))
}

// ---------------------------------------------------------------------------
// Time capsules
// ---------------------------------------------------------------------------

pub async fn list_capsules(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let today = local_day_floor(Utc::now());
    let capsules: Vec<serde_json::Value> = state
        .capsules
        .list(&q.user_id)?
        .into_iter()
        .map(|c| {
            let days = breezi_core::days_until_open(&c, today);
            json!({
                "capsule": c,
                "days_until_open": days,
                "can_open": days <= 0,
            })
        })
        .collect();
    Ok(Json(json!({ "capsules": capsules })))
}

#[derive(Deserialize)]
pub struct UserBody {
    pub user_id: String,
}

pub async fn open_capsule(
    State(state): State<AppState>,
    Path(capsule_id): Path<String>,
    Json(body): Json<UserBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let today = local_day_floor(Utc::now());
    let (capsule, entry) = state.capsules.open(&body.user_id, &capsule_id, today)?;
    Ok(Json(json!({ "capsule": capsule, "entry": entry })))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notifications = state.notifications.list(&q.user_id)?;
    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    Json(body): Json<UserBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.notifications.mark_read(&body.user_id, &notification_id)?;
    Ok(Json(json!({ "success": true })))
}
