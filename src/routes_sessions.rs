// --------------------------------------------------
// Focus session endpoints.
//
// - GET    /api/sessions                      list (newest first)
// - POST   /api/sessions                      start a timer
// - POST   /api/sessions/:id/interruptions    log an interruption
// - POST   /api/sessions/:id/end              stop; derive duration / flow / score
// - DELETE /api/sessions/:id
// --------------------------------------------------

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    ItemEnvelope, ListEnvelope, Session, SessionCategory, SessionEnd, SuccessEnvelope,
    now_fixed_offset,
};
use crate::routes_tasks::paginate;

#[derive(Debug, Deserialize)]
pub struct SessionListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub from: Option<String>, // RFC3339, inclusive
    pub to: Option<String>,   // RFC3339, exclusive
}

fn parse_instant(raw: &str, field: &str) -> Result<DateTime<FixedOffset>, ApiError> {
    DateTime::parse_from_rfc3339(raw).map_err(|_| ApiError::BadRequest(format!("invalid {field}")))
}

// -----------------------------
// GET /api/sessions
// -----------------------------
pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<SessionListParams>,
) -> Result<Json<ListEnvelope<Session>>, ApiError> {
    let from = q.from.as_deref().map(|r| parse_instant(r, "from")).transpose()?;
    let to = q.to.as_deref().map(|r| parse_instant(r, "to")).transpose()?;

    let mut sessions: Vec<Session> = state
        .read(|db| {
            db.sessions
                .iter()
                .filter(|s| s.user_id == user.user_id)
                .filter(|s| from.is_none_or(|f| s.start_time >= f))
                .filter(|s| to.is_none_or(|t| s.start_time < t))
                .cloned()
                .collect()
        })
        .await?;

    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    Ok(Json(paginate(sessions, q.page, q.limit)))
}

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionInput {
    #[serde(default)]
    pub category: Option<SessionCategory>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mood_before: Option<u8>,
    #[serde(default)]
    pub energy_before: Option<u8>,
}

// -----------------------------
// POST /api/sessions
// Only one active session per user
// -----------------------------
pub async fn start_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<StartSessionInput>,
) -> Result<Json<ItemEnvelope<Session>>, ApiError> {
    let now = now_fixed_offset();

    let item = state
        .write(|db| {
            if db
                .sessions
                .iter()
                .any(|s| s.user_id == user.user_id && s.is_active)
            {
                return Err(ApiError::BadRequest("a session is already running".into()));
            }
            if let Some(task_id) = &input.task_id {
                if !db.tasks.iter().any(|t| &t.id == task_id && t.user_id == user.user_id) {
                    return Err(ApiError::NotFound(format!("task {task_id}")));
                }
            }

            let mut session = Session::start(
                Uuid::new_v4().to_string(),
                user.user_id.clone(),
                input.category.unwrap_or_default(),
                input.task_id.clone(),
                input.title.clone(),
                now,
            );
            session.metrics.mood_before = input.mood_before;
            session.metrics.energy_before = input.energy_before;
            db.sessions.push(session.clone());
            Ok(session)
        })
        .await?;

    tracing::info!(session_id = %item.id, category = ?item.category, "session started");
    Ok(Json(ItemEnvelope { item }))
}

#[derive(Debug, Default, Deserialize)]
pub struct InterruptionInput {
    #[serde(default)]
    pub reason: Option<String>,
}

// -----------------------------
// POST /api/sessions/:id/interruptions
// -----------------------------
pub async fn add_interruption(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<InterruptionInput>,
) -> Result<Json<ItemEnvelope<Session>>, ApiError> {
    let now = now_fixed_offset();
    let item = state
        .write(|db| {
            let session = find_session(&mut db.sessions, &id, &user)?;
            if !session.record_interruption(now, input.reason) {
                return Err(ApiError::BadRequest("session already ended".into()));
            }
            Ok(session.clone())
        })
        .await?;
    Ok(Json(ItemEnvelope { item }))
}

// -----------------------------
// POST /api/sessions/:id/end
// Links the session to its task on the way out
// -----------------------------
pub async fn end_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(end): Json<SessionEnd>,
) -> Result<Json<ItemEnvelope<Session>>, ApiError> {
    let now = now_fixed_offset();
    let item = state
        .write(|db| {
            let session = find_session(&mut db.sessions, &id, &user)?;
            if !session.is_active {
                return Err(ApiError::BadRequest("session already ended".into()));
            }
            session.end(now, end);
            let ended = session.clone();

            if let Some(task_id) = &ended.task_id {
                if let Some(task) = db.tasks.iter_mut().find(|t| &t.id == task_id) {
                    if !task.linked_sessions.contains(&ended.id) {
                        task.linked_sessions.push(ended.id.clone());
                    }
                }
            }
            Ok(ended)
        })
        .await?;

    tracing::info!(
        session_id = %item.id,
        duration = item.duration_seconds(),
        focus_score = item.metrics.focus_score,
        flow = item.metrics.flow_state_detected,
        "session ended"
    );
    Ok(Json(ItemEnvelope { item }))
}

// -----------------------------
// DELETE /api/sessions/:id
// -----------------------------
pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessEnvelope>, ApiError> {
    state
        .write(|db| {
            let before = db.sessions.len();
            db.sessions
                .retain(|s| !(s.id == id && s.user_id == user.user_id));
            if db.sessions.len() == before {
                return Err(ApiError::NotFound(format!("session {id}")));
            }
            for task in db.tasks.iter_mut() {
                task.linked_sessions.retain(|s| *s != id);
            }
            Ok(())
        })
        .await?;
    Ok(Json(SuccessEnvelope { success: true }))
}

fn find_session<'a>(
    sessions: &'a mut [Session],
    id: &str,
    user: &AuthUser,
) -> Result<&'a mut Session, ApiError> {
    sessions
        .iter_mut()
        .find(|s| s.id == id && s.user_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))
}
