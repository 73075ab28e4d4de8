// --------------------------------------------------
// Read-only analytics views over the caller's tasks and sessions.
// --------------------------------------------------

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::{self, DashboardSummary, DayActivity, ViewConfig};
use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Session, Task, now_fixed_offset};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub date: Option<String>, // YYYY-MM-DD, defaults to today
    pub view: Option<String>,
}

async fn user_records(state: &AppState, user: &AuthUser) -> Result<(Vec<Task>, Vec<Session>), ApiError> {
    state
        .read(|db| {
            let tasks = db
                .tasks
                .iter()
                .filter(|t| t.user_id == user.user_id)
                .cloned()
                .collect();
            let sessions = db
                .sessions
                .iter()
                .filter(|s| s.user_id == user.user_id)
                .cloned()
                .collect();
            (tasks, sessions)
        })
        .await
}

// -----------------------------
// GET /api/analytics/summary
// -----------------------------
pub async fn summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<SummaryParams>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let now = now_fixed_offset();
    let today = match q.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("invalid date: {raw}")))?,
        None => now.date_naive(),
    };
    let view = match q.view.as_deref() {
        Some(name) => ViewConfig::by_name(name)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown view: {name}")))?,
        None => ViewConfig::DASHBOARD,
    };

    let (tasks, sessions) = user_records(&state, &user).await?;
    Ok(Json(analytics::dashboard_summary(
        &tasks, &sessions, today, now, view,
    )))
}

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub month: Option<String>, // YYYY-MM, defaults to this month
}

#[derive(Debug, Serialize)]
pub struct CalendarMonth {
    pub month: String,
    pub days: Vec<DayActivity>,
}

// -----------------------------
// GET /api/analytics/calendar
// -----------------------------
pub async fn calendar(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<CalendarParams>,
) -> Result<Json<CalendarMonth>, ApiError> {
    let now = now_fixed_offset();
    let anchor = match q.month.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("invalid month: {raw}")))?,
        None => now.date_naive(),
    };

    let (_, sessions) = user_records(&state, &user).await?;
    let days = analytics::mini_calendar(&sessions, analytics::month_period(anchor), *now.offset());
    Ok(Json(CalendarMonth {
        month: anchor.format("%Y-%m").to_string(),
        days,
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::testing::{TOKEN, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn summary_counts_todays_work() {
        let (app, _dir) = test_app();
        let (_, started) = send(&app, Method::POST, "/api/sessions", Some(json!({})), Some(TOKEN)).await;
        let id = started["item"]["id"].as_str().unwrap().to_string();
        send(&app, Method::POST, &format!("/api/sessions/{id}/end"), Some(json!({})), Some(TOKEN)).await;

        let (_, task) = send(&app, Method::POST, "/api/tasks", Some(json!({"title": "Ship it"})), Some(TOKEN)).await;
        let task_id = task["item"]["id"].as_str().unwrap().to_string();
        send(
            &app,
            Method::PATCH,
            &format!("/api/tasks/{task_id}"),
            Some(json!({"status": "completed"})),
            Some(TOKEN),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/api/analytics/summary", None, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessions_today"], 1);
        assert_eq!(body["current_streak"], 1);
        assert_eq!(body["tasks_completed_today"], 1);
        assert_eq!(body["week_start"], "sunday");
        assert!(body["heatmap"].as_array().unwrap().len() >= 365);

        let (_, body) = send(&app, Method::GET, "/api/analytics/summary?view=planner", None, Some(TOKEN)).await;
        assert_eq!(body["week_start"], "monday");
    }

    #[tokio::test]
    async fn calendar_covers_the_month() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, Method::GET, "/api/analytics/calendar?month=2024-02", None, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month"], "2024-02");
        let days = body["days"].as_array().unwrap();
        assert_eq!(days.len(), 29);
        assert!(days.iter().all(|d| d["level"] == 0));
    }

    #[tokio::test]
    async fn bad_parameters_are_rejected() {
        let (app, _dir) = test_app();
        for uri in [
            "/api/analytics/summary?view=weekly",
            "/api/analytics/summary?date=03/01/2024",
            "/api/analytics/calendar?month=2024-13",
        ] {
            let (status, _) = send(&app, Method::GET, uri, None, Some(TOKEN)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }
}
