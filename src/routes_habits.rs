// --------------------------------------------------
// Habit endpoints. Streaks are recomputed against the server's
// local day on every read and write.
// --------------------------------------------------

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::habits::{DEFAULT_COMPLETION_WINDOW, Habit, HabitDraft};
use crate::models::{ItemEnvelope, ListEnvelope, SuccessEnvelope, now_fixed_offset};

/// A habit plus the figures a habit card shows.
#[derive(Debug, Serialize)]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    pub is_due_today: bool,
    pub completed_today: bool,
    pub completion_rate: u32,
}

impl HabitView {
    fn new(mut habit: Habit, today: NaiveDate) -> Self {
        habit.refresh_streak(today);
        Self {
            is_due_today: habit.is_due_today(today),
            completed_today: habit.is_completed_on(today),
            completion_rate: habit.completion_rate(today, DEFAULT_COMPLETION_WINDOW),
            habit,
        }
    }
}

// "2024-06-03" or a full RFC3339 timestamp, reduced to its own calendar day
fn parse_day(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::BadRequest(format!("invalid date: {raw}")))
}

// -----------------------------
// GET /api/habits
// -----------------------------
pub async fn list_habits(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ListEnvelope<HabitView>>, ApiError> {
    let today = now_fixed_offset().date_naive();
    let items: Vec<HabitView> = state
        .read(|db| {
            db.habits
                .iter()
                .filter(|h| h.user_id == user.user_id)
                .cloned()
                .map(|h| HabitView::new(h, today))
                .collect()
        })
        .await?;
    let total = items.len() as u64;
    Ok(Json(ListEnvelope { items, total }))
}

// -----------------------------
// POST /api/habits
// -----------------------------
pub async fn create_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<HabitDraft>,
) -> Result<Json<ItemEnvelope<HabitView>>, ApiError> {
    draft.validate()?;
    let now = now_fixed_offset();
    let habit = Habit::new(Uuid::new_v4().to_string(), user.user_id, draft, now);

    let habit = state
        .write(|db| {
            db.habits.push(habit.clone());
            Ok(habit)
        })
        .await?;
    tracing::info!(habit_id = %habit.id, "habit created");
    Ok(Json(ItemEnvelope {
        item: HabitView::new(habit, now.date_naive()),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkInput {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// -----------------------------
// POST /api/habits/:id/complete
// Defaults to today
// -----------------------------
pub async fn mark_complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<MarkInput>,
) -> Result<Json<ItemEnvelope<HabitView>>, ApiError> {
    let today = now_fixed_offset().date_naive();
    let date = input.date.as_deref().map(parse_day).transpose()?.unwrap_or(today);

    let habit = state
        .write(|db| {
            let habit = find_habit(&mut db.habits, &id, &user)?;
            habit.mark_complete(date, input.notes, today);
            Ok(habit.clone())
        })
        .await?;

    tracing::debug!(habit_id = %habit.id, %date, streak = habit.current_streak, "habit completed");
    Ok(Json(ItemEnvelope {
        item: HabitView::new(habit, today),
    }))
}

// -----------------------------
// POST /api/habits/:id/incomplete
// -----------------------------
pub async fn mark_incomplete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<MarkInput>,
) -> Result<Json<ItemEnvelope<HabitView>>, ApiError> {
    let today = now_fixed_offset().date_naive();
    let date = input.date.as_deref().map(parse_day).transpose()?.unwrap_or(today);

    let habit = state
        .write(|db| {
            let habit = find_habit(&mut db.habits, &id, &user)?;
            habit.mark_incomplete(date, today);
            Ok(habit.clone())
        })
        .await?;
    Ok(Json(ItemEnvelope {
        item: HabitView::new(habit, today),
    }))
}

// -----------------------------
// DELETE /api/habits/:id
// -----------------------------
pub async fn delete_habit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessEnvelope>, ApiError> {
    state
        .write(|db| {
            let before = db.habits.len();
            db.habits.retain(|h| !(h.id == id && h.user_id == user.user_id));
            if db.habits.len() == before {
                return Err(ApiError::NotFound(format!("habit {id}")));
            }
            Ok(())
        })
        .await?;
    Ok(Json(SuccessEnvelope { success: true }))
}

fn find_habit<'a>(habits: &'a mut [Habit], id: &str, user: &AuthUser) -> Result<&'a mut Habit, ApiError> {
    habits
        .iter_mut()
        .find(|h| h.id == id && h.user_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound(format!("habit {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{TOKEN, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn parse_day_accepts_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(parse_day("2024-06-03").unwrap(), expected);
        assert_eq!(parse_day("2024-06-03T23:30:00+09:00").unwrap(), expected);
        assert!(parse_day("June 3rd").is_err());
    }

    #[tokio::test]
    async fn marking_today_builds_a_streak() {
        let (app, _dir) = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/habits",
            Some(json!({"title": "Meditate"})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["is_due_today"], true);
        let id = body["item"]["id"].as_str().unwrap().to_string();

        let today = now_fixed_offset().date_naive();
        let yesterday = today.pred_opt().unwrap();
        let url = format!("/api/habits/{id}/complete");

        send(&app, Method::POST, &url, Some(json!({"date": yesterday.to_string()})), Some(TOKEN)).await;
        let (status, body) = send(&app, Method::POST, &url, Some(json!({"notes": "10 min"})), Some(TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["current_streak"], 2);
        assert_eq!(body["item"]["total_completions"], 2);
        assert_eq!(body["item"]["completed_today"], true);

        let (_, body) = send(
            &app,
            Method::POST,
            &format!("/api/habits/{id}/incomplete"),
            Some(json!({})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(body["item"]["current_streak"], 1);
        assert_eq!(body["item"]["longest_streak"], 2);

        let (_, body) = send(&app, Method::GET, "/api/habits", None, Some(TOKEN)).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["completion_rate"], 3);
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let (app, _dir) = test_app();
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/habits",
            Some(json!({"title": "Gym", "frequency": "weekly"})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, Method::POST, "/api/habits", Some(json!({"title": "Gym"})), Some(TOKEN)).await;
        let id = body["item"]["id"].as_str().unwrap().to_string();
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/habits/{id}/complete"),
            Some(json!({"date": "someday"})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, "/api/habits/missing", None, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
