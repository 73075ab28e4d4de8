// --------------------------------------------------
// Goal endpoints: create, report progress, change status.
// --------------------------------------------------

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::goals::{Goal, GoalDraft, GoalStatus};
use crate::models::{ItemEnvelope, ListEnvelope, SuccessEnvelope, now_fixed_offset};

// -----------------------------
// GET /api/goals
// -----------------------------
pub async fn list_goals(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ListEnvelope<Goal>>, ApiError> {
    let items: Vec<Goal> = state
        .read(|db| {
            db.goals
                .iter()
                .filter(|g| g.user_id == user.user_id)
                .cloned()
                .collect()
        })
        .await?;
    let total = items.len() as u64;
    Ok(Json(ListEnvelope { items, total }))
}

// -----------------------------
// POST /api/goals
// -----------------------------
pub async fn create_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<GoalDraft>,
) -> Result<Json<ItemEnvelope<Goal>>, ApiError> {
    draft.validate()?;
    let goal = Goal::new(
        Uuid::new_v4().to_string(),
        user.user_id,
        draft,
        now_fixed_offset(),
    );

    let item = state
        .write(|db| {
            db.goals.push(goal.clone());
            Ok(goal)
        })
        .await?;
    tracing::info!(goal_id = %item.id, "goal created");
    Ok(Json(ItemEnvelope { item }))
}

/// Exactly one of `value` (absolute) or `delta` (incremental).
#[derive(Debug, Deserialize)]
pub struct ProgressInput {
    pub value: Option<f64>,
    pub delta: Option<f64>,
}

// -----------------------------
// POST /api/goals/:id/progress
// -----------------------------
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ProgressInput>,
) -> Result<Json<ItemEnvelope<Goal>>, ApiError> {
    let now = now_fixed_offset();
    let item = state
        .write(|db| {
            let goal = find_goal(&mut db.goals, &id, &user)?;
            match (input.value, input.delta) {
                (Some(v), None) if v.is_finite() => goal.update_progress(v, now),
                (None, Some(d)) if d.is_finite() => goal.add_progress(d, now),
                _ => {
                    return Err(ApiError::BadRequest(
                        "send either a finite value or a finite delta".into(),
                    ));
                }
            }
            Ok(goal.clone())
        })
        .await?;

    tracing::debug!(
        goal_id = %item.id,
        progress = item.current_progress,
        percent = item.progress_percentage,
        "goal progress updated"
    );
    Ok(Json(ItemEnvelope { item }))
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: GoalStatus,
}

// -----------------------------
// PATCH /api/goals/:id/status
// -----------------------------
pub async fn set_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Json<ItemEnvelope<Goal>>, ApiError> {
    let item = state
        .write(|db| {
            let goal = find_goal(&mut db.goals, &id, &user)?;
            goal.set_status(input.status)?;
            Ok(goal.clone())
        })
        .await?;
    Ok(Json(ItemEnvelope { item }))
}

// -----------------------------
// DELETE /api/goals/:id
// -----------------------------
pub async fn delete_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessEnvelope>, ApiError> {
    state
        .write(|db| {
            let before = db.goals.len();
            db.goals.retain(|g| !(g.id == id && g.user_id == user.user_id));
            if db.goals.len() == before {
                return Err(ApiError::NotFound(format!("goal {id}")));
            }
            Ok(())
        })
        .await?;
    Ok(Json(SuccessEnvelope { success: true }))
}

fn find_goal<'a>(goals: &'a mut [Goal], id: &str, user: &AuthUser) -> Result<&'a mut Goal, ApiError> {
    goals
        .iter_mut()
        .find(|g| g.id == id && g.user_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound(format!("goal {id}")))
}
