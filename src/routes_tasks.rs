// --------------------------------------------------
// Handles API endpoints related to task CRUD operations.
//
// Responsibilities:
// - List tasks (paginated, filtered) -> {items, total}
// - Create / partially update tasks -> {item}
// - Delete tasks -> {success}
// -------------------------------------------------

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    ItemEnvelope, ListEnvelope, SuccessEnvelope, Task, TaskDraft, TaskPatch, TaskStatus,
    now_fixed_offset,
};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// 1-based page slice plus the unpaged total.
pub(crate) fn paginate<T>(items: Vec<T>, page: Option<u32>, limit: Option<u32>) -> ListEnvelope<T> {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let total = items.len() as u64;
    let skip = ((page - 1) as usize).saturating_mul(limit as usize);
    let items = items.into_iter().skip(skip).take(limit as usize).collect();
    ListEnvelope { items, total }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

// -----------------------------
// GET /api/tasks
// Newest first, optionally filtered
// -----------------------------
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<ListParams>,
) -> Result<Json<ListEnvelope<Task>>, ApiError> {
    let status = match q.status.as_deref() {
        Some(raw) => Some(
            TaskStatus::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("invalid status: {raw}")))?,
        ),
        None => None,
    };
    let tag = q.tag.as_deref().map(|t| t.trim().to_lowercase());
    let search = q.search.as_deref().map(|s| s.trim().to_lowercase());

    let mut tasks: Vec<Task> = state
        .read(|db| {
            db.tasks
                .iter()
                .filter(|t| t.user_id == user.user_id)
                .filter(|t| status.is_none_or(|s| t.status == s))
                .filter(|t| {
                    q.category
                        .as_deref()
                        .is_none_or(|c| t.category.as_deref() == Some(c))
                })
                .filter(|t| tag.as_deref().is_none_or(|tag| t.tags.iter().any(|x| x == tag)))
                .filter(|t| {
                    search.as_deref().is_none_or(|s| {
                        t.title.to_lowercase().contains(s)
                            || t
                                .description
                                .as_deref()
                                .is_some_and(|d| d.to_lowercase().contains(s))
                    })
                })
                .cloned()
                .collect()
        })
        .await?;

    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(paginate(tasks, q.page, q.limit)))
}

// -----------------------------
// POST /api/tasks
// Accepts any subset of task fields; title required
// -----------------------------
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<TaskDraft>,
) -> Result<Json<ItemEnvelope<Task>>, ApiError> {
    draft.validate()?;

    let now = now_fixed_offset();
    let task = draft.into_task(Uuid::new_v4().to_string(), user.user_id, now);

    let item = state
        .write(|db| {
            db.tasks.push(task.clone());
            Ok(task)
        })
        .await?;

    tracing::info!(task_id = %item.id, "task created");
    Ok(Json(ItemEnvelope { item }))
}

// -----------------------------
// PATCH /api/tasks/:id
// Partial update; completed_at follows status
// ----------------------------
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<ItemEnvelope<Task>>, ApiError> {
    patch.validate()?;
    let now = now_fixed_offset();

    let item = state
        .write(|db| {
            let Some(t) = db
                .tasks
                .iter_mut()
                .find(|t| t.id == id && t.user_id == user.user_id)
            else {
                return Err(ApiError::NotFound(format!("task {id}")));
            };
            patch.apply(t, now);
            Ok(t.clone())
        })
        .await?;

    tracing::debug!(task_id = %item.id, status = item.status.as_str(), "task updated");
    Ok(Json(ItemEnvelope { item }))
}

// -----------------------------
// DELETE /api/tasks/:id
// Removes a task permanently
// -----------------------------
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessEnvelope>, ApiError> {
    state
        .write(|db| {
            let before = db.tasks.len();
            db.tasks.retain(|t| !(t.id == id && t.user_id == user.user_id));
            if db.tasks.len() == before {
                return Err(ApiError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
        .await?;

    tracing::info!(task_id = %id, "task deleted");
    Ok(Json(SuccessEnvelope { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{TOKEN, send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn paginate_slices_and_clamps() {
        let page = paginate((1..=45).collect::<Vec<u32>>(), Some(3), Some(20));
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(page.total, 45);

        let first = paginate(vec![1, 2, 3], Some(0), Some(0));
        assert_eq!(first.items, vec![1]);

        let capped = paginate((0..500).collect::<Vec<u32>>(), None, Some(1000));
        assert_eq!(capped.items.len(), MAX_LIMIT as usize);
    }

    #[tokio::test]
    async fn requests_without_token_are_rejected() {
        let (app, _dir) = test_app();
        let (status, body) = send(&app, Method::GET, "/api/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, Method::GET, "/api/tasks", None, Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn task_crud_roundtrip() {
        let (app, _dir) = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({"title": "Draft blog post", "tags": ["Writing"], "priority": "urgent_important"})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["item"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["item"]["status"], "todo");
        assert_eq!(body["item"]["tags"], json!(["writing"]));

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/tasks/{id}"),
            Some(json!({"status": "completed"})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["status"], "completed");
        assert!(body["item"]["completed_at"].is_string());

        let (_, body) = send(&app, Method::GET, "/api/tasks?status=completed", None, Some(TOKEN)).await;
        assert_eq!(body["total"], 1);

        let (status, body) = send(&app, Method::DELETE, &format!("/api/tasks/{id}"), None, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = send(&app, Method::DELETE, &format!("/api/tasks/{id}"), None, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let (app, _dir) = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({"title": "   "})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "title required");
    }

    #[tokio::test]
    async fn list_filters_and_pages() {
        let (app, _dir) = test_app();
        for (title, tag) in [("Plan sprint", "work"), ("Buy milk", "home"), ("Review PR", "work")] {
            send(
                &app,
                Method::POST,
                "/api/tasks",
                Some(json!({"title": title, "tags": [tag]})),
                Some(TOKEN),
            )
            .await;
        }

        let (_, body) = send(&app, Method::GET, "/api/tasks?tag=work&limit=1", None, Some(TOKEN)).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, Method::GET, "/api/tasks?search=milk", None, Some(TOKEN)).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["title"], "Buy milk");

        let (status, _) = send(&app, Method::GET, "/api/tasks?status=done", None, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
