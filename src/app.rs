// --------------------------------------------------
// Router assembly and shared state for the persistence service.
// --------------------------------------------------

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tokio::sync::Mutex;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::Db;
use crate::{routes_analytics, routes_goals, routes_habits, routes_sessions, routes_tasks, store};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    // serializes read-modify-write of the db file
    db_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            db_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn read<T>(&self, f: impl FnOnce(&Db) -> T) -> Result<T, ApiError> {
        let _guard = self.db_lock.lock().await;
        let db = store::load_db(&self.config.data_path)?;
        Ok(f(&db))
    }

    /// Load, mutate, save. Nothing is written when `f` fails.
    pub async fn write<T>(
        &self,
        f: impl FnOnce(&mut Db) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let _guard = self.db_lock.lock().await;
        let mut db = store::load_db(&self.config.data_path)?;
        let out = f(&mut db)?;
        store::save_db(&self.config.data_path, &db)?;
        Ok(out)
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // tasks
        .route("/tasks", get(routes_tasks::list_tasks).post(routes_tasks::create_task))
        .route(
            "/tasks/:id",
            patch(routes_tasks::update_task).delete(routes_tasks::delete_task),
        )
        // sessions
        .route(
            "/sessions",
            get(routes_sessions::list_sessions).post(routes_sessions::start_session),
        )
        .route("/sessions/:id", delete(routes_sessions::delete_session))
        .route("/sessions/:id/end", post(routes_sessions::end_session))
        .route(
            "/sessions/:id/interruptions",
            post(routes_sessions::add_interruption),
        )
        // goals
        .route("/goals", get(routes_goals::list_goals).post(routes_goals::create_goal))
        .route("/goals/:id", delete(routes_goals::delete_goal))
        .route("/goals/:id/progress", post(routes_goals::update_progress))
        .route("/goals/:id/status", patch(routes_goals::set_status))
        // habits
        .route("/habits", get(routes_habits::list_habits).post(routes_habits::create_habit))
        .route("/habits/:id", delete(routes_habits::delete_habit))
        .route("/habits/:id/complete", post(routes_habits::mark_complete))
        .route("/habits/:id/incomplete", post(routes_habits::mark_incomplete))
        // analytics
        .route("/analytics/summary", get(routes_analytics::summary))
        .route("/analytics/calendar", get(routes_analytics::calendar));

    let static_dir = state.config.static_dir.clone();
    let mut app = Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(dir) = static_dir {
        app = app.nest_service("/", ServeDir::new(dir));
    }
    app
}
