//! Client-side task store.
//!
//! Holds the current task list plus paging bookkeeping and a query cache,
//! and mutates optimistically against a [`TaskApi`]:
//!
//! 1. snapshot the list and apply the change locally (visible right away)
//! 2. await the remote call
//! 3. reconcile with the server's record, or restore the snapshot and
//!    return the error
//!
//! The state lock is never held across an await. Overlapping mutations of
//! the same task are not serialized and can race, same as any UI calling
//! two operations at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, FixedOffset};
use futures::future::join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{TaskApi, TaskQuery};
use crate::error::StoreError;
use crate::models::{Task, TaskDraft, TaskPatch, now_fixed_offset};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

/// Source of "now" for cache expiry and optimistic timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        now_fixed_offset()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub page_size: u32,
    pub cache_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// One field update in a bulk call.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub id: String,
    pub patch: TaskPatch,
}

#[derive(Debug, Clone)]
struct CachedPage {
    items: Vec<Task>,
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: Vec<Task>,
    page: u32,
    total: u64,
    has_more: bool,
    cache: HashMap<String, CachedPage>,
    last_fetched: Option<DateTime<FixedOffset>>,
}

pub struct TaskStore<A, C = SystemClock> {
    api: Arc<A>,
    clock: Arc<C>,
    config: StoreConfig,
    state: Arc<Mutex<StoreState>>,
}

// Handles share one state; no bounds needed on A / C.
impl<A, C> Clone for TaskStore<A, C> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            clock: Arc::clone(&self.clock),
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: TaskApi> TaskStore<A, SystemClock> {
    pub fn new(api: A) -> Self {
        Self::with_clock(api, SystemClock, StoreConfig::default())
    }
}

fn require_token(token: Option<&str>) -> Result<&str, StoreError> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(StoreError::Unauthenticated),
    }
}

fn cache_key(query: &TaskQuery, page: u32) -> String {
    let params = serde_json::to_string(query).unwrap_or_default();
    format!("{params}#page={page}")
}

fn temp_id() -> String {
    format!("temp-{}", Uuid::new_v4())
}

impl<A: TaskApi, C: Clock> TaskStore<A, C> {
    pub fn with_clock(api: A, clock: C, config: StoreConfig) -> Self {
        Self {
            api: Arc::new(api),
            clock: Arc::new(clock),
            config,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- read side ----

    /// Current list, optimistic entries included.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn page(&self) -> u32 {
        self.lock().page
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn cached_pages(&self) -> usize {
        self.lock().cache.len()
    }

    fn restore(&self, snapshot: Vec<Task>) {
        self.lock().tasks = snapshot;
    }

    fn invalidate_cache(&self) {
        let mut state = self.lock();
        state.cache.clear();
        state.last_fetched = None;
    }

    // ---- fetch ----

    /// Load one page. Page 1 replaces the list, later pages append.
    ///
    /// Served from cache when the same query+page was fetched and the last
    /// successful fetch is younger than the TTL (checked lazily here).
    pub async fn fetch(
        &self,
        query: &TaskQuery,
        page: u32,
        force_refresh: bool,
        token: Option<&str>,
    ) -> Result<Vec<Task>, StoreError> {
        let token = require_token(token)?;
        let page = page.max(1);
        let key = cache_key(query, page);

        if !force_refresh {
            let now = self.clock.now();
            let state = self.lock();
            let fresh = state
                .last_fetched
                .is_some_and(|at| now - at < self.config.cache_ttl);
            if fresh {
                if let Some(hit) = state.cache.get(&key) {
                    debug!(page, "task page served from cache");
                    return Ok(hit.items.clone());
                }
            }
        }

        let limit = self.config.page_size;
        let result = self.api.list_tasks(query, page, limit, token).await?;
        let returned = result.items.len();

        let mut state = self.lock();
        if page == 1 {
            state.tasks = result.items.clone();
        } else {
            state.tasks.extend(result.items.iter().cloned());
        }
        state.page = page;
        state.total = result.total;
        state.has_more = returned == limit as usize;
        state.cache.insert(
            key,
            CachedPage {
                items: result.items.clone(),
            },
        );
        state.last_fetched = Some(self.clock.now());
        debug!(page, returned, total = result.total, "task page fetched");

        Ok(result.items)
    }

    // ---- create ----

    pub async fn create_one(&self, draft: TaskDraft, token: Option<&str>) -> Result<Task, StoreError> {
        let mut created = self.create(vec![draft], token).await?;
        created
            .pop()
            .ok_or_else(|| StoreError::Remote("server returned no task".to_string()))
    }

    /// Create tasks one after another, in input order.
    ///
    /// All optimistic copies go to the top of the list before the first
    /// request. Any failure drops every copy from this call and restores the
    /// list as it was; tasks the server already accepted are not deleted.
    pub async fn create(
        &self,
        drafts: Vec<TaskDraft>,
        token: Option<&str>,
    ) -> Result<Vec<Task>, StoreError> {
        let token = require_token(token)?;
        for draft in &drafts {
            draft.validate()?;
        }
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let temp_ids: Vec<String> = drafts.iter().map(|_| temp_id()).collect();
        let snapshot = {
            let mut state = self.lock();
            let snapshot = state.tasks.clone();
            let mut next: Vec<Task> = drafts
                .iter()
                .zip(&temp_ids)
                .map(|(d, id)| d.clone().into_task(id.clone(), String::new(), now))
                .collect();
            next.append(&mut state.tasks);
            state.tasks = next;
            snapshot
        };
        debug!(count = drafts.len(), "optimistic create applied");

        let mut created = Vec::with_capacity(drafts.len());
        for (draft, temp) in drafts.iter().zip(&temp_ids) {
            match self.api.create_task(draft, token).await {
                Ok(task) => {
                    let mut state = self.lock();
                    if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == *temp) {
                        *slot = task.clone();
                    }
                    created.push(task);
                }
                Err(err) => {
                    warn!(error = %err, title = %draft.title, "create failed, rolling back");
                    self.restore(snapshot);
                    return Err(err);
                }
            }
        }

        {
            let mut state = self.lock();
            state.total += created.len() as u64;
        }
        self.invalidate_cache();
        Ok(created)
    }

    // ---- update ----

    pub async fn update(
        &self,
        id: &str,
        patch: TaskPatch,
        token: Option<&str>,
    ) -> Result<Task, StoreError> {
        let token = require_token(token)?;
        patch.validate()?;

        let now = self.clock.now();
        let snapshot = {
            let mut state = self.lock();
            let snapshot = state.tasks.clone();
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
                patch.apply(task, now);
            }
            snapshot
        };

        match self.api.update_task(id, &patch, token).await {
            Ok(server) => {
                {
                    let mut state = self.lock();
                    if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == id) {
                        *slot = server.clone();
                    }
                }
                self.invalidate_cache();
                Ok(server)
            }
            Err(err) => {
                warn!(task_id = %id, error = %err, "update failed, rolling back");
                self.restore(snapshot);
                Err(err)
            }
        }
    }

    // ---- delete ----

    pub async fn delete(&self, id: &str, token: Option<&str>) -> Result<(), StoreError> {
        let token = require_token(token)?;

        let snapshot = {
            let mut state = self.lock();
            let snapshot = state.tasks.clone();
            state.tasks.retain(|t| t.id != id);
            snapshot
        };

        match self.api.delete_task(id, token).await {
            Ok(()) => {
                {
                    let mut state = self.lock();
                    state.total = state.total.saturating_sub(1);
                }
                self.invalidate_cache();
                Ok(())
            }
            Err(err) => {
                warn!(task_id = %id, error = %err, "delete failed, rolling back");
                self.restore(snapshot);
                Err(err)
            }
        }
    }

    // ---- bulk update ----

    /// Apply every patch locally, send all requests at once, wait for all.
    /// One failure rolls back the whole batch.
    pub async fn bulk_update(
        &self,
        updates: Vec<TaskUpdate>,
        token: Option<&str>,
    ) -> Result<Vec<Task>, StoreError> {
        let token = require_token(token)?;
        for u in &updates {
            u.patch.validate()?;
        }
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let snapshot = {
            let mut state = self.lock();
            let snapshot = state.tasks.clone();
            for u in &updates {
                if let Some(task) = state.tasks.iter_mut().find(|t| t.id == u.id) {
                    u.patch.apply(task, now);
                }
            }
            snapshot
        };
        debug!(count = updates.len(), "optimistic bulk update applied");

        let results = join_all(
            updates
                .iter()
                .map(|u| self.api.update_task(&u.id, &u.patch, token)),
        )
        .await;

        let mut updated = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(task) => updated.push(task),
                Err(err) => {
                    warn!(error = %err, "bulk update failed, rolling back batch");
                    self.restore(snapshot);
                    return Err(err);
                }
            }
        }

        {
            let mut state = self.lock();
            for server in &updated {
                if let Some(slot) = state.tasks.iter_mut().find(|t| t.id == server.id) {
                    *slot = server.clone();
                }
            }
        }
        self.invalidate_cache();
        Ok(updated)
    }
}
