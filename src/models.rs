use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::goals::Goal;
use crate::habits::Habit;

// Local -> FixedOffset (current system offset)
pub fn now_fixed_offset() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}

// --------------------------------------------------
// Tasks
// --------------------------------------------------

/// Eisenhower-style priority as stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    UrgentImportant,
    UrgentNotImportant,
    NotUrgentImportant,
    NotUrgentNotImportant,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::UrgentImportant,
        Priority::UrgentNotImportant,
        Priority::NotUrgentImportant,
        Priority::NotUrgentNotImportant,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "urgent_important" => Some(Priority::UrgentImportant),
            "urgent_not_important" => Some(Priority::UrgentNotImportant),
            "not_urgent_important" => Some(Priority::NotUrgentImportant),
            "not_urgent_not_important" => Some(Priority::NotUrgentNotImportant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::UrgentImportant => "urgent_important",
            Priority::UrgentNotImportant => "urgent_not_important",
            Priority::NotUrgentImportant => "not_urgent_important",
            Priority::NotUrgentNotImportant => "not_urgent_not_important",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "backlog" => Some(TaskStatus::Backlog),
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

// Unknown priority strings (old clients, AI output) read as "no priority".
fn lenient_priority<'de, D>(d: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(Priority::parse))
}

// Unknown status strings read as todo (i.e. not completed).
fn lenient_status<'de, D>(d: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(TaskStatus::parse).unwrap_or_default())
}

fn lenient_status_opt<'de, D>(d: D) -> Result<Option<TaskStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(TaskStatus::parse))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub estimated_duration: Option<u32>, // minutes
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_time: Option<String>, // "HH:MM"
    #[serde(default, alias = "dueDate", alias = "due_date")]
    pub deadline: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub linked_sessions: Vec<String>,
    // Old schema stored a bare boolean instead of a status.
    #[serde(default, rename = "completed", skip_serializing_if = "Option::is_none")]
    pub legacy_completed: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl Task {
    /// Canonicalize a record that may still carry the legacy shape.
    ///
    /// `completed: true` becomes `status = completed`, and any completed
    /// task gets a `completed_at` stamp so the status invariant holds.
    pub fn normalize(&mut self, now: DateTime<FixedOffset>) {
        if self.legacy_completed == Some(true) && self.status != TaskStatus::Completed {
            self.status = TaskStatus::Completed;
        }
        if self.status == TaskStatus::Completed && self.completed_at.is_none() {
            self.completed_at = self.updated_at.or(self.created_at).or(Some(now));
        }
        self.legacy_completed = None;
        self.tags = normalize_tags(&self.tags);
    }

    pub fn is_overdue(&self, now: DateTime<FixedOffset>) -> bool {
        match self.deadline {
            Some(deadline) => deadline < now && !self.status.is_closed(),
            None => false,
        }
    }

    /// Moves the task to `status`, keeping `completed_at` in step.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<FixedOffset>) {
        if status == TaskStatus::Completed {
            if self.status != TaskStatus::Completed || self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
        self.status = status;
    }

    /// Fraction of subtasks done, 0.0 when there are none.
    pub fn subtask_progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return 0.0;
        }
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        done as f64 / self.subtasks.len() as f64
    }

    /// Flip one subtask. Returns false for an out-of-range index.
    pub fn toggle_subtask(&mut self, index: usize, now: DateTime<FixedOffset>) -> bool {
        let Some(sub) = self.subtasks.get_mut(index) else {
            return false;
        };
        sub.completed = !sub.completed;
        sub.completed_at = if sub.completed { Some(now) } else { None };
        true
    }
}

/// Lowercase, trim, drop empties and duplicates (first occurrence wins).
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// A task as supplied by a user form or the AI parser: any subset of fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_priority",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<Priority>,
    #[serde(
        default,
        deserialize_with = "lenient_status_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(
        default,
        alias = "dueDate",
        alias = "due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
    #[serde(default, rename = "completed", skip_serializing_if = "Option::is_none")]
    pub legacy_completed: Option<bool>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title required"));
        }
        if let Some(time) = &self.scheduled_time {
            if !is_hhmm(time) {
                return Err(ValidationError::new("scheduled_time must be HH:MM"));
            }
        }
        Ok(())
    }

    /// Fill defaults and produce a full record.
    pub fn into_task(self, id: String, user_id: String, now: DateTime<FixedOffset>) -> Task {
        let mut task = Task {
            id,
            user_id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            tags: self.tags,
            priority: self.priority,
            status: self.status.unwrap_or_default(),
            estimated_duration: self.estimated_duration,
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            deadline: self.deadline,
            completed_at: None,
            subtasks: self.subtasks,
            linked_sessions: Vec::new(),
            legacy_completed: self.legacy_completed,
            created_at: Some(now),
            updated_at: Some(now),
        };
        task.normalize(now);
        task
    }
}

/// Partial update. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient_priority",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<Priority>,
    #[serde(
        default,
        deserialize_with = "lenient_status_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(
        default,
        alias = "dueDate",
        alias = "due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default, rename = "completed", skip_serializing_if = "Option::is_none")]
    pub legacy_completed: Option<bool>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::new("title required"));
            }
        }
        if let Some(time) = &self.scheduled_time {
            if !is_hhmm(time) {
                return Err(ValidationError::new("scheduled_time must be HH:MM"));
            }
        }
        Ok(())
    }

    pub fn apply(&self, task: &mut Task, now: DateTime<FixedOffset>) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(category) = &self.category {
            task.category = Some(category.clone());
        }
        if let Some(tags) = &self.tags {
            task.tags = normalize_tags(tags);
        }
        if let Some(priority) = self.priority {
            task.priority = Some(priority);
        }
        if let Some(minutes) = self.estimated_duration {
            task.estimated_duration = Some(minutes);
        }
        if let Some(date) = self.scheduled_date {
            task.scheduled_date = Some(date);
        }
        if let Some(time) = &self.scheduled_time {
            task.scheduled_time = Some(time.clone());
        }
        if let Some(deadline) = self.deadline {
            task.deadline = Some(deadline);
        }
        if let Some(subtasks) = &self.subtasks {
            task.subtasks = subtasks.clone();
        }

        // explicit status wins over the legacy flag
        let status = self.status.or(self.legacy_completed.map(|done| {
            if done {
                TaskStatus::Completed
            } else {
                TaskStatus::Todo
            }
        }));
        if let Some(status) = status {
            task.set_status(status, now);
        }

        task.updated_at = Some(now);
    }
}

fn is_hhmm(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 2 {
        return false;
    }
    match (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
        (Ok(h), Ok(m)) => h < 24 && m < 60,
        _ => false,
    }
}

// --------------------------------------------------
// Focus sessions
// --------------------------------------------------

/// Minimum length of a session that can count as flow (25 min).
pub const FLOW_STATE_MIN_SECONDS: i64 = 1500;
/// More interruptions than this rule out flow.
pub const FLOW_STATE_MAX_INTERRUPTIONS: usize = 1;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionCategory {
    #[default]
    DeepWork,
    Meeting,
    Learning,
    Creative,
    Admin,
    Break,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interruption {
    pub at: DateTime<FixedOffset>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionMetrics {
    #[serde(default)]
    pub mood_before: Option<u8>,
    #[serde(default)]
    pub energy_before: Option<u8>,
    #[serde(default)]
    pub mood_after: Option<u8>,
    #[serde(default)]
    pub energy_after: Option<u8>,
    #[serde(default)]
    pub context_switches: u32,
    #[serde(default)]
    pub focus_score: Option<u8>, // 0..=100
    #[serde(default)]
    pub flow_state_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: SessionCategory,
    pub start_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub end_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub duration: Option<i64>, // seconds
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub interruptions: Vec<Interruption>,
    #[serde(default)]
    pub metrics: SessionMetrics,
}

/// Values captured when a session is stopped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionEnd {
    #[serde(default)]
    pub mood_after: Option<u8>,
    #[serde(default)]
    pub energy_after: Option<u8>,
    #[serde(default)]
    pub context_switches: Option<u32>,
}

impl Session {
    pub fn start(
        id: String,
        user_id: String,
        category: SessionCategory,
        task_id: Option<String>,
        title: Option<String>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id,
            user_id,
            task_id,
            title,
            category,
            start_time: now,
            end_time: None,
            duration: None,
            is_active: true,
            interruptions: Vec::new(),
            metrics: SessionMetrics::default(),
        }
    }

    /// Returns false when the session already ended.
    pub fn record_interruption(&mut self, at: DateTime<FixedOffset>, reason: Option<String>) -> bool {
        if !self.is_active {
            return false;
        }
        self.interruptions.push(Interruption { at, reason });
        true
    }

    /// Stop the timer and derive duration, flow state and focus score.
    /// Ending an already-ended session is a no-op.
    pub fn end(&mut self, now: DateTime<FixedOffset>, end: SessionEnd) {
        if !self.is_active {
            return;
        }
        let elapsed = (now - self.start_time).num_seconds().max(0);
        self.end_time = Some(now);
        self.duration = Some(elapsed);
        self.is_active = false;

        if end.mood_after.is_some() {
            self.metrics.mood_after = end.mood_after;
        }
        if end.energy_after.is_some() {
            self.metrics.energy_after = end.energy_after;
        }
        if let Some(switches) = end.context_switches {
            self.metrics.context_switches = switches;
        }

        self.metrics.flow_state_detected = self.detect_flow_state();
        self.metrics.focus_score = Some(self.compute_focus_score());
    }

    pub fn detect_flow_state(&self) -> bool {
        !self.is_active
            && self.duration.unwrap_or(0) >= FLOW_STATE_MIN_SECONDS
            && self.interruptions.len() <= FLOW_STATE_MAX_INTERRUPTIONS
    }

    // 100 - 5/interruption - 3/context switch, +20 for flow, clamped to 0..=100
    pub fn compute_focus_score(&self) -> u8 {
        let mut score: i64 = 100;
        score -= 5 * self.interruptions.len() as i64;
        score -= 3 * i64::from(self.metrics.context_switches);
        if self.detect_flow_state() {
            score += 20;
        }
        score.clamp(0, 100) as u8
    }

    /// When the session counts for day bucketing: end time, else start time.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.end_time.unwrap_or(self.start_time)
    }

    /// Recorded length in seconds; 0 while still running.
    pub fn duration_seconds(&self) -> i64 {
        if self.is_active {
            0
        } else {
            self.duration.unwrap_or(0).max(0)
        }
    }

    /// Finished, non-break sessions are what streaks count.
    pub fn is_focus(&self) -> bool {
        !self.is_active && self.category != SessionCategory::Break
    }
}

// --------------------------------------------------
// Wire envelopes and on-disk layout
// --------------------------------------------------

/// `GET` list response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListEnvelope<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// `POST` / `PATCH` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemEnvelope<T> {
    pub item: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuccessEnvelope {
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub habits: Vec<Habit>,
}
