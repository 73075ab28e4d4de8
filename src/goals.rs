/*
Goal records and the progress engine.
Progress only ever moves milestones forward; see `update_progress`.
*/

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    FocusHours,
    TasksCompleted,
    Streak,
    Skill,
    Habit,
    #[default]
    Custom,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl GoalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GoalStatus::Completed | GoalStatus::Failed | GoalStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetMetric {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub title: String,
    pub target_value: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub goal_type: GoalType,
    #[serde(default)]
    pub target_metric: TargetMetric,
    #[serde(default)]
    pub current_progress: f64,
    #[serde(default)]
    pub progress_percentage: u8, // 0..=100
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub deadline: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// Fields accepted when a goal is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub goal_type: GoalType,
    #[serde(default)]
    pub target_metric: TargetMetric,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub deadline: Option<DateTime<FixedOffset>>,
}

impl GoalDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title required"));
        }
        if let Some(value) = self.target_metric.value {
            if !(value.is_finite() && value > 0.0) {
                return Err(ValidationError::new("target value must be positive"));
            }
        }
        Ok(())
    }
}

impl Goal {
    pub fn new(id: String, user_id: String, draft: GoalDraft, now: DateTime<FixedOffset>) -> Self {
        let mut milestones = draft.milestones;
        milestones.sort_by(|a, b| a.target_value.total_cmp(&b.target_value));
        for m in milestones.iter_mut() {
            m.completed = false;
            m.completed_at = None;
        }
        Self {
            id,
            user_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            goal_type: draft.goal_type,
            target_metric: draft.target_metric,
            current_progress: 0.0,
            progress_percentage: 0,
            milestones,
            status: GoalStatus::Active,
            deadline: draft.deadline,
            completed_at: None,
            created_at: Some(now),
        }
    }

    /// Set absolute progress.
    ///
    /// - percentage = floor(100 * value / target), clamped to 0..=100,
    ///   skipped when the target is unset or zero
    /// - reaching 100 completes the goal; it never reverts afterwards
    /// - milestones at or below the new value are stamped, never un-stamped
    pub fn update_progress(&mut self, value: f64, now: DateTime<FixedOffset>) {
        self.current_progress = value;

        if let Some(target) = self.target_metric.value.filter(|t| *t != 0.0 && t.is_finite()) {
            let pct = (100.0 * value / target).floor().clamp(0.0, 100.0);
            self.progress_percentage = pct as u8;
            if self.progress_percentage >= 100 && self.status != GoalStatus::Completed {
                self.status = GoalStatus::Completed;
                self.completed_at = Some(now);
            }
        }

        for milestone in self.milestones.iter_mut() {
            if !milestone.completed && milestone.target_value <= self.current_progress {
                milestone.completed = true;
                milestone.completed_at = Some(now);
            }
        }
    }

    pub fn add_progress(&mut self, delta: f64, now: DateTime<FixedOffset>) {
        self.update_progress(self.current_progress + delta, now);
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Manual status change (pause, resume, cancel, fail).
    /// Completion only happens through progress.
    pub fn set_status(&mut self, status: GoalStatus) -> Result<(), ValidationError> {
        if self.is_terminal() && status != self.status {
            return Err(ValidationError::new(format!(
                "goal is already {:?}",
                self.status
            )));
        }
        if status == GoalStatus::Completed && self.status != GoalStatus::Completed {
            return Err(ValidationError::new(
                "goals complete by reaching their target",
            ));
        }
        self.status = status;
        Ok(())
    }

    pub fn next_milestone(&self) -> Option<&Milestone> {
        self.milestones.iter().find(|m| !m.completed)
    }
}
