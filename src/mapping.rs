// Translation between the stored task vocabulary and the simplified
// categories the board / list views work with.

use serde::{Deserialize, Serialize};

use crate::models::{Priority, Task, TaskStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UiPriority {
    High,
    Medium,
    Low,
}

/// Missing priority maps to `Low`.
pub fn map_priority_to_ui(priority: Option<Priority>) -> UiPriority {
    match priority {
        Some(Priority::UrgentImportant) => UiPriority::High,
        Some(Priority::UrgentNotImportant) => UiPriority::Medium,
        Some(Priority::NotUrgentImportant) => UiPriority::Medium,
        Some(Priority::NotUrgentNotImportant) | None => UiPriority::Low,
    }
}

/// Same mapping for raw strings; anything unrecognised is `Low`.
pub fn map_priority_str_to_ui(raw: Option<&str>) -> UiPriority {
    map_priority_to_ui(raw.and_then(Priority::parse))
}

/// Honors both the status field and the legacy `completed` boolean.
pub fn is_task_completed(task: &Task) -> bool {
    task.status == TaskStatus::Completed || task.legacy_completed == Some(true)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KanbanColumn {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "review")]
    Review,
    #[serde(rename = "done")]
    Done,
}

impl KanbanColumn {
    pub const ALL: [KanbanColumn; 4] = [
        KanbanColumn::Todo,
        KanbanColumn::InProgress,
        KanbanColumn::Review,
        KanbanColumn::Done,
    ];

    /// Stored statuses shown in this column. The first one is what a
    /// card dropped here gets written back as.
    pub fn statuses(&self) -> &'static [TaskStatus] {
        match self {
            KanbanColumn::Todo => &[TaskStatus::Todo, TaskStatus::Backlog],
            KanbanColumn::InProgress => &[TaskStatus::InProgress],
            KanbanColumn::Review => &[TaskStatus::Blocked],
            KanbanColumn::Done => &[TaskStatus::Completed],
        }
    }
}

/// Cancelled tasks have no column.
pub fn column_for_status(status: TaskStatus) -> Option<KanbanColumn> {
    KanbanColumn::ALL
        .into_iter()
        .find(|col| col.statuses().contains(&status))
}

pub fn status_for_column(column: KanbanColumn) -> TaskStatus {
    column.statuses()[0]
}

/// Column for a task, treating legacy-completed records as done.
pub fn column_for_task(task: &Task) -> Option<KanbanColumn> {
    if is_task_completed(task) {
        return Some(KanbanColumn::Done);
    }
    column_for_status(task.status)
}

/// Board layout: every column present (possibly empty), tasks in input order.
pub fn group_by_column(tasks: &[Task]) -> Vec<(KanbanColumn, Vec<&Task>)> {
    let mut board: Vec<(KanbanColumn, Vec<&Task>)> =
        KanbanColumn::ALL.into_iter().map(|c| (c, Vec::new())).collect();
    for task in tasks {
        if let Some(col) = column_for_task(task) {
            if let Some((_, cards)) = board.iter_mut().find(|(c, _)| *c == col) {
                cards.push(task);
            }
        }
    }
    board
}
