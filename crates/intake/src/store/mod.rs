//! Record store adapter
//!
//! The pipeline never owns records; it reads and mutates them through the
//! [`EntityStore`] trait. [`InMemoryStore`] is the reference adapter used by the
//! CLI and the tests.

mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{
    Goal, Habit, NewGoal, NewHabit, NewNote, NewProject, NewReminder, NewTask, Note, Project,
    Reminder, Task, TaskUpdate,
};

pub use memory::{InMemoryStore, StoreSnapshot};

/// Entity families the store exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Goal,
    Habit,
    Note,
    Reminder,
    Project,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Goal => "goal",
            EntityKind::Habit => "habit",
            EntityKind::Note => "note",
            EntityKind::Reminder => "reminder",
            EntityKind::Project => "project",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Store rejected the write: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Source of record identifiers, owned by a single store instance
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, kind: EntityKind) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self, _kind: EntityKind) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<kind>-<n>` ids, counting from 1 per generator
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue counting after `start` (used when a snapshot is reloaded)
    pub fn starting_after(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, kind: EntityKind) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", kind.as_str(), n)
    }
}

/// Narrow contract over the personal record store.
///
/// Every call is independent and atomic on the store side; callers do no local
/// caching or locking.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    async fn create_task(&self, task: NewTask) -> StoreResult<String>;
    async fn update_task(&self, id: &str, update: TaskUpdate) -> StoreResult<()>;

    async fn list_goals(&self) -> StoreResult<Vec<Goal>>;
    async fn create_goal(&self, goal: NewGoal) -> StoreResult<String>;

    async fn list_habits(&self) -> StoreResult<Vec<Habit>>;
    async fn create_habit(&self, habit: NewHabit) -> StoreResult<String>;

    async fn list_notes(&self) -> StoreResult<Vec<Note>>;
    async fn create_note(&self, note: NewNote) -> StoreResult<String>;

    async fn list_reminders(&self) -> StoreResult<Vec<Reminder>>;
    async fn create_reminder(&self, reminder: NewReminder) -> StoreResult<String>;

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    async fn create_project(&self, project: NewProject) -> StoreResult<String>;

    async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<()>;

    async fn delete_task(&self, id: &str) -> StoreResult<()> {
        self.delete(EntityKind::Task, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_are_scoped_per_generator() {
        let a = SequentialIds::new();
        let b = SequentialIds::new();
        assert_eq!(a.next_id(EntityKind::Task), "task-1");
        assert_eq!(a.next_id(EntityKind::Goal), "goal-2");
        assert_eq!(b.next_id(EntityKind::Task), "task-1");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.next_id(EntityKind::Note), ids.next_id(EntityKind::Note));
    }
}
