use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{EntityKind, EntityStore, IdGenerator, StoreError, StoreResult, UuidIds};
use crate::models::{
    Goal, Habit, NewGoal, NewHabit, NewNote, NewProject, NewReminder, NewTask, Note, Project,
    Reminder, Task, TaskUpdate,
};

/// Serializable contents of an [`InMemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// Process-local store keeping records in insertion order
pub struct InMemoryStore {
    ids: Box<dyn IdGenerator>,
    state: RwLock<StoreSnapshot>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(UuidIds))
    }

    pub fn with_id_generator(ids: Box<dyn IdGenerator>) -> Self {
        Self {
            ids,
            state: RwLock::new(StoreSnapshot::default()),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            ids,
            state: RwLock::new(snapshot),
        }
    }

    /// Load a snapshot file; a missing file yields an empty store
    pub async fn load_json(path: &Path, ids: Box<dyn IdGenerator>) -> StoreResult<Self> {
        if !path.exists() {
            tracing::info!("[STORE] No snapshot at {}, starting empty", path.display());
            return Ok(Self::with_id_generator(ids));
        }
        let raw = tokio::fs::read_to_string(path).await?;
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)?;
        tracing::info!(
            "[STORE] Loaded {} tasks, {} goals, {} habits from {}",
            snapshot.tasks.len(),
            snapshot.goals.len(),
            snapshot.habits.len(),
            path.display()
        );
        Ok(Self::from_snapshot(snapshot, ids))
    }

    pub async fn save_json(&self, path: &Path) -> StoreResult<()> {
        let snapshot = self.snapshot().await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }
}

fn remove_by_id<T>(items: &mut Vec<T>, id: &str, key: impl Fn(&T) -> &str) -> bool {
    let before = items.len();
    items.retain(|item| key(item) != id);
    items.len() != before
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self.state.read().await.tasks.clone())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<String> {
        if task.title.trim().is_empty() {
            return Err(StoreError::Rejected("task title is empty".to_string()));
        }
        let id = self.ids.next_id(EntityKind::Task);
        self.state.write().await.tasks.push(Task {
            id: id.clone(),
            title: task.title,
            area: task.area,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
        });
        tracing::debug!("[STORE] Created task {}", id);
        Ok(id)
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Task,
                id: id.to_string(),
            })?;

        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(area) = update.area {
            task.area = Some(area);
        }
        if let Some(due_date) = update.due_date {
            task.due_date = Some(due_date);
        }
        tracing::debug!("[STORE] Updated task {}", id);
        Ok(())
    }

    async fn list_goals(&self) -> StoreResult<Vec<Goal>> {
        Ok(self.state.read().await.goals.clone())
    }

    async fn create_goal(&self, goal: NewGoal) -> StoreResult<String> {
        let id = self.ids.next_id(EntityKind::Goal);
        self.state.write().await.goals.push(Goal {
            id: id.clone(),
            title: goal.title,
            area: goal.area,
            description: goal.description,
            target_date: goal.target_date,
        });
        Ok(id)
    }

    async fn list_habits(&self) -> StoreResult<Vec<Habit>> {
        Ok(self.state.read().await.habits.clone())
    }

    async fn create_habit(&self, habit: NewHabit) -> StoreResult<String> {
        let id = self.ids.next_id(EntityKind::Habit);
        self.state.write().await.habits.push(Habit {
            id: id.clone(),
            name: habit.name,
            area: habit.area,
            frequency: habit.frequency,
        });
        Ok(id)
    }

    async fn list_notes(&self) -> StoreResult<Vec<Note>> {
        Ok(self.state.read().await.notes.clone())
    }

    async fn create_note(&self, note: NewNote) -> StoreResult<String> {
        let id = self.ids.next_id(EntityKind::Note);
        self.state.write().await.notes.push(Note {
            id: id.clone(),
            title: note.title,
            content: note.content,
        });
        Ok(id)
    }

    async fn list_reminders(&self) -> StoreResult<Vec<Reminder>> {
        Ok(self.state.read().await.reminders.clone())
    }

    async fn create_reminder(&self, reminder: NewReminder) -> StoreResult<String> {
        let id = self.ids.next_id(EntityKind::Reminder);
        self.state.write().await.reminders.push(Reminder {
            id: id.clone(),
            title: reminder.title,
            remind_at: reminder.remind_at,
        });
        Ok(id)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.state.read().await.projects.clone())
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<String> {
        let id = self.ids.next_id(EntityKind::Project);
        self.state.write().await.projects.push(Project {
            id: id.clone(),
            name: project.name,
            area: project.area,
            description: project.description,
        });
        Ok(id)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let removed = match kind {
            EntityKind::Task => remove_by_id(&mut state.tasks, id, |t| t.id.as_str()),
            EntityKind::Goal => remove_by_id(&mut state.goals, id, |g| g.id.as_str()),
            EntityKind::Habit => remove_by_id(&mut state.habits, id, |h| h.id.as_str()),
            EntityKind::Note => remove_by_id(&mut state.notes, id, |n| n.id.as_str()),
            EntityKind::Reminder => remove_by_id(&mut state.reminders, id, |r| r.id.as_str()),
            EntityKind::Project => remove_by_id(&mut state.projects, id, |p| p.id.as_str()),
        };
        if removed {
            tracing::debug!("[STORE] Deleted {} {}", kind, id);
            Ok(())
        } else {
            Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            })
        }
    }
}
