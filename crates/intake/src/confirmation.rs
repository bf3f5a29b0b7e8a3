//! Confirmation controller
//!
//! Holds at most one [`ParsedCommand`] between parsing and applying. Nothing
//! touches the store until the user confirms; the pending command is taken out
//! of the slot before any store call so a double confirm applies once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    models::{Area, NewTask, Priority, Task, TaskStatus, TaskUpdate},
    parser::{CommandAction, ParsedCommand},
    store::{EntityStore, StoreError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    Idle,
    Pending,
}

/// Keys (or clicks) the confirmation dialog reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKey {
    Enter,
    Escape,
    Backdrop,
}

/// Current and proposed value of the field an action changes on one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PreviewChange {
    pub task_id: String,
    pub title: String,
    pub current: String,
    pub proposed: String,
}

/// Task that confirming a create would add
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreview {
    pub title: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
}

/// What the dialog shows before anything is applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CommandPreview {
    pub action: CommandAction,
    pub description: String,
    pub changes: Vec<PreviewChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<CreatePreview>,
    /// More than one candidate matched; the dialog lists all of them
    pub ambiguous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ApplyFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ConfirmOutcome {
    /// Store calls were made; `applied` holds affected (or created) task ids
    Applied {
        applied: Vec<String>,
        failed: Vec<ApplyFailure>,
    },
    Discarded,
    NothingPending,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    #[error("A command is already awaiting confirmation")]
    Busy,

    #[error("Could not load tasks for the preview: {0}")]
    Store(#[from] StoreError),
}

struct PendingCommand {
    command: ParsedCommand,
    preview: CommandPreview,
}

fn status_for(action: CommandAction) -> Option<TaskStatus> {
    match action {
        CommandAction::Complete => Some(TaskStatus::Done),
        CommandAction::Start => Some(TaskStatus::InProgress),
        CommandAction::Cancel => Some(TaskStatus::Cancelled),
        CommandAction::Reopen => Some(TaskStatus::Todo),
        _ => None,
    }
}

fn area_label(area: Option<Area>) -> String {
    area.map(|a| a.to_string()).unwrap_or_else(|| "none".to_string())
}

fn change_for(command: &ParsedCommand, task: &Task) -> PreviewChange {
    let (current, proposed) = match command.action {
        CommandAction::Delete => (task.status.to_string(), "deleted".to_string()),
        CommandAction::SetPriority => (
            task.priority.to_string(),
            command.priority.unwrap_or(task.priority).to_string(),
        ),
        CommandAction::SetArea => (area_label(task.area), area_label(command.area.or(task.area))),
        action => (
            task.status.to_string(),
            status_for(action).unwrap_or(task.status).to_string(),
        ),
    };
    PreviewChange {
        task_id: task.id.clone(),
        title: task.title.clone(),
        current,
        proposed,
    }
}

/// Shape the preview for `command` against the current task list
pub fn build_preview(command: &ParsedCommand, tasks: &[Task]) -> CommandPreview {
    let create = (command.action == CommandAction::Create).then(|| CreatePreview {
        title: command.new_title.clone().unwrap_or_default(),
        priority: command.priority.unwrap_or_default(),
        area: command.area,
    });

    let changes = command
        .matched_task_ids
        .iter()
        .filter_map(|id| tasks.iter().find(|t| &t.id == id))
        .map(|task| change_for(command, task))
        .collect();

    CommandPreview {
        action: command.action,
        description: command.description.clone(),
        changes,
        create,
        ambiguous: command.matched_task_ids.len() > 1,
    }
}

/// Single-slot state machine between the parser and the store
pub struct ConfirmationController {
    store: Arc<dyn EntityStore>,
    pending: Option<PendingCommand>,
}

impl ConfirmationController {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            pending: None,
        }
    }

    pub fn state(&self) -> ConfirmationState {
        if self.pending.is_some() {
            ConfirmationState::Pending
        } else {
            ConfirmationState::Idle
        }
    }

    pub fn preview(&self) -> Option<&CommandPreview> {
        self.pending.as_ref().map(|p| &p.preview)
    }

    pub fn pending_command(&self) -> Option<&ParsedCommand> {
        self.pending.as_ref().map(|p| &p.command)
    }

    /// Stage `command`; rejected while another command is pending
    pub async fn propose(
        &mut self,
        command: ParsedCommand,
    ) -> Result<&CommandPreview, ConfirmationError> {
        if self.pending.is_some() {
            tracing::debug!("[CONFIRM] Rejected '{}': already pending", command.description);
            return Err(ConfirmationError::Busy);
        }

        let tasks = if command.matched_task_ids.is_empty() {
            Vec::new()
        } else {
            self.store.list_tasks().await?
        };
        let preview = build_preview(&command, &tasks);
        tracing::info!("[CONFIRM] Pending: {}", command.description);

        let pending = self.pending.insert(PendingCommand { command, preview });
        Ok(&pending.preview)
    }

    /// Apply the pending command once. Per-task failures are collected, not
    /// rolled back.
    pub async fn confirm(&mut self) -> ConfirmOutcome {
        let Some(PendingCommand { command, .. }) = self.pending.take() else {
            return ConfirmOutcome::NothingPending;
        };

        let mut applied = Vec::new();
        let mut failed = Vec::new();

        if command.action == CommandAction::Create {
            let mut task = NewTask::titled(command.new_title.clone().unwrap_or_default());
            task.priority = command.priority.unwrap_or_default();
            task.area = command.area;
            match self.store.create_task(task).await {
                Ok(id) => applied.push(id),
                Err(e) => failed.push(ApplyFailure {
                    task_id: None,
                    error: e.to_string(),
                }),
            }
        } else {
            for id in &command.matched_task_ids {
                match self.apply_to(&command, id).await {
                    Ok(()) => applied.push(id.clone()),
                    Err(e) => {
                        tracing::warn!("[CONFIRM] {} failed for {}: {}", command.action, id, e);
                        failed.push(ApplyFailure {
                            task_id: Some(id.clone()),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            "[CONFIRM] Applied {}: {} ok, {} failed",
            command.action,
            applied.len(),
            failed.len()
        );
        ConfirmOutcome::Applied { applied, failed }
    }

    /// Discard the pending command without touching the store
    pub fn cancel(&mut self) -> ConfirmOutcome {
        match self.pending.take() {
            Some(pending) => {
                tracing::info!("[CONFIRM] Discarded: {}", pending.command.description);
                ConfirmOutcome::Discarded
            }
            None => ConfirmOutcome::NothingPending,
        }
    }

    /// Enter confirms; Escape and a backdrop click cancel
    pub async fn handle_key(&mut self, key: ConfirmKey) -> ConfirmOutcome {
        match key {
            ConfirmKey::Enter => self.confirm().await,
            ConfirmKey::Escape | ConfirmKey::Backdrop => self.cancel(),
        }
    }

    async fn apply_to(&self, command: &ParsedCommand, id: &str) -> Result<(), StoreError> {
        match command.action {
            CommandAction::Delete => self.store.delete_task(id).await,
            CommandAction::SetPriority => match command.priority {
                Some(priority) => self.store.update_task(id, TaskUpdate::priority(priority)).await,
                None => Err(StoreError::Rejected("no priority given".to_string())),
            },
            CommandAction::SetArea => match command.area {
                Some(area) => self.store.update_task(id, TaskUpdate::area(area)).await,
                None => Err(StoreError::Rejected("no area given".to_string())),
            },
            action => match status_for(action) {
                Some(status) => self.store.update_task(id, TaskUpdate::status(status)).await,
                None => Err(StoreError::Rejected(format!("{} has no task target", action))),
            },
        }
    }
}
