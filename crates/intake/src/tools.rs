//! The six create tools the model may call, and their execution against the store

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    brain::{ToolCallRequest, ToolDefinition},
    models::{Area, NewGoal, NewHabit, NewNote, NewProject, NewReminder, NewTask, Priority},
    store::{EntityStore, StoreError},
};

pub const CREATE_TASKS: &str = "create_tasks";
pub const CREATE_GOAL: &str = "create_goal";
pub const CREATE_HABIT: &str = "create_habit";
pub const CREATE_NOTE: &str = "create_note";
pub const CREATE_REMINDER: &str = "create_reminder";
pub const CREATE_PROJECT: &str = "create_project";

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[schemars(description = "Short, actionable task title")]
    pub title: String,
    #[serde(default)]
    #[schemars(description = "Task priority; medium when omitted")]
    pub priority: Option<Priority>,
    #[serde(default)]
    #[schemars(description = "Life area the task belongs to")]
    pub area: Option<Area>,
    #[serde(default)]
    #[schemars(description = "Due date (YYYY-MM-DD)")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CreateTasksArgs {
    #[schemars(description = "Every task mentioned by the user, one entry each")]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalSpec {
    #[schemars(description = "Goal title")]
    pub title: String,
    #[serde(default)]
    #[schemars(description = "Life area the goal belongs to")]
    pub area: Option<Area>,
    #[serde(default)]
    #[schemars(description = "Why the goal matters or how success is measured")]
    pub description: Option<String>,
    #[serde(default)]
    #[schemars(description = "Target date (YYYY-MM-DD)")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HabitSpec {
    #[schemars(description = "Habit name")]
    pub name: String,
    #[serde(default)]
    #[schemars(description = "Life area the habit belongs to")]
    pub area: Option<Area>,
    #[serde(default)]
    #[schemars(description = "How often, e.g. daily, weekly; daily when omitted")]
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct NoteSpec {
    #[schemars(description = "Note title")]
    pub title: String,
    #[serde(default)]
    #[schemars(description = "Note body")]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSpec {
    #[schemars(description = "What to be reminded about")]
    pub title: String,
    #[serde(default)]
    #[schemars(description = "When to remind, RFC 3339 timestamp")]
    pub remind_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ProjectSpec {
    #[schemars(description = "Project name")]
    pub name: String,
    #[serde(default)]
    #[schemars(description = "Life area the project belongs to")]
    pub area: Option<Area>,
    #[serde(default)]
    #[schemars(description = "What the project is about")]
    pub description: Option<String>,
}

/// Audit record of one executed tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub tool: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ActionResult {
    pub fn failed(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            summary: format!("Failed: {}", tool),
            count: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.summary.starts_with("Failed: ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

fn parameters_for<T: schemars::JsonSchema>() -> serde_json::Value {
    let generator = schemars::generate::SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&schema).expect("tool schema serializes");
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

fn definition<T: schemars::JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters: parameters_for::<T>(),
    }
}

static TOOL_CATALOGUE: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        definition::<CreateTasksArgs>(
            CREATE_TASKS,
            "Create one or more tasks. Put every task the user mentions in a single call.",
        ),
        definition::<GoalSpec>(CREATE_GOAL, "Create a longer-term goal."),
        definition::<HabitSpec>(CREATE_HABIT, "Create a recurring habit to track."),
        definition::<NoteSpec>(CREATE_NOTE, "Save a free-form note."),
        definition::<ReminderSpec>(CREATE_REMINDER, "Create a reminder, optionally at a time."),
        definition::<ProjectSpec>(CREATE_PROJECT, "Create a project that groups related work."),
    ]
});

/// Tool definitions sent with every chat request
pub fn tool_catalogue() -> &'static [ToolDefinition] {
    &TOOL_CATALOGUE
}

fn parse_args<T: DeserializeOwned>(call: &ToolCallRequest) -> Result<T, ToolError> {
    serde_json::from_str(&call.arguments).map_err(|source| ToolError::InvalidArguments {
        tool: call.name.clone(),
        source,
    })
}

fn created(tool: &str, kind: &str, title: &str) -> ActionResult {
    ActionResult {
        tool: tool.to_string(),
        summary: format!("Created {} \"{}\"", kind, title),
        count: None,
    }
}

/// Applies model tool calls to the store
#[derive(Clone)]
pub struct ToolExecutor {
    store: Arc<dyn EntityStore>,
}

impl ToolExecutor {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Execute one call. `create_tasks` stops at the first failed create;
    /// tasks created before it stay.
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<ActionResult, ToolError> {
        tracing::debug!("[TOOL_FLOW] Executing {} ({})", call.name, call.id);

        match call.name.as_str() {
            CREATE_TASKS => {
                let args: CreateTasksArgs = parse_args(call)?;
                let count = args.tasks.len();
                for spec in args.tasks {
                    let mut task = NewTask::titled(spec.title);
                    task.priority = spec.priority.unwrap_or_default();
                    task.area = spec.area;
                    task.due_date = spec.due_date;
                    self.store.create_task(task).await?;
                }
                let noun = if count == 1 { "task" } else { "tasks" };
                Ok(ActionResult {
                    tool: call.name.clone(),
                    summary: format!("Created {} {}", count, noun),
                    count: Some(count),
                })
            }
            CREATE_GOAL => {
                let spec: GoalSpec = parse_args(call)?;
                let title = spec.title.clone();
                self.store
                    .create_goal(NewGoal {
                        title: spec.title,
                        area: spec.area,
                        description: spec.description,
                        target_date: spec.target_date,
                    })
                    .await?;
                Ok(created(&call.name, "goal", &title))
            }
            CREATE_HABIT => {
                let spec: HabitSpec = parse_args(call)?;
                let name = spec.name.clone();
                self.store
                    .create_habit(NewHabit {
                        name: spec.name,
                        area: spec.area,
                        frequency: spec.frequency.unwrap_or_else(|| "daily".to_string()),
                    })
                    .await?;
                Ok(created(&call.name, "habit", &name))
            }
            CREATE_NOTE => {
                let spec: NoteSpec = parse_args(call)?;
                let title = spec.title.clone();
                self.store
                    .create_note(NewNote {
                        title: spec.title,
                        content: spec.content,
                    })
                    .await?;
                Ok(created(&call.name, "note", &title))
            }
            CREATE_REMINDER => {
                let spec: ReminderSpec = parse_args(call)?;
                let title = spec.title.clone();
                self.store
                    .create_reminder(NewReminder {
                        title: spec.title,
                        remind_at: spec.remind_at,
                    })
                    .await?;
                Ok(created(&call.name, "reminder", &title))
            }
            CREATE_PROJECT => {
                let spec: ProjectSpec = parse_args(call)?;
                let name = spec.name.clone();
                self.store
                    .create_project(NewProject {
                        name: spec.name,
                        area: spec.area,
                        description: spec.description,
                    })
                    .await?;
                Ok(created(&call.name, "project", &name))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
