//! System context block sent at the top of every upstream request

use chrono::NaiveDate;

use crate::{
    models::{Goal, Habit, Project, Task},
    store::{EntityStore, StoreResult},
};

const INSTRUCTIONS: &str = "You are a personal organizer. Turn what the user writes into \
tasks, goals, habits, notes, reminders and projects using the provided tools. Batch every \
task from one message into a single create_tasks call. When nothing needs to be created, \
reply briefly and affirmatively.";

/// Records the context block summarizes
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    pub tasks: Vec<Task>,
    pub goals: Vec<Goal>,
    pub habits: Vec<Habit>,
    pub projects: Vec<Project>,
}

impl StoreContext {
    pub async fn load(store: &dyn EntityStore) -> StoreResult<Self> {
        Ok(Self {
            tasks: store.list_tasks().await?,
            goals: store.list_goals().await?,
            habits: store.list_habits().await?,
            projects: store.list_projects().await?,
        })
    }
}

fn section<'a>(label: &str, titles: impl ExactSizeIterator<Item = &'a str>) -> String {
    let count = titles.len();
    if count == 0 {
        return format!("- {} (0): none", label);
    }
    let joined = titles.map(|t| format!("\"{}\"", t)).collect::<Vec<_>>().join(", ");
    format!("- {} ({}): {}", label, count, joined)
}

/// Render the snapshot; only the first `max_tasks` tasks are listed
pub fn render_context(context: &StoreContext, max_tasks: usize, today: NaiveDate) -> String {
    let mut lines = vec![
        INSTRUCTIONS.to_string(),
        format!("Today is {}.", today.format("%Y-%m-%d")),
        String::new(),
        "Current records:".to_string(),
    ];

    let shown: Vec<String> = context
        .tasks
        .iter()
        .take(max_tasks)
        .map(|t| format!("\"{}\" [{}, {}]", t.title, t.status, t.priority))
        .collect();
    if shown.is_empty() {
        lines.push("- Tasks (0): none".to_string());
    } else {
        let mut line = format!("- Tasks ({}): {}", context.tasks.len(), shown.join(", "));
        let hidden = context.tasks.len().saturating_sub(max_tasks);
        if hidden > 0 {
            line.push_str(&format!(" and {} more", hidden));
        }
        lines.push(line);
    }

    lines.push(section("Goals", context.goals.iter().map(|g| g.title.as_str())));
    lines.push(section("Habits", context.habits.iter().map(|h| h.name.as_str())));
    lines.push(section("Projects", context.projects.iter().map(|p| p.name.as_str())));

    lines.join("\n")
}

/// Load the store and render the context block
pub async fn build_context_block(
    store: &dyn EntityStore,
    max_tasks: usize,
    today: NaiveDate,
) -> StoreResult<String> {
    let context = StoreContext::load(store).await?;
    Ok(render_context(&context, max_tasks, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};

    fn task(n: usize) -> Task {
        Task {
            id: format!("task-{}", n),
            title: format!("Task {}", n),
            area: None,
            priority: Priority::Medium,
            status: TaskStatus::Todo,
            due_date: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_empty_store() {
        let block = render_context(&StoreContext::default(), 30, today());
        assert!(block.contains("Today is 2026-10-17."));
        assert!(block.contains("- Tasks (0): none"));
        assert!(block.contains("- Projects (0): none"));
    }

    #[test]
    fn test_tasks_are_capped() {
        let context = StoreContext {
            tasks: (1..=32).map(task).collect(),
            goals: vec![Goal {
                id: "goal-1".into(),
                title: "Run a marathon".into(),
                area: None,
                description: None,
                target_date: None,
            }],
            ..Default::default()
        };
        let block = render_context(&context, 30, today());
        assert!(block.contains("- Tasks (32): \"Task 1\" [todo, medium]"));
        assert!(block.contains("\"Task 30\""));
        assert!(!block.contains("\"Task 31\""));
        assert!(block.contains("and 2 more"));
        assert!(block.contains("- Goals (1): \"Run a marathon\""));
    }
}
