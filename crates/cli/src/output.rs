//! Output formatting and terminal rendering

use colored::{ColoredString, Colorize};
use intake::{
    confirmation::ApplyFailure, ActionResult, ChatRole, CommandPreview, ConfirmOutcome,
    ConversationMessage, Priority, Task, TaskStatus,
};

/// Print the welcome banner
pub fn print_banner(task_count: usize) {
    println!();
    println!("{}", "Intake".bright_cyan().bold());
    println!(
        "{}",
        format!("{} tasks loaded. Type a command, or /help.", task_count).dimmed()
    );
}

/// Print a section header
pub fn print_header(text: &str) {
    println!();
    println!("{}", format!("▶ {}", text).bright_yellow().bold());
    println!("{}", "─".repeat(60).dimmed());
}

pub fn print_success(text: &str) {
    println!("{} {}", "✓".bright_green(), text.bright_white());
}

pub fn print_error(text: &str) {
    println!("{} {}", "✗".bright_red(), text.bright_red());
}

pub fn print_warning(text: &str) {
    println!("{} {}", "⚠".bright_yellow(), text.yellow());
}

pub fn print_info(text: &str) {
    println!("{} {}", "ℹ".bright_blue(), text);
}

fn status_badge(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Todo => "todo".normal(),
        TaskStatus::InProgress => "in progress".bright_cyan(),
        TaskStatus::Done => "done".bright_green(),
        TaskStatus::Cancelled => "cancelled".dimmed(),
    }
}

fn priority_badge(priority: Priority) -> ColoredString {
    match priority {
        Priority::Low => "low".dimmed(),
        Priority::Medium => "medium".normal(),
        Priority::High => "high".bright_yellow(),
        Priority::Urgent => "urgent".bright_red().bold(),
    }
}

/// Print the task list as one line per task
pub fn print_tasks(tasks: &[Task]) {
    print_header(&format!("Tasks ({})", tasks.len()));
    if tasks.is_empty() {
        println!("  {}", "No tasks yet".dimmed());
        return;
    }

    for task in tasks {
        let area = task
            .area
            .map(|a| format!(" #{}", a.as_str()))
            .unwrap_or_default();
        let due = task
            .due_date
            .map(|d| format!(" due {}", d))
            .unwrap_or_default();
        println!(
            "  {} {} [{}, {}]{}{}",
            format!("({})", short_id(&task.id)).dimmed(),
            task.title.bright_white(),
            status_badge(task.status),
            priority_badge(task.priority),
            area.bright_blue(),
            due.dimmed()
        );
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Render a staged command and the keys that resolve it
pub fn print_preview(preview: &CommandPreview) {
    print_header(&preview.description);

    if let Some(create) = &preview.create {
        println!("  {} {}", "+".bright_green(), create.title.bright_white());
        println!("    priority: {}", priority_badge(create.priority));
        if let Some(area) = create.area {
            println!("    area: {}", area.as_str().bright_blue());
        }
    }

    if preview.ambiguous {
        print_warning(&format!(
            "{} tasks match; all of them will change",
            preview.changes.len()
        ));
    }

    for change in &preview.changes {
        println!(
            "  {} {}: {} {} {}",
            "~".bright_yellow(),
            change.title.bright_white(),
            change.current.dimmed(),
            "→".dimmed(),
            change.proposed.bright_yellow()
        );
    }

    println!(
        "{}",
        "Enter or y to apply, esc or n to discard".dimmed()
    );
}

fn print_failures(failed: &[ApplyFailure]) {
    for failure in failed {
        match &failure.task_id {
            Some(id) => print_error(&format!("{}: {}", short_id(id), failure.error)),
            None => print_error(&failure.error),
        }
    }
}

pub fn print_outcome(outcome: &ConfirmOutcome) {
    match outcome {
        ConfirmOutcome::Applied { applied, failed } => {
            if !applied.is_empty() {
                let noun = if applied.len() == 1 { "task" } else { "tasks" };
                print_success(&format!("Applied to {} {}", applied.len(), noun));
            }
            print_failures(failed);
        }
        ConfirmOutcome::Discarded => print_info("Discarded"),
        ConfirmOutcome::NothingPending => print_info("Nothing to confirm"),
    }
}

fn print_action(action: &ActionResult) {
    if action.is_failure() {
        print_error(&action.summary);
    } else {
        print_success(&action.summary);
    }
}

/// Print an assistant reply with the actions it took
pub fn print_reply(message: &ConversationMessage) {
    if message.role != ChatRole::Assistant {
        return;
    }

    for action in message.actions.iter().flatten() {
        print_action(action);
    }

    if message.content.is_empty() {
        return;
    }
    if message.error.is_some() {
        print_error(&message.content);
    } else {
        println!();
        println!("{}", message.content);
    }
}
