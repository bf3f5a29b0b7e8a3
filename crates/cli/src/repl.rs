//! Interactive REPL for the Intake CLI
//!
//! Plain sentences go through the rule-based parser and wait for confirmation;
//! `/chat` hands the text to the model-backed orchestrator.

use anyhow::Result;
use colored::Colorize;
use intake::ConfirmKey;
use rustyline::{error::ReadlineError, history::DefaultHistory, Editor};

use crate::{output, session::Session};

/// What a line typed at the confirmation prompt means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Resolve(ConfirmKey),
    Unclear,
}

fn read_answer(input: &str) -> Answer {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Answer::Resolve(ConfirmKey::Enter),
        "n" | "no" | "esc" | "\u{1b}" => Answer::Resolve(ConfirmKey::Escape),
        _ => Answer::Unclear,
    }
}

pub struct IntakeRepl {
    session: Session,
    editor: Editor<(), DefaultHistory>,
}

impl IntakeRepl {
    pub fn new(session: Session) -> Result<Self> {
        Ok(Self {
            session,
            editor: Editor::new()?,
        })
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> Result<()> {
        output::print_banner(self.session.tasks().await?.len());

        loop {
            let prompt = self.build_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if self.session.has_pending() {
                        if let Err(e) = self.handle_answer(&line).await {
                            output::print_error(&format!("Error: {}", e));
                        }
                        continue;
                    }

                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_command(input).await {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(e) => output::print_error(&format!("Command error: {}", e)),
                        }
                    } else if let Err(e) = self.process_input(input).await {
                        output::print_error(&format!("Error: {}", e));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    if self.session.has_pending() {
                        let outcome = self.session.resolve(ConfirmKey::Escape).await?;
                        output::print_outcome(&outcome);
                    } else {
                        println!();
                        output::print_info("Use /quit to exit.");
                    }
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    output::print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        Ok(())
    }

    fn build_prompt(&self) -> String {
        if self.session.has_pending() {
            format!("{} ", "apply? [Y/n]".bright_yellow())
        } else {
            format!("\n{} {} ", "intake".bright_green().bold(), ">".bright_green())
        }
    }

    async fn handle_answer(&mut self, line: &str) -> Result<()> {
        match read_answer(line) {
            Answer::Resolve(key) => {
                let outcome = self.session.resolve(key).await?;
                output::print_outcome(&outcome);
            }
            Answer::Unclear => {
                output::print_warning("Press Enter (or y) to apply, n or esc to discard");
            }
        }
        Ok(())
    }

    /// Stage a typed command for confirmation
    async fn process_input(&mut self, input: &str) -> Result<()> {
        match self.session.stage(input).await? {
            Some(preview) => output::print_preview(&preview),
            None => output::print_info(&format!(
                "Not a command I recognise. Try {} to ask the assistant.",
                "/chat <text>".bright_yellow()
            )),
        }
        Ok(())
    }

    /// Handle slash commands; returns true when the REPL should exit
    async fn handle_command(&mut self, input: &str) -> Result<bool> {
        let (command, rest) = input
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((input, ""));

        match command {
            "/exit" | "/quit" | "/q" => return Ok(true),

            "/help" | "/h" | "/?" => print_help(),

            "/chat" | "/c" => {
                if rest.is_empty() {
                    output::print_error("Usage: /chat <message>");
                } else {
                    let reply = self.session.chat(rest).await?;
                    output::print_reply(&reply);
                }
            }

            "/tasks" => output::print_tasks(&self.session.tasks().await?),

            "/clear" => {
                self.session.clear_conversation().await?;
                output::print_info("Conversation cleared");
            }

            _ => output::print_error(&format!(
                "Unknown command: {}. Use /help for available commands.",
                command
            )),
        }

        Ok(false)
    }
}

fn print_help() {
    println!();
    println!("{}", "Intake Commands".bright_white().bold());
    println!("{}", "─".repeat(50).dimmed());
    println!();
    println!(
        "  {}  Staged for confirmation, e.g. \"mark the report as done\"",
        "<sentence>".bright_yellow()
    );
    println!("  {}   Ask the assistant (may create several items)", "/chat <text>".bright_yellow());
    println!("  {}         List tasks", "/tasks".bright_yellow());
    println!("  {}         Forget the conversation", "/clear".bright_yellow());
    println!("  {}          Show this help", "/help".bright_yellow());
    println!("  {}          Exit", "/quit".bright_yellow());
    println!();
    println!(
        "  {}",
        "While a change is staged: Enter/y applies it, esc/n discards it.".dimmed()
    );
    println!();
}
