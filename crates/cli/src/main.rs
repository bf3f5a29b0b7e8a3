//! Intake CLI - natural-language task changes from the terminal
//!
//! Drives the intake pipeline against a JSON-snapshot store.

mod config;
mod output;
mod repl;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Intake - turn plain sentences into task changes
#[derive(Parser)]
#[command(name = "intake")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn plain sentences into task changes, with confirmation")]
#[command(long_about = r#"
Intake turns sentences like "mark the report as done" or "remind me to call mom"
into changes to your task list. Typed commands are previewed and applied only
after you confirm; /chat hands the text to a chat model that can create tasks,
goals, habits, notes, reminders and projects.

Examples:
  intake                                  # Start the interactive session
  intake parse "delete the milk task"     # Show how a sentence is understood
  intake chat "plan my week of workouts"  # One assistant turn
  intake tasks                            # List tasks
"#)]
struct Cli {
    /// Store snapshot file (defaults to ~/.intake/store.json)
    #[arg(short, long, env = "INTAKE_STORE")]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive session (default)
    Repl,

    /// Parse a sentence and print the resulting command as JSON
    Parse {
        /// The sentence to parse
        text: Vec<String>,
    },

    /// Send one message to the assistant
    Chat {
        /// The message to send
        text: Vec<String>,
    },

    /// List tasks
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("intake={},intake_cli={},warn", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = config::Config::load()?;
    let store_path = config.store_path(cli.store.as_deref());
    let session = session::Session::open(&config, &store_path).await?;

    match cli.command {
        Some(Commands::Parse { text }) => {
            let command = session.parse(&text.join(" ")).await?;
            println!("{}", serde_json::to_string_pretty(&command)?);
        }
        Some(Commands::Chat { text }) => {
            let reply = session.chat(&text.join(" ")).await?;
            output::print_reply(&reply);
        }
        Some(Commands::Tasks) => {
            output::print_tasks(&session.tasks().await?);
        }
        Some(Commands::Repl) | None => {
            let mut repl = repl::IntakeRepl::new(session)?;
            repl.run().await?;
        }
    }

    Ok(())
}
