//! Session state shared by the REPL and the one-shot subcommands
//!
//! Owns the snapshot-backed store and the two pipelines that write to it.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use intake::{
    store::UuidIds, CommandParser, CommandPreview, ConfirmKey, ConfirmOutcome,
    ConfirmationController, ConversationMessage, EntityStore, InMemoryStore, Orchestrator,
    ParsedCommand, Result, Task,
};

use crate::config::Config;

pub struct Session {
    store: Arc<InMemoryStore>,
    store_path: PathBuf,
    parser: CommandParser,
    controller: ConfirmationController,
    orchestrator: Orchestrator,
}

impl Session {
    /// Load the snapshot at `store_path` and wire both pipelines to it
    pub async fn open(config: &Config, store_path: &Path) -> Result<Self> {
        let store = Arc::new(InMemoryStore::load_json(store_path, Box::new(UuidIds)).await?);
        let pipeline = &config.pipeline;

        if pipeline.llm.api_key.is_none() {
            tracing::debug!("No API key configured; chat turns will fail with invalid_api_key");
        }

        let orchestrator = Orchestrator::new(Arc::new(pipeline.llm.build_provider()), store.clone())
            .with_chat_config(pipeline.llm.chat_config())
            .with_retry(pipeline.retry.clone())
            .with_config(pipeline.orchestrator.clone());

        Ok(Self {
            controller: ConfirmationController::new(store.clone()),
            parser: CommandParser::new(pipeline.matcher.clone()),
            store,
            store_path: store_path.to_path_buf(),
            orchestrator,
        })
    }

    pub async fn save(&self) -> Result<()> {
        self.store.save_json(&self.store_path).await?;
        tracing::debug!("Saved store to {}", self.store_path.display());
        Ok(())
    }

    pub async fn tasks(&self) -> Result<Vec<Task>> {
        Ok(self.store.list_tasks().await?)
    }

    pub async fn parse(&self, text: &str) -> Result<Option<ParsedCommand>> {
        let tasks = self.tasks().await?;
        Ok(self.parser.parse(text, &tasks))
    }

    pub fn has_pending(&self) -> bool {
        self.controller.preview().is_some()
    }

    /// Parse `text` and stage it for confirmation; `None` when it is not a command
    pub async fn stage(&mut self, text: &str) -> Result<Option<CommandPreview>> {
        let Some(command) = self.parse(text).await? else {
            return Ok(None);
        };
        let preview = self.controller.propose(command).await?;
        Ok(Some(preview.clone()))
    }

    /// Resolve the staged command; applied changes are written to disk
    pub async fn resolve(&mut self, key: ConfirmKey) -> Result<ConfirmOutcome> {
        let outcome = self.controller.handle_key(key).await;
        if matches!(outcome, ConfirmOutcome::Applied { .. }) {
            self.save().await?;
        }
        Ok(outcome)
    }

    /// One conversational turn; Ctrl-C aborts the request in flight
    pub async fn chat(&self, text: &str) -> Result<ConversationMessage> {
        let turn = self.orchestrator.send_message(text);
        tokio::pin!(turn);

        let result = tokio::select! {
            result = &mut turn => result,
            _ = tokio::signal::ctrl_c() => {
                self.orchestrator.abort().await;
                turn.await
            }
        };

        // tool calls may have written even when the turn was aborted
        self.save().await?;
        Ok(result?)
    }

    pub async fn clear_conversation(&self) -> Result<()> {
        Ok(self.orchestrator.clear().await?)
    }
}
