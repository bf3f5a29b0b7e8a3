//! # Intake - natural-language action pipeline
//!
//! Turns free-form text (typed, pasted or spoken) into mutations of a personal
//! task store. Two paths share the store:
//!
//! - rule-based: [`parser`] → [`confirmation`] → store, optionally fed by [`voice`]
//! - model-backed: [`orchestrator`] drives a tool-calling conversation through
//!   [`brain`] and applies the calls with [`tools`]

pub mod brain;
pub mod confirmation;
pub mod context;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod store;
pub mod tools;
pub mod voice;

#[cfg(test)]
mod confirmation_tests;
#[cfg(test)]
mod test_support;
#[cfg(test)]
mod voice_tests;

use serde::{Deserialize, Serialize};

pub use brain::{
    call_with_retry, ChatConfig, ChatErrorCode, ChatProvider, OpenAICompatibleProvider,
    ProviderError, RetryPolicy,
};
pub use confirmation::{
    CommandPreview, ConfirmKey, ConfirmOutcome, ConfirmationController, ConfirmationError,
    ConfirmationState,
};
pub use matcher::{find_matching_tasks, similarity, MatcherConfig, TaskMatch};
pub use models::{Area, Priority, Task, TaskStatus};
pub use orchestrator::{
    ChatRole, ConversationMessage, Orchestrator, OrchestratorConfig, OrchestratorError,
};
pub use parser::{parse_command, CommandAction, CommandParser, ParsedCommand};
pub use store::{EntityStore, InMemoryStore, StoreError};
pub use tools::{ActionResult, ToolError};
pub use voice::{SpeechInput, VoiceCommandSession, VoiceConfig, VoiceError};

/// Chat endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Usually left unset in files and taken from the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: brain::providers::DEFAULT_ENDPOINT.to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: None,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn build_provider(&self) -> OpenAICompatibleProvider {
        OpenAICompatibleProvider::new(self.endpoint.clone(), self.api_key.clone())
    }
}

/// Everything tunable in the pipeline, with documented defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeConfig {
    pub llm: LlmConfig,
    pub retry: RetryPolicy,
    pub orchestrator: OrchestratorConfig,
    pub matcher: MatcherConfig,
    pub voice: VoiceConfig,
}

impl IntakeConfig {
    /// Apply `INTAKE_*` environment overrides; unparsable values are ignored
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("INTAKE_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(endpoint) = lookup("INTAKE_LLM_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }

        if let Some(value) = lookup("INTAKE_LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = value;
        }

        if let Some(value) = lookup("INTAKE_LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = Some(value);
        }

        if let Some(value) = lookup("INTAKE_MAX_TOOL_ROUNDS").and_then(|v| v.parse().ok()) {
            self.orchestrator.max_tool_rounds = value;
        }

        if let Some(value) = lookup("INTAKE_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.retry.max_retries = value;
        }

        if let Some(value) = lookup("INTAKE_REPORT_TOOL_FAILURES") {
            self.orchestrator.report_tool_failures =
                matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        if let Some(key) = lookup("INTAKE_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
    }
}

/// Main error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("Conversation error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),
}

pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = IntakeConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.orchestrator.max_tool_rounds, 10);
        assert_eq!(config.orchestrator.history_limit, 20);
        assert_eq!(config.orchestrator.context_tasks, 30);
        assert!(!config.orchestrator.report_tool_failures);
        assert_eq!(config.matcher.threshold, 0.4);
        assert_eq!(config.voice.settle_delay_ms, 600);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: IntakeConfig =
            serde_json::from_str(r#"{"llm": {"model": "local-model"}, "retry": {"maxRetries": 5}}"#)
                .unwrap();
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 2000);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("INTAKE_LLM_MODEL", "gpt-4o"),
            ("INTAKE_MAX_TOOL_ROUNDS", "4"),
            ("INTAKE_MAX_RETRIES", "not-a-number"),
            ("INTAKE_REPORT_TOOL_FAILURES", "true"),
            ("OPENAI_API_KEY", "sk-fallback"),
        ]);
        let mut config = IntakeConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.orchestrator.max_tool_rounds, 4);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.orchestrator.report_tool_failures);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-fallback"));
    }

    #[test]
    fn test_intake_key_wins_over_openai_key() {
        let mut config = IntakeConfig::default();
        config.apply_overrides_from(|key| match key {
            "INTAKE_API_KEY" => Some("sk-intake".to_string()),
            "OPENAI_API_KEY" => Some("sk-openai".to_string()),
            _ => None,
        });
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-intake"));
    }
}
