//! Tool-calling orchestrator
//!
//! One `send_message` turn: snapshot the store into a system block, send the
//! recent conversation plus the tool catalogue, execute whatever tools the
//! model asks for, feed acknowledgements back and repeat until the model
//! answers in text or the round cap is hit.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    brain::{
        call_with_retry, ChatConfig, ChatErrorCode, ChatMessage, ChatProvider, ChatRequest,
        ChatResponse, ProviderError, RetryPolicy,
    },
    context::build_context_block,
    store::{EntityStore, StoreError},
    tools::{tool_catalogue, ActionResult, ToolExecutor},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Upper bound on model requests per turn, the first one included
    pub max_tool_rounds: u32,
    /// Most recent conversation messages sent upstream
    pub history_limit: usize,
    /// Tasks listed in the system context block
    pub context_tasks: usize,
    /// Tell the model when a tool failed locally instead of always acking success
    pub report_tool_failures: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 10,
            history_limit: 20,
            context_tasks: 30,
            report_tool_failures: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Entry of the visible conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionResult>>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ChatErrorCode>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: content.into(),
            actions: None,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn assistant(content: impl Into<String>, actions: Vec<ActionResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: content.into(),
            actions: (!actions.is_empty()).then_some(actions),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failure(code: ChatErrorCode, content: impl Into<String>, actions: Vec<ActionResult>) -> Self {
        Self {
            error: Some(code),
            ..Self::assistant(content, actions)
        }
    }

    fn to_upstream(&self) -> Option<ChatMessage> {
        match self.role {
            ChatRole::User => Some(ChatMessage::user(self.content.clone())),
            // error bubbles are for the user only
            ChatRole::Assistant if self.error.is_some() => None,
            ChatRole::Assistant if self.content.is_empty() => {
                let summaries: Vec<&str> = self
                    .actions
                    .iter()
                    .flatten()
                    .map(|a| a.summary.as_str())
                    .collect();
                Some(ChatMessage::assistant(summaries.join("\n")))
            }
            ChatRole::Assistant => Some(ChatMessage::assistant(self.content.clone())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("A message is already being processed")]
    Busy,

    #[error("The request was aborted")]
    Aborted,
}

enum TurnFailure {
    Provider(ProviderError),
    Store(StoreError),
}

impl TurnFailure {
    fn code(&self) -> ChatErrorCode {
        match self {
            TurnFailure::Provider(e) => e.user_code(),
            TurnFailure::Store(_) => ChatErrorCode::StoreUnavailable,
        }
    }

    fn detail(&self) -> String {
        match self {
            TurnFailure::Provider(e) => e.to_string(),
            TurnFailure::Store(e) => e.to_string(),
        }
    }
}

struct TurnOutput {
    content: String,
    actions: Vec<ActionResult>,
    failure: Option<TurnFailure>,
}

/// Resets the loading flag however the turn ends
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Orchestrator {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn EntityStore>,
    executor: ToolExecutor,
    chat: ChatConfig,
    retry: RetryPolicy,
    config: OrchestratorConfig,
    history: RwLock<Vec<ConversationMessage>>,
    pending_user: RwLock<Option<ConversationMessage>>,
    current: Mutex<Option<CancellationToken>>,
    loading: AtomicBool,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn ChatProvider>, store: Arc<dyn EntityStore>) -> Self {
        Self {
            provider,
            executor: ToolExecutor::new(store.clone()),
            store,
            chat: ChatConfig::default(),
            retry: RetryPolicy::default(),
            config: OrchestratorConfig::default(),
            history: RwLock::new(Vec::new()),
            pending_user: RwLock::new(None),
            current: Mutex::new(None),
            loading: AtomicBool::new(false),
        }
    }

    pub fn with_chat_config(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn history(&self) -> Vec<ConversationMessage> {
        self.history.read().await.clone()
    }

    /// User message of the turn in flight, not yet committed to history
    pub async fn pending_user_message(&self) -> Option<ConversationMessage> {
        self.pending_user.read().await.clone()
    }

    /// Drop the whole conversation; refused while a turn is in flight
    pub async fn clear(&self) -> Result<(), OrchestratorError> {
        if self.is_loading() {
            return Err(OrchestratorError::Busy);
        }
        self.history.write().await.clear();
        tracing::info!("[TOOL_FLOW] Conversation cleared");
        Ok(())
    }

    /// Cancel the turn in flight; returns false when there is none
    pub async fn abort(&self) -> bool {
        match self.current.lock().await.as_ref() {
            Some(token) => {
                tracing::info!("[TOOL_FLOW] Aborting in-flight request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run one conversational turn and return the assistant reply.
    ///
    /// Upstream failures become an assistant message carrying an error code.
    /// An aborted turn appends nothing; store writes already made are kept.
    pub async fn send_message(&self, text: &str) -> Result<ConversationMessage, OrchestratorError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("[TOOL_FLOW] Rejected message: turn already in flight");
            return Err(OrchestratorError::Busy);
        }
        let _guard = LoadingGuard(&self.loading);

        let user = ConversationMessage::user(text);
        *self.pending_user.write().await = Some(user.clone());
        let token = CancellationToken::new();
        *self.current.lock().await = Some(token.clone());

        let output = tokio::select! {
            _ = token.cancelled() => None,
            output = self.run_turn(&user) => Some(output),
        };

        *self.current.lock().await = None;
        *self.pending_user.write().await = None;

        let Some(output) = output else {
            tracing::info!("[TOOL_FLOW] Turn aborted");
            return Err(OrchestratorError::Aborted);
        };

        let reply = match output.failure {
            None => ConversationMessage::assistant(output.content, output.actions),
            Some(failure) => {
                let code = failure.code();
                tracing::error!("[LLM_API] Turn failed ({}): {}", code, failure.detail());
                ConversationMessage::failure(code, code.guidance(&failure.detail()), output.actions)
            }
        };

        let mut history = self.history.write().await;
        history.push(user);
        history.push(reply.clone());
        Ok(reply)
    }

    async fn upstream_window(&self, user: &ConversationMessage) -> Vec<ChatMessage> {
        let history = self.history.read().await;
        let mut window: Vec<ChatMessage> = history
            .iter()
            .chain(std::iter::once(user))
            .filter_map(ConversationMessage::to_upstream)
            .collect();
        let excess = window.len().saturating_sub(self.config.history_limit);
        window.drain(..excess);
        window
    }

    async fn run_turn(&self, user: &ConversationMessage) -> TurnOutput {
        let mut actions = Vec::new();

        let system = match build_context_block(
            self.store.as_ref(),
            self.config.context_tasks,
            Utc::now().date_naive(),
        )
        .await
        {
            Ok(block) => block,
            Err(e) => {
                return TurnOutput {
                    content: String::new(),
                    actions,
                    failure: Some(TurnFailure::Store(e)),
                }
            }
        };

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(self.upstream_window(user).await);
        tracing::info!(
            "[TOOL_FLOW] Sending request with {} messages via {}",
            messages.len(),
            self.provider.name()
        );

        let mut request = ChatRequest {
            messages,
            tools: tool_catalogue().to_vec(),
            config: self.chat.clone(),
        };

        let mut rounds = 1;
        let mut response = match self.request(&request).await {
            Ok(response) => response,
            Err(e) => {
                return TurnOutput {
                    content: String::new(),
                    actions,
                    failure: Some(TurnFailure::Provider(e)),
                }
            }
        };

        while response.wants_tools() {
            if rounds >= self.config.max_tool_rounds {
                tracing::warn!(
                    "[TOOL_FLOW] Round cap {} reached, dropping {} tool call(s)",
                    self.config.max_tool_rounds,
                    response.tool_calls.len()
                );
                break;
            }

            tracing::info!(
                "[TOOL_FLOW] Round {}: model requested {} tool call(s)",
                rounds,
                response.tool_calls.len()
            );
            request.messages.push(ChatMessage::assistant_with_tools(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let ack = match self.executor.execute(call).await {
                    Ok(result) => {
                        tracing::info!("[TOOL_FLOW] {} -> {}", call.name, result.summary);
                        actions.push(result);
                        serde_json::json!({ "success": true })
                    }
                    Err(e) => {
                        tracing::warn!("[TOOL_FLOW] {} failed: {}", call.name, e);
                        actions.push(ActionResult::failed(&call.name));
                        if self.config.report_tool_failures {
                            serde_json::json!({ "success": false, "error": e.to_string() })
                        } else {
                            serde_json::json!({ "success": true })
                        }
                    }
                };
                request
                    .messages
                    .push(ChatMessage::tool_result(call.id.clone(), ack.to_string()));
            }

            rounds += 1;
            response = match self.request(&request).await {
                Ok(response) => response,
                Err(e) => {
                    return TurnOutput {
                        content: String::new(),
                        actions,
                        failure: Some(TurnFailure::Provider(e)),
                    }
                }
            };
        }

        tracing::info!(
            "[TOOL_FLOW] Turn finished after {} request(s), {} action(s)",
            rounds,
            actions.len()
        );
        TurnOutput {
            content: response.content.unwrap_or_default(),
            actions,
            failure: None,
        }
    }

    async fn request(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        call_with_retry(&self.retry, || self.provider.chat(request)).await
    }
}
